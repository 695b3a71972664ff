//! Detail overlay for a single confession.
//!
//! Opening an overlay locks background scrolling for its lifetime and, when
//! the confession links to a public post, runs a time-boxed attempt to render
//! the third-party comments embed. Every branch ends in a settled state: the
//! embed is decorative and the fallback links are always available.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::EmbedConfig;
use crate::models::Confession;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embed sdk failed: {0}")]
    Sdk(String),
    #[error("embed sdk panicked")]
    Panicked,
}

/// Region the embed SDK is asked to render into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedTarget {
    pub confession_id: String,
    pub href: String,
}

pub trait EmbedSdk: Send + Sync {
    fn parse(&self, target: &EmbedTarget) -> Result<(), EmbedError>;
}

/// Where the SDK handle comes from. It may only become available some time after startup.
pub trait EmbedHost: Send + Sync {
    fn sdk(&self) -> Option<Arc<dyn EmbedSdk>>;
}

/// Host with no embed SDK at all; every overlay falls back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEmbedSdk;

impl EmbedHost for NoEmbedSdk {
    fn sdk(&self) -> Option<Arc<dyn EmbedSdk>> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentContext {
    pub host: String,
    pub production_hosts: Vec<String>,
}

impl DeploymentContext {
    pub fn new(host: impl Into<String>, production_hosts: Vec<String>) -> Self {
        Self {
            host: host.into(),
            production_hosts,
        }
    }

    pub fn is_production(&self) -> bool {
        let host = self.host.trim().to_ascii_lowercase();
        if host.is_empty() || host == "localhost" || host == "127.0.0.1" || host == "::1" {
            return false;
        }
        self.production_hosts
            .iter()
            .any(|known| known.eq_ignore_ascii_case(&host))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedPolicy {
    /// Wait before asking a present SDK to parse.
    pub parse_delay: Duration,
    /// Wait after parsing before settling.
    pub settle_delay: Duration,
    /// Wait before looking for a missing SDK a second time.
    pub sdk_retry_delay: Duration,
    /// Settle on the fallback even when the embed parsed cleanly.
    pub always_fallback: bool,
}

impl Default for EmbedPolicy {
    fn default() -> Self {
        Self::from(&EmbedConfig::default())
    }
}

impl From<&EmbedConfig> for EmbedPolicy {
    fn from(config: &EmbedConfig) -> Self {
        Self {
            parse_delay: Duration::from_millis(config.parse_delay_ms),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            sdk_retry_delay: Duration::from_millis(config.sdk_retry_delay_ms),
            always_fallback: config.always_fallback,
        }
    }
}

impl EmbedPolicy {
    /// Upper bound on the time any overlay spends before settling.
    pub fn settle_budget(&self) -> Duration {
        self.parse_delay.max(self.sdk_retry_delay) + self.settle_delay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NonProduction,
    NoPermalink,
    SdkMissing,
    SdkError,
    Policy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Opening,
    EmbedAttempt,
    Embedded,
    Fallback(FallbackReason),
}

impl OverlayPhase {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Embedded | Self::Fallback(_))
    }

    pub fn enrichment(&self) -> Enrichment {
        match self {
            Self::Opening | Self::EmbedAttempt => Enrichment::Loading,
            Self::Embedded => Enrichment::Embedded,
            Self::Fallback(_) => Enrichment::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    Loading,
    Embedded,
    Fallback,
}

/// Counts open overlays; background scrolling is suspended while any are open.
#[derive(Debug, Clone, Default)]
pub struct ScrollLock {
    holders: Arc<AtomicUsize>,
}

impl ScrollLock {
    pub fn acquire(&self) -> ScrollGuard {
        self.holders.fetch_add(1, Ordering::SeqCst);
        ScrollGuard {
            holders: self.holders.clone(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }
}

#[derive(Debug)]
pub struct ScrollGuard {
    holders: Arc<AtomicUsize>,
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCarousel {
    len: usize,
    index: usize,
}

impl ImageCarousel {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has_controls(&self) -> bool {
        self.len > 1
    }

    pub fn next(&mut self) {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }

    pub fn prev(&mut self) {
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }
}

/// Everything an overlay needs from its surroundings.
#[derive(Clone)]
pub struct OverlayContext {
    pub host: Arc<dyn EmbedHost>,
    pub deployment: DeploymentContext,
    pub policy: EmbedPolicy,
    pub scroll: ScrollLock,
}

impl OverlayContext {
    pub fn new(host: Arc<dyn EmbedHost>, deployment: DeploymentContext, policy: EmbedPolicy) -> Self {
        Self {
            host,
            deployment,
            policy,
            scroll: ScrollLock::default(),
        }
    }
}

/// One open detail view. Dropping it cancels pending timers and releases the scroll lock.
pub struct DetailOverlay {
    confession: Confession,
    carousel: ImageCarousel,
    phase: watch::Receiver<OverlayPhase>,
    task: Option<JoinHandle<()>>,
    _scroll: ScrollGuard,
}

impl DetailOverlay {
    /// Must be called inside a Tokio runtime when an embed attempt may be spawned.
    pub fn open(confession: Confession, ctx: &OverlayContext) -> Self {
        let scroll = ctx.scroll.acquire();
        let carousel = ImageCarousel::new(confession.image_urls().len());
        let (tx, rx) = watch::channel(OverlayPhase::Opening);
        debug!(id = %confession.id, "overlay opened");

        let target = confession.permalink().map(|href| EmbedTarget {
            confession_id: confession.id.clone(),
            href,
        });

        let task = if !ctx.deployment.is_production() {
            debug!(host = %ctx.deployment.host, "not a production host, skipping embed");
            tx.send_replace(OverlayPhase::Fallback(FallbackReason::NonProduction));
            None
        } else if let Some(target) = target {
            tx.send_replace(OverlayPhase::EmbedAttempt);
            Some(tokio::spawn(run_embed_attempt(
                ctx.host.clone(),
                target,
                ctx.policy,
                tx,
            )))
        } else {
            tx.send_replace(OverlayPhase::Fallback(FallbackReason::NoPermalink));
            None
        };

        Self {
            confession,
            carousel,
            phase: rx,
            task,
            _scroll: scroll,
        }
    }

    pub fn confession(&self) -> &Confession {
        &self.confession
    }

    pub fn phase(&self) -> OverlayPhase {
        *self.phase.borrow()
    }

    pub fn enrichment(&self) -> Enrichment {
        self.phase().enrichment()
    }

    pub fn carousel(&self) -> &ImageCarousel {
        &self.carousel
    }

    pub fn current_image(&self) -> Option<&str> {
        self.confession
            .image_urls()
            .get(self.carousel.index())
            .copied()
    }

    pub fn next_image(&mut self) {
        self.carousel.next();
    }

    pub fn prev_image(&mut self) {
        self.carousel.prev();
    }

    /// Waits until the overlay settles and returns the final phase.
    pub async fn settled(&mut self) -> OverlayPhase {
        if let Ok(phase) = self.phase.wait_for(OverlayPhase::is_settled).await {
            return *phase;
        }
        *self.phase.borrow()
    }

    pub fn close(self) {}
}

impl Drop for DetailOverlay {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!(id = %self.confession.id, "cancelling pending embed attempt");
                task.abort();
            }
        }
    }
}

async fn run_embed_attempt(
    host: Arc<dyn EmbedHost>,
    target: EmbedTarget,
    policy: EmbedPolicy,
    phase: watch::Sender<OverlayPhase>,
) {
    let sdk = match host.sdk() {
        Some(sdk) => {
            tokio::time::sleep(policy.parse_delay).await;
            sdk
        }
        None => {
            debug!("embed sdk not loaded yet, retrying once");
            tokio::time::sleep(policy.sdk_retry_delay).await;
            match host.sdk() {
                Some(sdk) => sdk,
                None => {
                    info!(id = %target.confession_id, "embed sdk unavailable, showing fallback");
                    phase.send_replace(OverlayPhase::Fallback(FallbackReason::SdkMissing));
                    return;
                }
            }
        }
    };

    if let Err(err) = invoke(sdk.as_ref(), &target) {
        warn!(error = %err, id = %target.confession_id, "embed parse failed, showing fallback");
        phase.send_replace(OverlayPhase::Fallback(FallbackReason::SdkError));
        return;
    }

    tokio::time::sleep(policy.settle_delay).await;
    let settled = if policy.always_fallback {
        OverlayPhase::Fallback(FallbackReason::Policy)
    } else {
        OverlayPhase::Embedded
    };
    debug!(id = %target.confession_id, ?settled, "embed attempt settled");
    phase.send_replace(settled);
}

fn invoke(sdk: &dyn EmbedSdk, target: &EmbedTarget) -> Result<(), EmbedError> {
    catch_unwind(AssertUnwindSafe(|| sdk.parse(target))).unwrap_or(Err(EmbedError::Panicked))
}
