use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::models::AdminUser;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionData {
    pub token: Option<String>,
    pub user: Option<AdminUser>,
}

/// Stored admin credential, shared by every request the client makes.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionData>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionData::default())),
            path: None,
        }
    }

    pub async fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<SessionData>(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, path = %path.display(), "discarding unreadable session file");
                SessionData::default()
            }),
            Err(_) => SessionData::default(),
        };
        Self {
            inner: Arc::new(RwLock::new(data)),
            path: Some(path),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.token.clone()
    }

    pub async fn user(&self) -> Option<AdminUser> {
        self.inner.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.token.is_some()
    }

    pub async fn store(&self, token: String, user: AdminUser) {
        let mut inner = self.inner.write().await;
        inner.token = Some(token);
        inner.user = Some(user);
        drop(inner);
        if let Err(err) = self.persist().await {
            warn!(%err, "failed to persist session");
        }
    }

    /// Drops the credential. Returns whether one was held.
    pub async fn clear(&self) -> bool {
        let mut inner = self.inner.write().await;
        let had_token = inner.token.is_some();
        *inner = SessionData::default();
        drop(inner);
        if let Err(err) = self.persist().await {
            warn!(%err, "failed to persist cleared session");
        }
        had_token
    }

    async fn persist(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            debug!("session store is in-memory only; skipping persist");
            return Ok(());
        };
        let bytes = {
            let inner = self.inner.read().await;
            serde_json::to_vec_pretty(&*inner)?
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
