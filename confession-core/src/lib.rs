pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod moderation;
pub mod overlay;
pub mod session;
pub mod validation;

pub use client::{ApiClient, AuthEvent};
pub use config::{ApiConfig, AppConfig, EmbedConfig, FeedConfig, ModerationConfig};
pub use error::{ApiError, ConfigError, SessionError, ValidationError};
pub use feed::{spawn_feed_load, Batch, FeedEvent, FeedViewModel, LoadState, PageButton};
pub use models::{
    AdminUser, BulkResult, Confession, ConfessionStatus, ConfessionsPayload, LoginResponse,
    ModerationFilters, Pagination, PendingPage, SourceFilter, SourceType, Stats, StatusFilter,
    SubmissionReceipt,
};
pub use moderation::{Action, BulkAction, ModerationViewModel, PageRequest};
pub use overlay::{
    DeploymentContext, DetailOverlay, EmbedError, EmbedHost, EmbedPolicy, EmbedSdk, EmbedTarget,
    Enrichment, FallbackReason, ImageCarousel, NoEmbedSdk, OverlayContext, OverlayPhase,
    ScrollGuard, ScrollLock,
};
pub use session::{SessionData, SessionStore};
pub use validation::{ImageAttachment, SubmissionDraft};
