use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{
    BulkResult, Confession, ConfessionsPayload, LoginResponse, ModerationFilters, PendingPage,
    SourceType, Stats, SubmissionReceipt,
};
use crate::session::SessionStore;
use crate::validation::{validate_login, validate_submission, ImageAttachment};

/// Signals the frontend must act on outside the failing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The stored credential was dropped; show the login screen.
    LoginRequired,
}

const AUTH_EVENT_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    Public,
    Admin,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: SessionStore,
    auth_tx: broadcast::Sender<AuthEvent>,
    redirect_sent: Arc<AtomicBool>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self, ApiError> {
        let http = ClientBuilder::new()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Self::with_http(http, &config.base_url, session)
    }

    pub fn with_http(http: Client, base_url: &str, session: SessionStore) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        let (auth_tx, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Ok(Self {
            http,
            base_url,
            session,
            auth_tx,
            redirect_sent: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Subscribes to auth events raised by this client or any of its clones.
    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_tx.subscribe()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get_confessions(&self, limit: usize) -> Result<Vec<Confession>, ApiError> {
        let request = self
            .http
            .get(self.endpoint(&["confessions"]))
            .query(&[("limit", limit)]);
        let payload: ConfessionsPayload = self.send(request, Audience::Public).await?;
        let confessions = payload.into_confessions();
        debug!(limit, received = confessions.len(), "fetched confessions");
        Ok(confessions)
    }

    /// Validates locally, then posts a multipart form. Invalid drafts never hit the network.
    pub async fn submit_confession(
        &self,
        content: &str,
        images: &[ImageAttachment],
    ) -> Result<SubmissionReceipt, ApiError> {
        validate_submission(content, images)?;

        let mut form = Form::new().text("content", content.to_string());
        for image in images {
            let part = Part::bytes(image.data.to_vec())
                .file_name(image.file_name.clone())
                .mime_str(&image.mime)?;
            form = form.part("images", part);
        }
        let request = self
            .http
            .post(self.endpoint(&["confessions", "submit"]))
            .multipart(form);
        let receipt = self.send(request, Audience::Public).await?;
        info!(images = images.len(), "confession submitted");
        Ok(receipt)
    }

    /// Logs in and stores the returned credential.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        validate_login(username, password)?;
        let request = self
            .http
            .post(self.endpoint(&["admin", "login"]))
            .json(&json!({ "username": username, "password": password }));
        let response: LoginResponse = self.send(request, Audience::Public).await?;
        self.session
            .store(response.token.clone(), response.user.clone())
            .await;
        self.redirect_sent.store(false, Ordering::SeqCst);
        info!(user = %response.user.username, "admin logged in");
        Ok(response)
    }

    pub async fn logout(&self) {
        self.session.clear().await;
        info!("admin logged out");
    }

    pub async fn get_pending(
        &self,
        filters: ModerationFilters,
        page: u32,
        limit: u32,
    ) -> Result<PendingPage, ApiError> {
        let request = self.http.get(self.endpoint(&["admin", "pending"])).query(&[
            ("source", filters.source.as_str().to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
            ("status", filters.status.as_str().to_string()),
        ]);
        self.send(request, Audience::Admin).await
    }

    pub async fn approve(&self, id: &str, source: Option<SourceType>) -> Result<(), ApiError> {
        let request = self
            .http
            .post(self.endpoint(&["admin", "approve", id]))
            .json(&json!({ "sourceType": source }));
        self.send::<serde_json::Value>(request, Audience::Admin)
            .await
            .map(drop)
    }

    pub async fn reject(&self, id: &str, source: Option<SourceType>) -> Result<(), ApiError> {
        let request = self
            .http
            .post(self.endpoint(&["admin", "reject", id]))
            .json(&json!({ "sourceType": source }));
        self.send::<serde_json::Value>(request, Audience::Admin)
            .await
            .map(drop)
    }

    pub async fn delete(&self, id: &str, source: Option<SourceType>) -> Result<(), ApiError> {
        let request = self
            .http
            .delete(self.endpoint(&["admin", "delete", id]))
            .json(&json!({ "sourceType": source }));
        self.send::<serde_json::Value>(request, Audience::Admin)
            .await
            .map(drop)
    }

    pub async fn approve_all(&self, filters: ModerationFilters) -> Result<BulkResult, ApiError> {
        let request = self
            .http
            .post(self.endpoint(&["admin", "approve-all"]))
            .json(&bulk_body(filters));
        self.send(request, Audience::Admin).await
    }

    pub async fn delete_all(&self, filters: ModerationFilters) -> Result<BulkResult, ApiError> {
        let request = self
            .http
            .post(self.endpoint(&["admin", "delete-all"]))
            .json(&bulk_body(filters));
        self.send(request, Audience::Admin).await
    }

    pub async fn get_stats(&self) -> Result<Stats, ApiError> {
        let request = self.http.get(self.endpoint(&["admin", "stats"]));
        self.send(request, Audience::Admin).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        audience: Audience,
    ) -> Result<T, ApiError> {
        let request = match (self.session.token().await, audience) {
            (Some(token), _) => request.bearer_auth(token),
            (None, Audience::Admin) => {
                self.auth_failed(None).await;
                return Err(ApiError::Auth { status: None });
            }
            (None, Audience::Public) => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if audience == Audience::Admin
            && (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN)
        {
            self.auth_failed(Some(status)).await;
            return Err(ApiError::Auth {
                status: Some(status),
            });
        }

        let body = response.bytes().await?;
        if !status.is_success() {
            let message = error_message(&body);
            debug!(%status, ?message, "request rejected by backend");
            return Err(ApiError::Api { status, message });
        }

        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &body
        };
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn auth_failed(&self, status: Option<StatusCode>) {
        let had_token = self.session.clear().await;
        if self.redirect_sent.swap(true, Ordering::SeqCst) {
            debug!(?status, "auth failure after login prompt already raised");
            return;
        }
        warn!(?status, had_token, "admin credential rejected, login required");
        if self.auth_tx.send(AuthEvent::LoginRequired).is_err() {
            warn!("no subscriber for auth events");
        }
    }
}

fn bulk_body(filters: ModerationFilters) -> serde_json::Value {
    json!({
        "sourceFilter": filters.source.as_str(),
        "statusFilter": filters.status.as_str(),
    })
}

/// Pulls `error` or `message` out of a JSON error body.
fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(key)?.as_str().map(str::to_owned))
        .filter(|message| !message.is_empty())
}
