use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

const FACEBOOK_BASE: &str = "https://www.facebook.com";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConfessionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ConfessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Website,
    GoogleSheets,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::GoogleSheets => "google_sheets",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Confession {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub full_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub es_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    /// Single-image field kept by older posts.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub drive_link: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub reaction_count: Option<u64>,
    #[serde(default)]
    pub comment_count: Option<u64>,
    #[serde(default)]
    pub status: Option<ConfessionStatus>,
    #[serde(default)]
    pub source_type: Option<SourceType>,
}

impl Confession {
    /// Label shown in card headers and matched by the feed search.
    pub fn display_id(&self) -> String {
        match (&self.full_id, &self.es_id) {
            (Some(full), _) if !full.is_empty() => full.clone(),
            (_, Some(es)) => format!("#ES_{es}"),
            _ => String::new(),
        }
    }

    /// Image URLs to render. The multi-image array wins over the legacy field.
    pub fn image_urls(&self) -> Vec<&str> {
        match &self.images {
            Some(images) if !images.is_empty() => images.iter().map(String::as_str).collect(),
            _ => self.image.as_deref().into_iter().collect(),
        }
    }

    /// Splits a composite `page_post` identifier.
    pub fn page_post_ids(&self) -> Option<(&str, &str)> {
        let (page, post) = self.id.split_once('_')?;
        if page.is_empty() || post.is_empty() {
            return None;
        }
        Some((page, post.split('_').next().unwrap_or(post)))
    }

    /// Permalink usable on both desktop and mobile, if the id encodes one.
    pub fn permalink(&self) -> Option<String> {
        let (page, post) = self.page_post_ids()?;
        Some(format!(
            "{FACEBOOK_BASE}/permalink.php?story_fbid={post}&id={page}"
        ))
    }

    /// Short post link used on feed cards.
    pub fn post_url(&self) -> Option<String> {
        self.page_post_ids()?;
        Some(format!("{FACEBOOK_BASE}/{}", self.id))
    }

    /// Embedded-post URL shown when the comments plugin is replaced by its fallback.
    pub fn embed_fallback_url(&self, app_id: &str) -> Option<String> {
        let permalink = self.permalink()?;
        let mut url = Url::parse(&format!("{FACEBOOK_BASE}/plugins/post.php")).ok()?;
        url.query_pairs_mut()
            .append_pair("href", &permalink)
            .append_pair("width", "500")
            .append_pair("show_text", "true")
            .append_pair("height", "500")
            .append_pair("appId", app_id);
        Some(url.into())
    }

    /// Best-effort creation time across the public and moderation payloads.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        [&self.created_time, &self.timestamp, &self.submitted_at]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_timestamp(raw))
    }

    pub fn reactions(&self) -> u64 {
        self.reaction_count.unwrap_or(0)
    }

    pub fn comments(&self) -> u64 {
        self.comment_count.unwrap_or(0)
    }

    /// Attachment link for form submissions that carry no inline images.
    pub fn attachment_link(&self) -> Option<&str> {
        if self.image_urls().is_empty() {
            self.drive_link.as_deref()
        } else {
            None
        }
    }

    /// Case-insensitive match against the display id and content. `needle` must be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.display_id().to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Graph API style offsets omit the colon: 2024-10-21T07:28:00+0000
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(s)| s))
}

/// Feed response as sent by either backend revision.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConfessionsPayload {
    Wrapped { confessions: Vec<Confession> },
    Bare(Vec<Confession>),
}

impl ConfessionsPayload {
    pub fn into_confessions(self) -> Vec<Confession> {
        match self {
            Self::Wrapped { confessions } | Self::Bare(confessions) => confessions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFilter {
    #[default]
    All,
    Website,
    GoogleSheets,
}

impl SourceFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Website => "website",
            Self::GoogleSheets => "google_sheets",
        }
    }

    pub fn admits(&self, source: Option<SourceType>) -> bool {
        match self {
            Self::All => true,
            Self::Website => source == Some(SourceType::Website),
            Self::GoogleSheets => source == Some(SourceType::GoogleSheets),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    Pending,
    Approved,
    Rejected,
    All,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModerationFilters {
    pub source: SourceFilter,
    pub status: StatusFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

/// Pending counts per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub website: u64,
    #[serde(default)]
    pub google_sheets: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingPage {
    #[serde(default)]
    pub confessions: Vec<Confession>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub stats: Option<Stats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub fail_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    #[serde(default)]
    pub username: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminUser,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
}
