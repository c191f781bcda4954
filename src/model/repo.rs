use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Metadata;

/// Identifies a repo within an external code host.
///
/// The triple only counts as an identity when all three parts are present;
/// empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalRepo {
    pub service_type: Option<String>,
    pub service_id: Option<String>,
    pub id: Option<String>,
}

impl ExternalRepo {
    pub fn new(
        service_type: impl Into<String>,
        service_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            service_type: Some(service_type.into()),
            service_id: Some(service_id.into()),
            id: Some(id.into()),
        }
    }

    /// Whether all three parts are present and non-empty
    pub fn is_complete(&self) -> bool {
        [&self.service_type, &self.service_id, &self.id]
            .iter()
            .all(|part| part.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

/// A repository discovered on an external code host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    /// Server-assigned; 0 until persisted
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    /// Timestamps are stored at microsecond precision
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub external_repo: ExternalRepo,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    /// Origin tags, sorted once read back from the store
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_enabled() -> bool {
    true
}

impl Repo {
    /// A transient, enabled repo with no origin and no sources
    pub fn new(name: impl Into<String>, created_at: OffsetDateTime) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: String::new(),
            language: String::new(),
            created_at,
            updated_at: None,
            deleted_at: None,
            external_repo: ExternalRepo::default(),
            enabled: true,
            archived: false,
            fork: false,
            sources: Vec::new(),
            metadata: Metadata::default(),
        }
    }

    pub fn with_external(mut self, external: ExternalRepo) -> Self {
        self.external_repo = external;
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
