//! Conversion between `repo` rows and [`Repo`] values.
//!
//! Sources are persisted as a JSON object keyed by tag (`{"github": null}`) so
//! duplicates collapse on write, and are surfaced as a sorted `Vec<String>`.
//! Timestamps are persisted as unix microseconds.

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::error::{StoreError, StoreResult};
use crate::model::{Metadata, Repo};

/// Column list shared by every query that yields repo rows, in scan order
pub(crate) const REPO_COLUMNS: [&str; 15] = [
    "id",
    "name",
    "description",
    "language",
    "created_at",
    "updated_at",
    "deleted_at",
    "external_service_type",
    "external_service_id",
    "external_id",
    "enabled",
    "archived",
    "fork",
    "sources",
    "metadata",
];

/// Encode a sources list as a JSON object of tag -> null
pub fn encode_sources(sources: &[String]) -> String {
    let set: Map<String, Value> = sources
        .iter()
        .map(|src| (src.clone(), Value::Null))
        .collect();
    Value::Object(set).to_string()
}

/// Decode the `sources` column into a sorted, duplicate-free list
pub fn decode_sources(raw: &str) -> serde_json::Result<Vec<String>> {
    let set: Map<String, Value> = serde_json::from_str(raw)?;
    let mut sources: Vec<String> = set.into_iter().map(|(src, _)| src).collect();
    sources.sort();
    Ok(sources)
}

/// Sub-microsecond precision is truncated toward the past
pub(crate) fn to_unix_micros(t: OffsetDateTime) -> Option<i64> {
    i64::try_from(t.unix_timestamp_nanos().div_euclid(1_000)).ok()
}

pub(crate) fn from_unix_micros(micros: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000).ok()
}

/// One element of the JSON batch handed to the reconciliation statements.
/// Its position in the array is the ordinal.
#[derive(Debug, Serialize)]
pub(crate) struct BatchRecord<'a> {
    id: i64,
    name: &'a str,
    description: &'a str,
    language: &'a str,
    created_at: i64,
    updated_at: Option<i64>,
    deleted_at: Option<i64>,
    external_service_type: Option<&'a str>,
    external_service_id: Option<&'a str>,
    external_id: Option<&'a str>,
    enabled: bool,
    archived: bool,
    fork: bool,
    sources: String,
    metadata: String,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

impl<'a> BatchRecord<'a> {
    pub(crate) fn from_repo(repo: &'a Repo) -> StoreResult<Self> {
        let fail = |source: serde_json::Error| StoreError::Serialization {
            repo: repo.name.clone(),
            source,
        };
        if repo.id < 0 {
            return Err(fail(serde::ser::Error::custom(format!(
                "negative id {}",
                repo.id
            ))));
        }
        let micros = |t: OffsetDateTime| {
            to_unix_micros(t).ok_or_else(|| {
                fail(serde::ser::Error::custom(format!(
                    "timestamp {t} out of range"
                )))
            })
        };

        Ok(Self {
            id: repo.id,
            name: &repo.name,
            description: &repo.description,
            language: &repo.language,
            created_at: micros(repo.created_at)?,
            updated_at: repo.updated_at.map(micros).transpose()?,
            deleted_at: repo.deleted_at.map(micros).transpose()?,
            external_service_type: non_empty(&repo.external_repo.service_type),
            external_service_id: non_empty(&repo.external_repo.service_id),
            external_id: non_empty(&repo.external_repo.id),
            enabled: repo.enabled,
            archived: repo.archived,
            fork: repo.fork,
            sources: encode_sources(&repo.sources),
            metadata: repo.metadata.encode().map_err(fail)?,
        })
    }
}

/// Serialize repos into the batch blob, preserving input order
pub(crate) fn encode_batch(repos: &[Repo]) -> StoreResult<String> {
    let records = repos
        .iter()
        .map(BatchRecord::from_repo)
        .collect::<StoreResult<Vec<_>>>()?;

    serde_json::to_string_pretty(&records).map_err(|source| StoreError::Serialization {
        repo: String::from("<batch>"),
        source,
    })
}

/// Scan a row into an existing repo slot, overwriting every field
pub(crate) fn scan_repo(op: &'static str, row: &SqliteRow, repo: &mut Repo) -> StoreResult<()> {
    fn get<'r, T>(op: &'static str, row: &'r SqliteRow, column: &'static str) -> StoreResult<T>
    where
        T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
    {
        row.try_get(column)
            .map_err(|e| StoreError::decode(op, column, e))
    }

    let timestamp = |column: &'static str, micros: i64| {
        from_unix_micros(micros)
            .ok_or_else(|| StoreError::decode(op, column, format!("{micros} out of range")))
    };

    repo.id = get(op, row, "id")?;
    repo.name = get(op, row, "name")?;
    repo.description = get(op, row, "description")?;
    repo.language = get(op, row, "language")?;
    repo.created_at = timestamp("created_at", get(op, row, "created_at")?)?;
    repo.updated_at = get::<Option<i64>>(op, row, "updated_at")?
        .map(|n| timestamp("updated_at", n))
        .transpose()?;
    repo.deleted_at = get::<Option<i64>>(op, row, "deleted_at")?
        .map(|n| timestamp("deleted_at", n))
        .transpose()?;
    repo.external_repo.service_type = get(op, row, "external_service_type")?;
    repo.external_repo.service_id = get(op, row, "external_service_id")?;
    repo.external_repo.id = get(op, row, "external_id")?;
    repo.enabled = get(op, row, "enabled")?;
    repo.archived = get(op, row, "archived")?;
    repo.fork = get(op, row, "fork")?;

    let sources: String = get(op, row, "sources")?;
    repo.sources = decode_sources(&sources)
        .map_err(|e| StoreError::decode(op, "sources", format!("failed to unmarshal sources: {e}")))?;

    repo.metadata = Metadata::Text(get(op, row, "metadata")?);

    Ok(())
}

/// Scan a row into a fresh repo
pub(crate) fn repo_from_row(op: &'static str, row: &SqliteRow) -> StoreResult<Repo> {
    let mut repo = Repo::new(String::new(), OffsetDateTime::UNIX_EPOCH);
    scan_repo(op, row, &mut repo)?;
    Ok(repo)
}
