//! SQL for listing and reconciling repos.
//!
//! Reconciliation runs as three statements over the same JSON batch: update
//! rows that match on any identity, insert the rest, then project one row per
//! batch element in ordinal order. The caller runs them in one transaction.

use sqlx::{QueryBuilder, Sqlite};

use super::codec::REPO_COLUMNS;

/// Parameterized list query; yields one page per call to [`ListReposQuery::page`]
#[derive(Debug, Clone)]
pub struct ListReposQuery {
    kinds: Vec<String>,
    names: Vec<String>,
}

impl ListReposQuery {
    /// Kinds are matched upper-cased against `external_service_type`.
    /// No kinds means no kind filter; no names means only sourced repos.
    pub fn new<K, N>(kinds: K, names: N) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Self {
            kinds: kinds.into_iter().map(|k| k.as_ref().to_uppercase()).collect(),
            names: names.into_iter().map(|n| n.as_ref().to_owned()).collect(),
        }
    }

    pub fn page(&self, cursor: i64, limit: i64) -> QueryBuilder<'static, Sqlite> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        qb.push(REPO_COLUMNS.join(", "));
        qb.push(" FROM repo WHERE id > ");
        qb.push_bind(cursor);
        qb.push(" AND deleted_at IS NULL AND ");

        if self.kinds.is_empty() {
            qb.push("TRUE");
        } else {
            qb.push("external_service_type IN (");
            let mut kinds = qb.separated(", ");
            for kind in &self.kinds {
                kinds.push_bind(kind.clone());
            }
            kinds.push_unseparated(")");
        }

        qb.push(" AND (sources != '{}' OR ");
        if self.names.is_empty() {
            qb.push("FALSE");
        } else {
            qb.push("name IN (");
            let mut names = qb.separated(", ");
            for name in &self.names {
                names.push_bind(name.clone());
            }
            names.push_unseparated(")");
        }
        qb.push(") ORDER BY id ASC LIMIT ");
        qb.push_bind(limit);

        qb
    }
}

/// Start a statement with the `batch` CTE decoded from the JSON blob.
/// `ordinality` is the element's position in the array.
fn with_batch(batch: &str) -> QueryBuilder<'_, Sqlite> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("WITH batch AS (SELECT b.key AS ordinality");
    for column in REPO_COLUMNS {
        qb.push(format_args!(
            ", json_extract(b.value, '$.{column}') AS {column}"
        ));
    }
    qb.push(" FROM json_each(");
    qb.push_bind(batch);
    qb.push(") AS b) ");
    qb
}

/// A complete origin triple on both sides, all parts equal
const TRIPLE_MATCH: &str = "(
    repo.external_id IS NOT NULL
    AND repo.external_service_id IS NOT NULL
    AND repo.external_service_type IS NOT NULL
    AND batch.external_id IS NOT NULL
    AND batch.external_service_id IS NOT NULL
    AND batch.external_service_type IS NOT NULL
    AND repo.external_service_id = batch.external_service_id
    AND repo.external_id = batch.external_id
    AND repo.external_service_type = batch.external_service_type
)";

/// Update every row matching a batch element by id, name or origin triple.
/// Ids never regress; name and origin fields keep the stored value when the
/// batch has none; every other column is replaced.
pub(crate) fn update_matching(batch: &str) -> QueryBuilder<'_, Sqlite> {
    let mut qb = with_batch(batch);
    qb.push(
        "UPDATE repo SET
    id                    = MAX(batch.id, repo.id),
    name                  = COALESCE(batch.name, repo.name),
    description           = batch.description,
    language              = batch.language,
    created_at            = batch.created_at,
    updated_at            = batch.updated_at,
    deleted_at            = batch.deleted_at,
    external_service_type = COALESCE(batch.external_service_type, repo.external_service_type),
    external_service_id   = COALESCE(batch.external_service_id, repo.external_service_id),
    external_id           = COALESCE(batch.external_id, repo.external_id),
    enabled               = batch.enabled,
    archived              = batch.archived,
    fork                  = batch.fork,
    sources               = batch.sources,
    metadata              = batch.metadata
FROM batch
WHERE repo.id = batch.id OR repo.name = batch.name OR ",
    );
    qb.push(TRIPLE_MATCH);
    qb
}

/// Insert every batch element that matches no stored row. A zero id is
/// assigned by the database; a non-zero unseen id is kept. Rows carrying an
/// id go first so assigned ids land above them, then ordinal order.
pub(crate) fn insert_unmatched(batch: &str) -> QueryBuilder<'_, Sqlite> {
    let mut qb = with_batch(batch);
    qb.push("INSERT INTO repo (");
    qb.push(REPO_COLUMNS.join(", "));
    qb.push(") SELECT NULLIF(batch.id, 0)");
    for column in &REPO_COLUMNS[1..] {
        qb.push(format_args!(", batch.{column}"));
    }
    qb.push(
        " FROM batch
WHERE NOT EXISTS (SELECT 1 FROM repo WHERE repo.id = batch.id)
AND NOT EXISTS (SELECT 1 FROM repo WHERE repo.name = batch.name)
AND NOT EXISTS (SELECT 1 FROM repo WHERE ",
    );
    qb.push(TRIPLE_MATCH);
    qb.push(") ORDER BY batch.id = 0, batch.ordinality");
    qb
}

/// One reconciled row per batch element, in ordinal order. Columns come from
/// the stored row when present and fall back to the batch value.
pub(crate) fn project_batch(batch: &str) -> QueryBuilder<'_, Sqlite> {
    let mut qb = with_batch(batch);
    qb.push("SELECT ");
    let mut columns = qb.separated(", ");
    for column in REPO_COLUMNS {
        columns.push(format_args!(
            "COALESCE(repo.{column}, batch.{column}) AS {column}"
        ));
    }
    qb.push(
        " FROM batch
LEFT JOIN repo ON repo.name = batch.name COLLATE NOCASE
ORDER BY batch.ordinality",
    );
    qb
}
