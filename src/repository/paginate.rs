//! Cursor pagination over a monotonically increasing key.

use crate::error::StoreResult;
use crate::model::Repo;

pub const DEFAULT_PAGE_SIZE: i64 = 500;

/// An item positioned by a strictly increasing key
pub trait Cursor {
    fn cursor(&self) -> i64;
}

impl Cursor for Repo {
    fn cursor(&self) -> i64 {
        self.id
    }
}

/// Something that can serve items with a key greater than `cursor`, in
/// ascending key order, at most `limit` at a time.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    type Item: Cursor;

    async fn fetch_page(&mut self, cursor: i64, limit: i64) -> StoreResult<Vec<Self::Item>>;
}

/// Walks a [`PageSource`] until it is exhausted.
///
/// Each round asks for items past the cursor and advances the cursor to the
/// last key returned. The walk ends on a short page or when a round fails to
/// advance the cursor, so it terminates even under concurrent inserts. Pages
/// are not a consistent snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: i64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(page_size: i64) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Append every item to `acc`, returning the number of rounds fetched
    pub async fn collect_into<S: PageSource>(
        &self,
        source: &mut S,
        acc: &mut Vec<S::Item>,
    ) -> StoreResult<usize> {
        let mut cursor = 0;
        let mut rounds = 0;

        loop {
            let page = source.fetch_page(cursor, self.page_size).await?;
            rounds += 1;

            let fetched = page.len();
            let next = page.last().map_or(cursor, Cursor::cursor);
            acc.extend(page);

            tracing::debug!(round = rounds, cursor, fetched, "fetched page");

            if next <= cursor || (fetched as i64) < self.page_size {
                break;
            }
            cursor = next;
        }

        Ok(rounds)
    }
}
