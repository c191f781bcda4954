mod codec;
mod database;
mod paginate;
mod query;
mod store;
mod tx;

pub use codec::{decode_sources, encode_sources};
pub use database::Database;
pub use paginate::{Cursor, PageSource, Paginator, DEFAULT_PAGE_SIZE};
pub use query::ListReposQuery;
pub use store::{DbStore, RepoStore, Transactor, TxStore};
pub use tx::{DbHandle, TxBehavior, TxOptions, TxState};

// Bump to drop and recreate the repo table on next open
pub const SCHEMA_VERSION: &str = "1";
