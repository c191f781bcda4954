mod metadata;
mod repo;

pub use metadata::Metadata;
pub use repo::{ExternalRepo, Repo};
