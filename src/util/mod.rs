mod cancel;
mod format;

pub(crate) use cancel::guarded;
pub use format::{format_date, format_sources, truncate};
