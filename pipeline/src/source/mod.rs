//! Source adapters: one outbound GET per configured source.

pub mod client;
pub mod errors;
pub mod types;

pub use client::{Fetcher, HttpFetcher, MAX_TIMEOUT};
pub use errors::{FetchCause, FetchError};
pub use types::{RawDocument, SourceConfig, SourceKind};
