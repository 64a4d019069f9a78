//! Periodic ingestion of tracked accounts' recent posts.
//!
//! For every tracked account, once per cycle: fetch recent posts from the
//! platform API, drop posts already stored, fill missing media from the first
//! outbound link's page preview, and persist the survivors in one grouped
//! write. Accounts are processed sequentially with a pause between them to
//! stay inside the platform's rate limits.

pub mod client;
pub mod dedup;
pub mod enrich;
pub mod error;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod preview;
pub mod scheduler;
pub mod store;
pub mod types;

mod retry;

pub use client::{PlatformClient, TimelineSource};
pub use error::IngestError;
pub use normalize::{normalize_timeline, Timeline};
pub use pipeline::{AccountOutcome, AccountPipeline, Stage};
pub use preview::{PreviewFetcher, PreviewResolver};
pub use scheduler::{CycleSummary, ScheduleConfig, Scheduler};
pub use store::{AccountRegistry, CycleJournal, PgIngestStore, PostStore};
