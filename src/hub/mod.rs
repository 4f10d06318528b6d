//! Agent hub API: wire types, the authenticated client, and paginated
//! ingestion of the full record set.

pub mod client;
pub mod ingest;
pub mod types;

pub use client::{HubClient, HubError};
pub use ingest::{PageSource, fetch_all};
pub use types::{AgentPage, IdentityRecord, ListParams};
