//! Paginated ingestion of the full identity record set.
//!
//! Pages are requested in increasing order starting at 1 and ingestion
//! stops on the first empty page or once the server-reported total page
//! count has been reached. Records come back in server order — no
//! dedup, no resorting; the batch submitter sorts separately.
//!
//! Any page failure aborts the whole run. Ingestion is a cold-start
//! phase with no partial-results contract: a batch must never start
//! from an incomplete record set.

use async_trait::async_trait;
use tracing::{debug, info};

use super::client::{HubClient, HubError};
use super::types::{AgentPage, IdentityRecord, ListParams};

/// A source of agent list pages. Seam between ingestion and the live
/// hub client so the termination rules are testable offline.
#[async_trait]
pub trait PageSource {
    async fn fetch_page(&self, page: u64, page_size: u64) -> Result<AgentPage, HubError>;
}

#[async_trait]
impl PageSource for HubClient {
    async fn fetch_page(&self, page: u64, page_size: u64) -> Result<AgentPage, HubError> {
        let params = ListParams {
            page: Some(page),
            page_size: Some(page_size),
            include_spam: Some(true),
            sort: Some("tokenId".to_string()),
            ..Default::default()
        };
        self.list_agents(&params).await
    }
}

/// Fetch every record the source knows about.
pub async fn fetch_all<S: PageSource>(
    source: &S,
    page_size: u64,
) -> Result<Vec<IdentityRecord>, HubError> {
    let (records, pages_fetched) = fetch_all_counted(source, page_size).await?;
    info!(records = records.len(), pages_fetched, "ingestion complete");
    Ok(records)
}

/// Ingestion loop, also reporting how many pages carried records. A
/// terminating empty page is requested but not counted as fetched.
async fn fetch_all_counted<S: PageSource>(
    source: &S,
    page_size: u64,
) -> Result<(Vec<IdentityRecord>, u64), HubError> {
    let mut records = Vec::new();
    let mut page = 1;
    let mut pages_fetched = 0u64;

    loop {
        let batch = source.fetch_page(page, page_size).await?;
        debug!(page, count = batch.agents.len(), total_pages = batch.total, "fetched page");

        if batch.agents.is_empty() {
            break;
        }
        records.extend(batch.agents);
        pages_fetched += 1;

        if page >= batch.total {
            break;
        }
        page += 1;
    }

    Ok((records, pages_fetched))
}
