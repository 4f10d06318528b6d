//! Nonce-managed batch registration.
//!
//! Drives one `register(string)` transaction per ingested identity
//! record through a single signing key, strictly sequentially: an
//! account's nonces must be gapless and ordered, so parallel submission
//! from one key is disallowed by design.
//!
//! The local nonce counter advances optimistically after each broadcast
//! (submission is pipelined, not gated on confirmation). After *every*
//! failure the counter is repaired from the chain's pending transaction
//! count, because a failed local attempt may or may not have consumed a
//! nonce slot onchain; continuing with a stale counter would get every
//! subsequent submission rejected. Out-of-funds is the one fatal case:
//! the loop aborts immediately rather than burning error cycles.
//!
//! There is no exactly-once guarantee: a crash between broadcast and
//! confirmation leaves one transaction ambiguous. The deterministic
//! sort by token id plus the manual `skip` offset is the documented
//! recovery path, and the report carries the last confirmed token id
//! so operators don't have to infer the resume point from logs.

use std::time::Duration;

use alloy::primitives::U256;
use tracing::{error, info, warn};

use crate::chain::ChainTransport;
use crate::hub::types::IdentityRecord;
use crate::identity::registration::{CrossRefContext, build_document, to_data_uri};

/// Progress lines are always emitted for the first few confirmations,
/// then throttled to every Nth.
const PROGRESS_HEAD: usize = 3;

/// Maximum characters of error detail in per-record log lines.
const ERROR_DETAIL_LIMIT: usize = 120;

/// Tunables for one batch run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Records to bypass after filtering and sorting; the manual
    /// resume mechanism for a previous partial run.
    pub skip: usize,
    /// Settling pause between chain-mutating calls, letting prior
    /// transactions propagate before the next nonce is consumed. A
    /// scheduling nicety per RPC provider, not a correctness mechanism.
    pub settling_pause: Duration,
    /// Emit a progress line every Nth confirmed registration.
    pub progress_interval: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            settling_pause: Duration::from_millis(500),
            progress_interval: 25,
        }
    }
}

/// Outcome of a batch run, reported whether the loop completed
/// normally or aborted on a fatal failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Records confirmed onchain during this run.
    pub registered: usize,
    /// Per-record failures (submission or confirmation).
    pub errors: usize,
    /// Records excluded by the empty-name filter.
    pub skipped_unnamed: usize,
    /// Explicit resumable cursor: the highest token id confirmed.
    pub last_confirmed_token_id: Option<u64>,
    /// Signing account balance after the run, when readable.
    pub remaining_balance: Option<U256>,
    /// True when the run stopped early on an out-of-funds failure.
    pub aborted: bool,
}

/// Transient per-run state: the nonce counter and tallies, threaded
/// through each iteration rather than living in globals.
struct BatchRun {
    nonce: u64,
    registered: usize,
    errors: usize,
    last_confirmed_token_id: Option<u64>,
}

/// Filter out placeholder mints and order by ascending token id.
///
/// The sort is correctness-relevant: it makes re-runs with a numeric
/// skip offset deterministic and resumable. Returns the batch and the
/// count of records the name filter dropped.
pub fn prepare_batch(records: Vec<IdentityRecord>) -> (Vec<IdentityRecord>, usize) {
    let total = records.len();
    let mut batch: Vec<IdentityRecord> = records.into_iter().filter(|r| r.is_named()).collect();
    let skipped_unnamed = total - batch.len();
    batch.sort_by_key(|r| r.token_id);
    (batch, skipped_unnamed)
}

/// Register every record against the chain registry.
///
/// Errors only when the run cannot start at all (the initial pending
/// nonce read failed); per-record failures are counted and reported.
pub async fn run_batch<C: ChainTransport>(
    records: Vec<IdentityRecord>,
    chain: &C,
    ctx: &CrossRefContext,
    opts: &SyncOptions,
) -> Result<BatchReport, crate::chain::ChainError> {
    let (batch, skipped_unnamed) = prepare_batch(records);

    // The single authoritative start point; never re-read except to
    // repair after a failure.
    let initial_nonce = chain.pending_nonce().await?;
    let mut run = BatchRun {
        nonce: initial_nonce,
        registered: 0,
        errors: 0,
        last_confirmed_token_id: None,
    };

    info!(
        records = batch.len(),
        skip = opts.skip,
        skipped_unnamed,
        nonce = initial_nonce,
        "starting batch registration"
    );

    let mut aborted = false;
    for record in batch.iter().skip(opts.skip) {
        let uri = to_data_uri(&build_document(record, ctx));

        let outcome = match chain.submit_register(&uri, run.nonce).await {
            Ok(hash) => {
                // Optimistic advance: the next iteration's nonce is
                // committed as soon as this broadcast succeeds.
                run.nonce += 1;
                chain.await_confirmation(hash).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                run.registered += 1;
                run.last_confirmed_token_id = Some(record.token_id);
                if run.registered <= PROGRESS_HEAD
                    || run.registered.is_multiple_of(opts.progress_interval.max(1))
                {
                    info!(
                        token_id = record.token_id,
                        registered = run.registered,
                        "registered"
                    );
                }
            }
            Err(e) => {
                run.errors += 1;
                warn!(
                    token_id = record.token_id,
                    error = %truncate(&e.to_string(), ERROR_DETAIL_LIMIT),
                    "registration failed"
                );

                if e.is_fatal() {
                    error!(
                        token_id = record.token_id,
                        "FATAL: signing account out of funds, aborting batch"
                    );
                    aborted = true;
                    break;
                }

                // Mandatory repair: the failed attempt may or may not
                // have consumed a nonce slot onchain. Pending, not
                // confirmed — broadcast-but-unconfirmed counts.
                match chain.pending_nonce().await {
                    Ok(n) => run.nonce = n,
                    Err(resync_err) => {
                        warn!(error = %resync_err, "nonce resync failed, keeping current counter");
                    }
                }
            }
        }

        if !opts.settling_pause.is_zero() {
            tokio::time::sleep(opts.settling_pause).await;
        }
    }

    let remaining_balance = chain.balance().await.ok();
    info!(
        registered = run.registered,
        errors = run.errors,
        skipped_unnamed,
        last_confirmed = ?run.last_confirmed_token_id,
        aborted,
        "batch registration finished"
    );

    Ok(BatchReport {
        registered: run.registered,
        errors: run.errors,
        skipped_unnamed,
        last_confirmed_token_id: run.last_confirmed_token_id,
        remaining_balance,
        aborted,
    })
}

fn truncate(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use alloy::primitives::TxHash;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chain::ChainError;
    use crate::identity::registration::decode_data_uri;

    fn record(token_id: u64, name: &str) -> IdentityRecord {
        IdentityRecord {
            token_id,
            name: name.to_string(),
            framework: "eliza".to_string(),
            agent_address: format!("0x{token_id:040x}"),
        }
    }

    fn ctx() -> CrossRefContext {
        CrossRefContext {
            chain_id: 8453,
            registry_address: "0x2222222222222222222222222222222222222222".to_string(),
        }
    }

    fn opts() -> SyncOptions {
        SyncOptions {
            skip: 0,
            settling_pause: Duration::ZERO,
            progress_interval: 25,
        }
    }

    /// What a submission attempt should do in the mock.
    enum Plan {
        Confirm,
        FailSubmit(fn() -> ChainError),
        FailConfirm(fn() -> ChainError),
    }

    struct MockState {
        /// Values returned by successive pending_nonce reads; the last
        /// one repeats.
        nonce_reads: VecDeque<u64>,
        last_nonce: u64,
        /// Per-attempt behavior, in order; extra attempts confirm.
        plans: VecDeque<Plan>,
        /// Every (nonce, uri) pair passed to submit_register.
        submissions: Vec<(u64, String)>,
    }

    struct MockChain {
        state: Mutex<MockState>,
    }

    impl MockChain {
        fn new(nonce_reads: Vec<u64>, plans: Vec<Plan>) -> Self {
            Self {
                state: Mutex::new(MockState {
                    nonce_reads: nonce_reads.into(),
                    last_nonce: 0,
                    plans: plans.into(),
                    submissions: Vec::new(),
                }),
            }
        }

        fn submissions(&self) -> Vec<(u64, String)> {
            self.state.lock().unwrap().submissions.clone()
        }
    }

    #[async_trait]
    impl ChainTransport for MockChain {
        async fn pending_nonce(&self) -> Result<u64, ChainError> {
            let mut state = self.state.lock().unwrap();
            if let Some(n) = state.nonce_reads.pop_front() {
                state.last_nonce = n;
            }
            Ok(state.last_nonce)
        }

        async fn submit_register(&self, token_uri: &str, nonce: u64) -> Result<TxHash, ChainError> {
            let mut state = self.state.lock().unwrap();
            state.submissions.push((nonce, token_uri.to_string()));
            // A submit failure consumes its plan here; confirm plans
            // stay queued for await_confirmation.
            if matches!(state.plans.front(), Some(Plan::FailSubmit(_))) {
                let Some(Plan::FailSubmit(err)) = state.plans.pop_front() else {
                    unreachable!()
                };
                return Err(err());
            }
            Ok(TxHash::ZERO)
        }

        async fn await_confirmation(&self, _tx: TxHash) -> Result<(), ChainError> {
            let mut state = self.state.lock().unwrap();
            match state.plans.pop_front() {
                Some(Plan::FailConfirm(err)) => Err(err()),
                _ => Ok(()),
            }
        }

        async fn balance(&self) -> Result<U256, ChainError> {
            Ok(U256::from(1_000_000_000_000_000u64))
        }
    }

    #[test]
    fn name_filter_drops_exactly_the_unnamed() {
        let records = vec![
            record(1, "a"),
            record(2, ""),
            record(3, "b"),
            record(4, "   "),
            record(5, "c"),
        ];
        let (batch, skipped) = prepare_batch(records);
        assert_eq!(batch.len(), 3);
        assert_eq!(skipped, 2);
        assert!(batch.iter().all(|r| r.is_named()));
    }

    #[test]
    fn batch_sorts_ascending_by_token_id() {
        let (batch, _) = prepare_batch(vec![record(9, "x"), record(3, "y"), record(7, "z")]);
        assert_eq!(
            batch.iter().map(|r| r.token_id).collect::<Vec<_>>(),
            vec![3, 7, 9]
        );
    }

    #[tokio::test]
    async fn clean_run_uses_consecutive_nonces() {
        let chain = MockChain::new(vec![50], vec![]);
        let records = vec![record(1, "a"), record(2, "b"), record(3, "c")];

        let report = run_batch(records, &chain, &ctx(), &opts()).await.unwrap();
        assert_eq!(report.registered, 3);
        assert_eq!(report.errors, 0);
        assert!(!report.aborted);
        assert_eq!(report.last_confirmed_token_id, Some(3));

        let nonces: Vec<u64> = chain.submissions().iter().map(|(n, _)| *n).collect();
        assert_eq!(nonces, vec![50, 51, 52]);
    }

    #[tokio::test]
    async fn submitted_uri_decodes_to_the_record_document() {
        let chain = MockChain::new(vec![0], vec![]);
        let report = run_batch(vec![record(42, "scout")], &chain, &ctx(), &opts())
            .await
            .unwrap();
        assert_eq!(report.registered, 1);

        let (_, uri) = &chain.submissions()[0];
        let doc = decode_data_uri(uri).unwrap();
        assert_eq!(doc.name, "scout");
        assert_eq!(doc.registrations[0].agent_id, 42);
    }

    #[tokio::test]
    async fn failure_resyncs_nonce_from_pending() {
        // Failure on record index 2 of 5; the resync read returns 77,
        // so index 3 must use 77, not initial + 3.
        let chain = MockChain::new(
            vec![50, 77],
            vec![
                Plan::Confirm,
                Plan::Confirm,
                Plan::FailSubmit(|| ChainError::Rejected("nonce too low".into())),
            ],
        );
        let records = (1..=5).map(|i| record(i, "agent")).collect();

        let report = run_batch(records, &chain, &ctx(), &opts()).await.unwrap();
        assert_eq!(report.registered, 4);
        assert_eq!(report.errors, 1);

        let nonces: Vec<u64> = chain.submissions().iter().map(|(n, _)| *n).collect();
        assert_eq!(nonces, vec![50, 51, 52, 77, 78]);
    }

    #[tokio::test]
    async fn confirmation_failure_also_resyncs() {
        // The broadcast consumed a nonce slot but confirmation timed
        // out; the pending read reflects the in-flight transaction.
        let chain = MockChain::new(
            vec![10, 12],
            vec![
                Plan::Confirm,
                Plan::FailConfirm(|| ChainError::ConfirmationTimeout(TxHash::ZERO)),
            ],
        );
        let records = (1..=3).map(|i| record(i, "agent")).collect();

        let report = run_batch(records, &chain, &ctx(), &opts()).await.unwrap();
        assert_eq!(report.registered, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.last_confirmed_token_id, Some(3));

        let nonces: Vec<u64> = chain.submissions().iter().map(|(n, _)| *n).collect();
        assert_eq!(nonces, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn out_of_funds_aborts_remaining_records() {
        // Fatal failure at index 2 of 5: no attempt past it, a single
        // counted error, successes before it preserved.
        let chain = MockChain::new(
            vec![0],
            vec![
                Plan::Confirm,
                Plan::Confirm,
                Plan::FailSubmit(|| ChainError::OutOfFunds),
            ],
        );
        let records = (1..=5).map(|i| record(i, "agent")).collect();

        let report = run_batch(records, &chain, &ctx(), &opts()).await.unwrap();
        assert!(report.aborted);
        assert_eq!(report.registered, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(chain.submissions().len(), 3);
        assert_eq!(report.last_confirmed_token_id, Some(2));
    }

    #[tokio::test]
    async fn skip_offset_resumes_after_sort() {
        let chain = MockChain::new(vec![5], vec![]);
        let records = vec![record(9, "x"), record(3, "y"), record(7, "z")];

        let report = run_batch(
            records,
            &chain,
            &ctx(),
            &SyncOptions {
                skip: 1,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert_eq!(report.registered, 2);

        // Sorted order is [3, 7, 9]; skipping 1 starts at token 7.
        let uris: Vec<u64> = chain
            .submissions()
            .iter()
            .map(|(_, uri)| decode_data_uri(uri).unwrap().registrations[0].agent_id)
            .collect();
        assert_eq!(uris, vec![7, 9]);
    }

    #[tokio::test]
    async fn empty_batch_reports_zeroes() {
        let chain = MockChain::new(vec![0], vec![]);
        let report = run_batch(vec![record(1, "")], &chain, &ctx(), &opts())
            .await
            .unwrap();
        assert_eq!(report.registered, 0);
        assert_eq!(report.errors, 0);
        assert_eq!(report.skipped_unnamed, 1);
        assert_eq!(report.last_confirmed_token_id, None);
        assert!(chain.submissions().is_empty());
    }
}
