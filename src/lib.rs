//! agentbridge — portable onchain identity for autonomous agents.
//!
//! Agents mint an identity record with a remote hub, authenticate
//! subsequent calls with a wallet-signature bearer token (SIWA), and
//! batch-synchronize the hub's records into an ERC-8004 style identity
//! registry — one transaction per record through a single signing key,
//! with a nonce counter that is repaired from the chain after every
//! failure.
//!
//! Module map:
//! - [`identity`] — wallet, SIWA tokens, registration documents
//! - [`hub`] — hub API client and paginated ingestion
//! - [`chain`] — registry contract transport
//! - [`sync`] — the nonce-managed batch submitter
//! - [`settings`] — file + env configuration

pub mod chain;
pub mod hub;
pub mod identity;
pub mod settings;
pub mod sync;
