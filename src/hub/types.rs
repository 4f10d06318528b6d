//! Wire types for the agent hub API.
//!
//! Field names follow the hub's camelCase JSON; unknown fields are
//! ignored so the client survives additive server changes.

use serde::{Deserialize, Serialize};

/// One agent's identity as known to the hub.
///
/// Immutable for the duration of a pipeline run; the batch submitter
/// never re-fetches a record after use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    /// Hub-assigned token id. Unique and monotonically assigned, but
    /// not guaranteed gapless.
    pub token_id: u64,

    /// Display name. Empty denotes an unnamed/placeholder mint.
    #[serde(default)]
    pub name: String,

    /// Free-text framework label (e.g., "eliza", "langchain").
    #[serde(default)]
    pub framework: String,

    /// The agent's wallet address.
    #[serde(default)]
    pub agent_address: String,
}

impl IdentityRecord {
    /// Whether the record carries a real name. Empty or whitespace-only
    /// names are placeholder mints and are never registered.
    pub fn is_named(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// One page of the agent list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPage {
    /// Server-reported total page count for the active filter.
    pub total: u64,
    /// 1-based page number of this response.
    pub page: u64,
    /// Records in server order.
    pub agents: Vec<IdentityRecord>,
}

/// Query parameters for the agent list.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Include records flagged as spam. Off by default server-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_spam: Option<bool>,
    /// Sort key, e.g. "tokenId" or "createdAt".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// Hub deployment metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubMetadata {
    pub chain_id: u64,
    pub contract_address: String,
    #[serde(default)]
    pub total_agents: u64,
}

/// Name availability check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameCheck {
    pub name: String,
    pub available: bool,
}

/// Referral lookup result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatus {
    pub address: String,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub referred_count: u64,
}

/// Onchain activity report for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnchainReport {
    pub token_id: u64,
    #[serde(default)]
    pub transactions: u64,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Social verification status for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatus {
    pub token_id: u64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Mint request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub name: String,
    pub framework: String,
    pub agent_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

/// Mint result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub token_id: u64,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

/// Personality/narrative/traits update. `onchain` asks the hub to also
/// push the change to the registry contract.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain: Option<bool>,
}

/// Social-channel verification request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelVerification {
    /// Channel name, e.g. "twitter" or "telegram".
    pub channel: String,
    /// Channel-issued proof (post URL, signed payload, ...).
    pub proof: String,
}

/// External token link request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTokenRequest {
    pub chain_id: u64,
    pub token_address: String,
}

/// A message group the agent participates in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageGroup {
    pub group_id: String,
    pub name: String,
    #[serde(default)]
    pub member_count: u64,
}

/// One message inside a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessage {
    pub sender: String,
    pub text: String,
    #[serde(default)]
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Group with its recent messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: MessageGroup,
    #[serde(default)]
    pub messages: Vec<GroupMessage>,
}

/// Group creation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
