//! Authenticated hub API client.
//!
//! One method per remote capability, all sharing the same dispatch
//! path: build the URL from the base and a fixed path template, attach
//! a freshly signed SIWA header for write calls, and map non-success
//! responses into [`HubError::Remote`] carrying the HTTP status and
//! the parsed (or raw) error body. Callers branch on status codes,
//! never on message text.
//!
//! The client does no retrying, caching, or rate limiting — that
//! discipline belongs to callers.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::identity::siwa::SiwaToken;
use crate::identity::wallet::{Wallet, WalletError};

use super::types::{
    AgentPage, ChannelVerification, CreateGroup, GroupDetail, GroupMessage, HubMetadata,
    IdentityRecord, LinkTokenRequest, ListParams, MessageGroup, MintReceipt, MintRequest,
    NameCheck, OnchainReport, ProfileUpdate, ReferralStatus, VerificationStatus,
};

/// Hub API errors.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Transient network or protocol failure before a response arrived.
    #[error("hub transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The hub answered with a non-success status.
    #[error("hub returned {status}: {body}")]
    Remote { status: StatusCode, body: String },

    /// SIWA signing failed; the request was never sent.
    #[error("authentication unavailable: {0}")]
    Auth(#[from] WalletError),

    /// The configured base URL cannot be joined with an API path.
    #[error("invalid hub URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Structured error body the hub returns on failures. Either field may
/// be present depending on the handler; raw text is the fallback.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the agent hub.
#[derive(Debug, Clone)]
pub struct HubClient {
    base: Url,
    http: reqwest::Client,
    /// SIWA domain the hub verifier expects.
    siwa_domain: String,
}

impl HubClient {
    /// Build a client for `base` with a bounded request timeout.
    pub fn new(base: Url, siwa_domain: impl Into<String>) -> Result<Self, HubError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base,
            http,
            siwa_domain: siwa_domain.into(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, HubError> {
        Ok(self.base.join(path)?)
    }

    /// Attach a freshly signed SIWA bearer header. Called immediately
    /// before each authenticated request — tokens are never reused
    /// because the timestamp binds freshness.
    async fn authed(&self, req: RequestBuilder, wallet: &Wallet) -> Result<RequestBuilder, HubError> {
        let token = SiwaToken::build(wallet, &self.siwa_domain).await?;
        Ok(req.header(reqwest::header::AUTHORIZATION, token.header_value()))
    }

    /// Issue the request and decode the declared result shape, mapping
    /// non-success statuses into [`HubError::Remote`].
    async fn dispatch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, HubError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let raw = resp.text().await.unwrap_or_default();
        let body = match serde_json::from_str::<ErrorBody>(&raw) {
            Ok(parsed) => parsed.error.or(parsed.message).unwrap_or(raw),
            Err(_) => raw,
        };
        debug!(%status, %body, "hub call failed");
        Err(HubError::Remote { status, body })
    }

    // --- read surface (unauthenticated) ---

    /// List agents. Filter and sort parameters are serialized as a
    /// validated query string; nothing is interpolated raw.
    pub async fn list_agents(&self, params: &ListParams) -> Result<AgentPage, HubError> {
        let req = self.http.get(self.url("agents")?).query(params);
        self.dispatch(req).await
    }

    /// Fetch one agent by token id.
    pub async fn get_agent(&self, token_id: u64) -> Result<IdentityRecord, HubError> {
        let req = self.http.get(self.url(&format!("agents/{token_id}"))?);
        self.dispatch(req).await
    }

    /// Hub deployment metadata (chain id, contract, totals).
    pub async fn metadata(&self) -> Result<HubMetadata, HubError> {
        let req = self.http.get(self.url("metadata")?);
        self.dispatch(req).await
    }

    /// Check whether a name is still available to mint.
    pub async fn check_name(&self, name: &str) -> Result<NameCheck, HubError> {
        let req = self
            .http
            .get(self.url("agents/check-name")?)
            .query(&[("name", name)]);
        self.dispatch(req).await
    }

    /// Referral status for an address.
    pub async fn check_referral(&self, address: &str) -> Result<ReferralStatus, HubError> {
        let req = self
            .http
            .get(self.url("referrals")?)
            .query(&[("address", address)]);
        self.dispatch(req).await
    }

    /// Onchain activity report for one agent.
    pub async fn onchain_report(&self, token_id: u64) -> Result<OnchainReport, HubError> {
        let req = self
            .http
            .get(self.url(&format!("agents/{token_id}/report"))?);
        self.dispatch(req).await
    }

    /// Social verification status for one agent.
    pub async fn verification_status(&self, token_id: u64) -> Result<VerificationStatus, HubError> {
        let req = self
            .http
            .get(self.url(&format!("agents/{token_id}/verification"))?);
        self.dispatch(req).await
    }

    // --- write surface (SIWA-authenticated) ---

    /// Mint a new identity record.
    pub async fn mint(&self, wallet: &Wallet, body: &MintRequest) -> Result<MintReceipt, HubError> {
        let req = self.http.post(self.url("agents/mint")?).json(body);
        let req = self.authed(req, wallet).await?;
        self.dispatch(req).await
    }

    /// Update personality/narrative/traits, optionally pushing onchain.
    pub async fn update_profile(
        &self,
        wallet: &Wallet,
        token_id: u64,
        body: &ProfileUpdate,
    ) -> Result<IdentityRecord, HubError> {
        let req = self
            .http
            .request(Method::PUT, self.url(&format!("agents/{token_id}/profile"))?)
            .json(body);
        let req = self.authed(req, wallet).await?;
        self.dispatch(req).await
    }

    /// Verify the agent through a social channel.
    pub async fn verify_channel(
        &self,
        wallet: &Wallet,
        token_id: u64,
        body: &ChannelVerification,
    ) -> Result<VerificationStatus, HubError> {
        let req = self
            .http
            .post(self.url(&format!("agents/{token_id}/verify"))?)
            .json(body);
        let req = self.authed(req, wallet).await?;
        self.dispatch(req).await
    }

    /// Link an external token to the agent.
    pub async fn link_token(
        &self,
        wallet: &Wallet,
        token_id: u64,
        body: &LinkTokenRequest,
    ) -> Result<IdentityRecord, HubError> {
        let req = self
            .http
            .post(self.url(&format!("agents/{token_id}/link-token"))?)
            .json(body);
        let req = self.authed(req, wallet).await?;
        self.dispatch(req).await
    }

    // --- message groups (SIWA-authenticated) ---

    /// Groups visible to the signing agent.
    pub async fn list_groups(&self, wallet: &Wallet) -> Result<Vec<MessageGroup>, HubError> {
        let req = self.http.get(self.url("groups")?);
        let req = self.authed(req, wallet).await?;
        self.dispatch(req).await
    }

    /// One group with its recent messages.
    pub async fn get_group(&self, wallet: &Wallet, group_id: &str) -> Result<GroupDetail, HubError> {
        let req = self.http.get(self.url(&format!("groups/{group_id}"))?);
        let req = self.authed(req, wallet).await?;
        self.dispatch(req).await
    }

    /// Post a message to a group.
    pub async fn send_group_message(
        &self,
        wallet: &Wallet,
        group_id: &str,
        text: &str,
    ) -> Result<GroupMessage, HubError> {
        let req = self
            .http
            .post(self.url(&format!("groups/{group_id}/messages"))?)
            .json(&serde_json::json!({ "text": text }));
        let req = self.authed(req, wallet).await?;
        self.dispatch(req).await
    }

    /// Join a group.
    pub async fn join_group(&self, wallet: &Wallet, group_id: &str) -> Result<MessageGroup, HubError> {
        let req = self.http.post(self.url(&format!("groups/{group_id}/join"))?);
        let req = self.authed(req, wallet).await?;
        self.dispatch(req).await
    }

    /// Create a group.
    pub async fn create_group(
        &self,
        wallet: &Wallet,
        body: &CreateGroup,
    ) -> Result<MessageGroup, HubError> {
        let req = self.http.post(self.url("groups")?).json(body);
        let req = self.authed(req, wallet).await?;
        self.dispatch(req).await
    }
}
