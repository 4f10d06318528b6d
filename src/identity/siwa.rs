//! Sign-In With Agent (SIWA) bearer tokens.
//!
//! A SIWA token is an ephemeral credential binding the signer's address
//! to a generation timestamp: the wallet signs the canonical message
//! `"Sign-In With Agent: <domain> wants you to sign in with your wallet
//! <address> at <timestamp>"` and the three parts are joined as
//! `<address>:<timestamp>:<signature>`. The remote verifier enforces
//! the freshness window; the client treats the token as opaque once
//! built and never caches it — every authenticated call signs anew.

use chrono::Utc;

use super::wallet::{Wallet, WalletError};

/// An ephemeral SIWA credential. Single-call scoped; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiwaToken {
    /// Signer address, lowercase 0x-prefixed hex.
    pub address: String,
    /// Unix seconds at which the token was generated.
    pub timestamp: i64,
    /// EIP-191 signature over the canonical message, 0x-prefixed hex.
    pub signature: String,
}

impl SiwaToken {
    /// Build and sign a fresh token for `domain`.
    ///
    /// One signing operation per call; a signing failure propagates and
    /// the caller must not attempt the request.
    pub async fn build(wallet: &Wallet, domain: &str) -> Result<Self, WalletError> {
        let address = wallet.address_hex();
        let timestamp = Utc::now().timestamp();
        let message = siwa_message(domain, &address, timestamp);
        let signature = wallet.sign_message(message.as_bytes()).await?;
        Ok(Self {
            address,
            timestamp,
            signature,
        })
    }

    /// The wire encoding: `<address>:<timestamp>:<signature>`.
    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.address, self.timestamp, self.signature)
    }

    /// The `Authorization` header value: `Bearer <encoded>`.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.encode())
    }

    /// Parse a wire-encoded token back into its parts.
    pub fn parse(token: &str) -> Option<Self> {
        let mut parts = token.splitn(3, ':');
        let address = parts.next()?.to_string();
        let timestamp = parts.next()?.parse().ok()?;
        let signature = parts.next()?.to_string();
        Some(Self {
            address,
            timestamp,
            signature,
        })
    }
}

/// The canonical message the wallet signs. The verifier rebuilds this
/// exact string from the token parts, so any drift here breaks auth.
pub fn siwa_message(domain: &str, address: &str, timestamp: i64) -> String {
    format!(
        "Sign-In With Agent: {domain} wants you to sign in with your wallet {address} at {timestamp}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_round_trips_through_encoding() {
        let wallet = Wallet::random();
        let token = SiwaToken::build(&wallet, "hub.example.org").await.unwrap();

        let parsed = SiwaToken::parse(&token.encode()).unwrap();
        assert_eq!(parsed.address, wallet.address_hex());
        assert_eq!(parsed.timestamp, token.timestamp);
        assert_eq!(parsed.signature, token.signature);
    }

    #[tokio::test]
    async fn header_value_is_bearer_prefixed() {
        let wallet = Wallet::random();
        let token = SiwaToken::build(&wallet, "hub.example.org").await.unwrap();
        let header = token.header_value();
        assert!(header.starts_with("Bearer 0x"));
        assert_eq!(header.matches(':').count(), 2);
    }

    #[tokio::test]
    async fn fresh_signature_every_call() {
        // Timestamps may collide within a second, but the contract is
        // that each build signs anew; the parts must still agree with
        // the canonical message for that timestamp.
        let wallet = Wallet::random();
        let token = SiwaToken::build(&wallet, "hub.example.org").await.unwrap();
        let message = siwa_message("hub.example.org", &token.address, token.timestamp);
        let resigned = wallet.sign_message(message.as_bytes()).await.unwrap();
        assert_eq!(resigned, token.signature);
    }

    #[test]
    fn parse_rejects_malformed_tokens() {
        assert!(SiwaToken::parse("0xabc").is_none());
        assert!(SiwaToken::parse("0xabc:not-a-number:0xsig").is_none());
    }

    #[test]
    fn parse_keeps_signature_colons_intact() {
        // splitn(3) must leave anything after the second colon alone.
        let parsed = SiwaToken::parse("0xabc:17:0xs:i:g").unwrap();
        assert_eq!(parsed.signature, "0xs:i:g");
    }
}
