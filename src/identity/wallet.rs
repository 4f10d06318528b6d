//! Signing wallet for agent identity.
//!
//! Wraps alloy's local signer. The private key is read once from the
//! environment (or generated for throwaway use) and held only inside
//! the signer for the lifetime of a run.

use alloy::primitives::{Address, hex};
use alloy::signers::Signer;
use alloy::signers::local::PrivateKeySigner;

/// A single unlocked signing capability: an address plus the ability to
/// produce EIP-191 personal-sign signatures over arbitrary messages.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Build a wallet from a hex-encoded private key (with or without
    /// the `0x` prefix).
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, WalletError> {
        let signer: PrivateKeySigner = private_key_hex
            .trim()
            .parse()
            .map_err(|_| WalletError::InvalidPrivateKey)?;
        Ok(Self { signer })
    }

    /// Generate a fresh random wallet (tests and dry runs).
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    /// The signer's Ethereum address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The signer's address as a lowercase 0x-prefixed hex string.
    pub fn address_hex(&self) -> String {
        format!("{:#x}", self.signer.address())
    }

    /// The underlying alloy signer, for wiring into a provider.
    pub fn signer(&self) -> PrivateKeySigner {
        self.signer.clone()
    }

    /// Sign an arbitrary message with EIP-191 personal_sign prefixing.
    ///
    /// Returns the signature as a 0x-prefixed hex string. A failure here
    /// means the key material is unavailable or the signer rejected the
    /// request; callers must not proceed with the authenticated call.
    pub async fn sign_message(&self, message: &[u8]) -> Result<String, WalletError> {
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

/// Wallet errors. `SigningFailed` is the authentication-unavailable case.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid private key format")]
    InvalidPrivateKey,
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_private_key_accepts_both_prefixes() {
        let wallet = Wallet::random();
        let key = format!("0x{}", hex::encode(wallet.signer.credential().to_bytes()));
        let with_prefix = Wallet::from_private_key(&key).unwrap();
        let without_prefix = Wallet::from_private_key(&key[2..]).unwrap();
        assert_eq!(with_prefix.address(), wallet.address());
        assert_eq!(without_prefix.address(), wallet.address());
    }

    #[test]
    fn rejects_garbage_key() {
        assert!(matches!(
            Wallet::from_private_key("not-a-key"),
            Err(WalletError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn address_hex_shape() {
        let addr = Wallet::random().address_hex();
        assert!(addr.starts_with("0x"));
        assert_eq!(addr.len(), 42);
    }

    #[tokio::test]
    async fn sign_message_produces_hex_signature() {
        let wallet = Wallet::random();
        let sig = wallet.sign_message(b"hello agentbridge").await.unwrap();
        assert!(sig.starts_with("0x"));
        // 65-byte ECDSA signature -> 130 hex chars after the 0x prefix.
        assert_eq!(sig.len(), 132);
    }
}
