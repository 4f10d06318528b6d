//! Chain transport for the identity registry contract.
//!
//! Exposes exactly the operations the batch submitter needs: read the
//! signing account's pending nonce, submit one `register(string)`
//! transaction with an explicit nonce override, await its receipt, and
//! read the remaining balance. The trait seam keeps the nonce state
//! machine testable without an RPC endpoint.

use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::identity::wallet::Wallet;

sol! {
    #[sol(rpc)]
    contract IdentityRegistry {
        function register(string tokenURI) external returns (uint256 agentId);
    }
}

/// Chain-side failure kinds. Callers branch on the variant; the only
/// message inspection in the crate happens once, at this boundary,
/// when raw RPC error text is classified.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Transport-level RPC failure (connection, serialization).
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The chain rejected or reverted the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The receipt did not arrive within the configured bound.
    #[error("confirmation timed out for {0}")]
    ConfirmationTimeout(TxHash),

    /// The signing account cannot pay for gas. Fatal for a batch run:
    /// no repair is possible without operator intervention.
    #[error("signing account is out of funds")]
    OutOfFunds,
}

impl ChainError {
    /// Whether a batch run must abort rather than continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChainError::OutOfFunds)
    }

    /// Classify a raw node error message from a submission attempt.
    fn from_submit_message(message: String) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
            ChainError::OutOfFunds
        } else {
            ChainError::Rejected(message)
        }
    }
}

/// The operations the batch submitter consumes.
#[async_trait]
pub trait ChainTransport: Send + Sync {
    /// The signing account's *pending* transaction count — includes
    /// transactions broadcast but not yet confirmed.
    async fn pending_nonce(&self) -> Result<u64, ChainError>;

    /// Submit `register(tokenUri)` with an explicit nonce override.
    /// Returns as soon as the transaction is broadcast.
    async fn submit_register(&self, token_uri: &str, nonce: u64) -> Result<TxHash, ChainError>;

    /// Await the transaction's receipt, bounded by the configured
    /// timeout. A reverted receipt is a rejection.
    async fn await_confirmation(&self, tx: TxHash) -> Result<(), ChainError>;

    /// The signing account's remaining balance, in wei.
    async fn balance(&self) -> Result<U256, ChainError>;
}

/// Live transport against an Ethereum JSON-RPC endpoint.
pub struct EthRegistry {
    provider: DynProvider,
    contract: Address,
    signer_address: Address,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl EthRegistry {
    pub fn new(
        rpc_url: Url,
        wallet: &Wallet,
        contract: Address,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        let signer_address = wallet.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet.signer()))
            .connect_http(rpc_url)
            .erased();
        Self {
            provider,
            contract,
            signer_address,
            confirmation_timeout,
            poll_interval,
        }
    }
}

#[async_trait]
impl ChainTransport for EthRegistry {
    async fn pending_nonce(&self) -> Result<u64, ChainError> {
        self.provider
            .get_transaction_count(self.signer_address)
            .pending()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn submit_register(&self, token_uri: &str, nonce: u64) -> Result<TxHash, ChainError> {
        let registry = IdentityRegistry::new(self.contract, self.provider.clone());
        let pending = registry
            .register(token_uri.to_string())
            .nonce(nonce)
            .send()
            .await
            .map_err(|e| ChainError::from_submit_message(e.to_string()))?;
        let hash = *pending.tx_hash();
        debug!(%hash, nonce, "register transaction broadcast");
        Ok(hash)
    }

    async fn await_confirmation(&self, tx: TxHash) -> Result<(), ChainError> {
        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx)
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?;

            if let Some(receipt) = receipt {
                if receipt.status() {
                    return Ok(());
                }
                return Err(ChainError::Rejected(format!("transaction {tx} reverted")));
            }

            if Instant::now() >= deadline {
                return Err(ChainError::ConfirmationTimeout(tx));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn balance(&self) -> Result<U256, ChainError> {
        self.provider
            .get_balance(self.signer_address)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }
}
