//! Agent identity: signing wallet, SIWA bearer tokens, and the
//! portable registration document.
//!
//! Each agent has an Ethereum keypair; its address is the identity the
//! hub and the onchain registry both recognize. The SIWA token proves
//! control of that address to the hub on every authenticated call, and
//! the registration document is the claim payload the registry stores.

pub mod registration;
pub mod siwa;
pub mod wallet;

pub use registration::{CrossRefContext, RegistrationDocument, build_document, to_data_uri};
pub use siwa::SiwaToken;
pub use wallet::{Wallet, WalletError};
