#![cfg_attr(docsrs, feature(doc_cfg))]
//! Walletdeck is the core of a wallet dashboard: recipient resolution, a
//! debounced native-token transfer form, and the details and network views
//! around it.
//!
//! Everything that needs a key or an RPC endpoint goes through
//! [`WalletProvider`]. [`EvmWallet`] implements it with alloy; tests use an
//! in-memory fake.
//!
//! ```text
//! raw input ──▶ Debounced ──▶ AddressResolver / parse_units ──▶ FormState
//!                                                                  │
//!                                          submit() ──▶ WalletProvider
//! ```

pub mod address;
pub mod config;
pub mod connection;
pub mod debounce;
pub mod details;
pub mod error;
pub mod form;
pub mod network;
pub mod provider;
pub mod units;
pub mod wallet;

pub use address::{AddressResolver, ChecksumPolicy};
pub use config::{ChainConfig, DeckConfig};
pub use connection::ConnectionPanel;
pub use debounce::{Debounced, FieldPhase};
pub use details::WalletDetails;
pub use error::{ConfigError, Error, FormError, Result, WalletError};
pub use form::{FormConfig, FormState, SubmissionStatus, TransactionForm};
pub use network::NetworkSelector;
pub use provider::{
    Balance, ChainId, ChainInfo, ConnectorKind, Credential, EnsLookup, TransactionRequest, TxHash,
    WalletProvider,
};
pub use units::{format_units, parse_ether, parse_units};
pub use wallet::{EvmWallet, EvmWalletBuilder};
