//! Wallet capability implementations.
//!
//! The dashboard talks to wallets only through
//! [`WalletProvider`](crate::provider::WalletProvider). This module holds the
//! concrete implementation used by the CLI.
//!
//! # Architecture
//!
//! ```text
//! EvmWallet (kobe HD + alloy signer + alloy provider per chain)
//!   ├── builder()          → EvmWalletBuilder → build()
//!   ├── resolve_name()     → ENS forward lookup
//!   ├── lookup_address()   → ENS reverse lookup
//!   ├── balance()          → native balance on the active chain
//!   ├── send_transaction() → broadcast a transfer
//!   └── switch_chain()     → reconnect to another configured chain
//! ```
//!
//! # Key Derivation
//!
//! Uses [`kobe`] for BIP39 mnemonic management and [`kobe_eth`] for
//! Ethereum HD key derivation (BIP32/44). The derived private key is
//! then used with [`alloy`]'s `PrivateKeySigner` for signing.

mod evm;

pub use evm::{EvmWallet, EvmWalletBuilder};
