//! Wallet capability interface.
//!
//! Everything that touches a key or an RPC endpoint sits behind these
//! traits. The dashboard core only calls through them, which keeps address
//! resolution and the transaction form testable against in-memory fakes.
//!
//! # Architecture
//!
//! ```text
//! EnsLookup
//!   ├── resolve_name()   → name → Address
//!   └── lookup_address() → Address → primary name
//! WalletProvider: EnsLookup
//!   ├── sender()            → connected account
//!   ├── connect() / disconnect()
//!   ├── send_transaction()  → TxHash
//!   ├── balance()           → Balance
//!   └── chains() / active_chain() / switch_chain()
//! ```

use std::fmt;

use alloy::primitives::{Address, TxHash as B256Hash, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::units::format_units;

/// Numeric EVM chain identifier.
pub type ChainId = u64;

/// Hash of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub B256Hash);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A native-token transfer ready to hand to the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Recipient address.
    pub to: Address,
    /// Amount in the chain's base unit (wei for ETH).
    pub value: U256,
}

/// Native-token balance of an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    /// Amount in base units.
    pub value: U256,
    /// Decimal exponent of the display unit.
    pub decimals: u8,
    /// Display symbol, e.g. `ETH`.
    pub symbol: String,
}

impl Balance {
    /// The balance in display units, e.g. `"1.5"`.
    #[must_use]
    pub fn formatted(&self) -> String {
        format_units(self.value, self.decimals)
    }
}

/// A network the wallet can switch to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Chain ID.
    pub id: ChainId,
    /// Human-readable name.
    pub name: String,
}

/// A way of connecting a sending account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorKind {
    /// Raw hex private key.
    PrivateKey,
    /// BIP39 mnemonic with an HD index.
    Mnemonic,
}

impl ConnectorKind {
    /// Every connector, in display order.
    pub const ALL: [Self; 2] = [Self::PrivateKey, Self::Mnemonic];

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PrivateKey => "Private key",
            Self::Mnemonic => "Mnemonic",
        }
    }
}

/// Secret used to connect a sending account.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Hex private key, with or without `0x`.
    PrivateKey(String),
    /// BIP39 mnemonic.
    Mnemonic {
        /// Space-separated words.
        phrase: String,
        /// Optional BIP39 passphrase.
        passphrase: Option<String>,
        /// HD derivation index.
        index: u32,
    },
}

impl Credential {
    /// The connector this credential is used with.
    #[must_use]
    pub const fn kind(&self) -> ConnectorKind {
        match self {
            Self::PrivateKey(_) => ConnectorKind::PrivateKey,
            Self::Mnemonic { .. } => ConnectorKind::Mnemonic,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey(_) => f.write_str("PrivateKey(..)"),
            Self::Mnemonic { index, .. } => f
                .debug_struct("Mnemonic")
                .field("index", index)
                .finish_non_exhaustive(),
        }
    }
}

/// ENS name resolution.
#[async_trait]
pub trait EnsLookup: Send + Sync {
    /// Resolve an ENS name to an address.
    ///
    /// Returns `Ok(None)` when the name has no address record.
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, WalletError>;

    /// Reverse-resolve an address to its primary ENS name.
    async fn lookup_address(&self, address: Address) -> Result<Option<String>, WalletError>;
}

/// A connected wallet plus its RPC access.
#[async_trait]
pub trait WalletProvider: EnsLookup {
    /// The connected sending account, if any.
    fn sender(&self) -> Option<Address>;

    /// Connectors this wallet accepts.
    fn connectors(&self) -> Vec<ConnectorKind> {
        ConnectorKind::ALL.to_vec()
    }

    /// Connect a sending account, replacing the current one.
    async fn connect(&self, credential: Credential) -> Result<Address, WalletError>;

    /// Drop the sending account; the wallet stays usable read-only.
    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Submit a native-token transfer from the connected account.
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, WalletError>;

    /// Native-token balance of `address` on the active chain.
    async fn balance(&self, address: Address) -> Result<Balance, WalletError>;

    /// All networks the wallet can switch between.
    fn chains(&self) -> Vec<ChainInfo>;

    /// The currently selected network.
    fn active_chain(&self) -> Option<ChainInfo>;

    /// Switch the active network.
    async fn switch_chain(&self, id: ChainId) -> Result<(), WalletError>;
}
