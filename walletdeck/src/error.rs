//! Unified error types for walletdeck.
//!
//! Validation of user input never produces an error: malformed addresses and
//! amounts simply yield `None`. Errors here cover the things that can fail
//! outside the user's keyboard:
//! - Wallet capability failures (RPC, signing, chain selection)
//! - Transfer submission
//! - Configuration loading

use crate::provider::ChainId;

/// Result type alias for walletdeck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for walletdeck.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Wallet capability error.
    #[error("wallet: {0}")]
    Wallet(#[from] WalletError),

    /// Transaction form error.
    #[error("form: {0}")]
    Form(#[from] FormError),

    /// Configuration error.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Errors reported by a wallet capability.
///
/// The `Display` output of these errors is shown to the user as-is when a
/// submission fails, so messages are kept human-readable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum WalletError {
    /// The wallet was built with missing or conflicting settings.
    #[error("invalid wallet configuration: {0}")]
    Config(String),

    /// Key derivation from a mnemonic or private key failed.
    #[error("key derivation failed: {0}")]
    Derivation(String),

    /// The RPC provider returned an error.
    #[error("{0}")]
    Provider(String),

    /// A transaction was rejected or could not be confirmed.
    #[error("{0}")]
    Transaction(String),

    /// The requested chain is not configured.
    #[error("unknown chain id {0}")]
    UnknownChain(ChainId),

    /// No sending account is connected.
    #[error("no wallet connected")]
    NotConnected,

    /// Another network switch has not finished yet.
    #[error("network switch already in progress")]
    SwitchInProgress,

    /// Another connection attempt has not finished yet.
    #[error("connection already in progress")]
    ConnectInProgress,
}

impl WalletError {
    /// Create a provider error.
    #[must_use]
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a transaction error.
    #[must_use]
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }
}

/// Errors returned by [`TransactionForm::submit`](crate::form::TransactionForm::submit).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FormError {
    /// Submit was requested while the submit action is disabled.
    #[error("transaction is not ready to submit")]
    NotReady,

    /// The wallet refused or failed to send the transaction.
    #[error("{0}")]
    Submission(#[from] WalletError),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for [`DeckConfig`](crate::config::DeckConfig).
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range or inconsistent.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create an invalid value error.
    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
