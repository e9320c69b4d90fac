//! Wallet details and address search views.
//!
//! These are view models: they gather what the dashboard shows for an
//! address (primary ENS name, truncated address, native balance) and render
//! it as plain text lines.

use std::fmt;

use alloy::primitives::Address;
use futures::future::join;

use crate::address::AddressResolver;
use crate::error::WalletError;
use crate::provider::{Balance, WalletProvider};

/// Shown when no wallet is connected.
pub const NOT_CONNECTED: &str = "not connected";
/// Shown when the search input is empty.
pub const SEARCH_PROMPT: &str = "Enter ENS or 0x address";
/// Shown when the search input does not resolve.
pub const NOT_FOUND: &str = "Not found";

/// Number of balance characters shown.
const BALANCE_DISPLAY_LEN: usize = 7;

/// Shorten an address to `0x1234...abcd` (checksum casing).
#[must_use]
pub fn truncate_address(address: &Address) -> String {
    let text = address.to_checksum(None);
    format!("{}...{}", &text[..6], &text[text.len() - 4..])
}

/// Shorten a formatted balance to its first characters.
#[must_use]
pub fn truncate_balance(formatted: &str) -> &str {
    formatted
        .char_indices()
        .nth(BALANCE_DISPLAY_LEN)
        .map_or(formatted, |(idx, _)| &formatted[..idx])
}

/// Primary ENS name lookup outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsStatus {
    /// The address has a primary name.
    Name(String),
    /// No primary name.
    None,
    /// The lookup failed.
    Error,
}

/// Balance lookup outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceStatus {
    /// Balance fetched.
    Loaded(Balance),
    /// The lookup failed.
    Error(WalletError),
}

/// Details shown for one address, or a placeholder when there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletDetails {
    /// Nothing to show; the text explains why.
    Empty(&'static str),
    /// Details for a resolved address.
    Loaded {
        /// The address.
        address: Address,
        /// Its primary ENS name.
        ens: EnsStatus,
        /// Its native balance.
        balance: BalanceStatus,
    },
}

impl WalletDetails {
    /// Fetch ENS name and balance for `address` concurrently.
    pub async fn load<P>(provider: &P, address: Address) -> Self
    where
        P: WalletProvider + ?Sized,
    {
        let (ens, balance) = join(provider.lookup_address(address), provider.balance(address)).await;

        let ens = match ens {
            Ok(Some(name)) => EnsStatus::Name(name),
            Ok(None) => EnsStatus::None,
            Err(_) => EnsStatus::Error,
        };
        let balance = match balance {
            Ok(balance) => BalanceStatus::Loaded(balance),
            Err(e) => BalanceStatus::Error(e),
        };

        Self::Loaded {
            address,
            ens,
            balance,
        }
    }

    /// Details of the connected wallet, or [`NOT_CONNECTED`].
    pub async fn connected<P>(provider: &P) -> Self
    where
        P: WalletProvider + ?Sized,
    {
        match provider.sender() {
            Some(address) => Self::load(provider, address).await,
            None => Self::Empty(NOT_CONNECTED),
        }
    }

    /// Resolve search input and load its details.
    ///
    /// Empty input gives [`SEARCH_PROMPT`], unresolvable input gives
    /// [`NOT_FOUND`].
    pub async fn search<P>(provider: &P, resolver: &AddressResolver, input: &str) -> Self
    where
        P: WalletProvider + ?Sized,
    {
        if input.trim().is_empty() {
            return Self::Empty(SEARCH_PROMPT);
        }
        match resolver.resolve(input, provider).await {
            Some(address) => Self::load(provider, address).await,
            None => Self::Empty(NOT_FOUND),
        }
    }

    /// The address shown, if any.
    #[must_use]
    pub const fn address(&self) -> Option<&Address> {
        match self {
            Self::Loaded { address, .. } => Some(address),
            Self::Empty(_) => None,
        }
    }
}

impl fmt::Display for WalletDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty(text) => f.write_str(text),
            Self::Loaded {
                address,
                ens,
                balance,
            } => {
                match ens {
                    EnsStatus::Name(name) => writeln!(f, "{name}")?,
                    EnsStatus::Error => writeln!(f, "ENS details error")?,
                    EnsStatus::None => {}
                }
                writeln!(f, "Address: {}", truncate_address(address))?;
                match balance {
                    BalanceStatus::Loaded(balance) => write!(
                        f,
                        "Balance: {} {}",
                        truncate_balance(&balance.formatted()),
                        balance.symbol
                    ),
                    BalanceStatus::Error(_) => f.write_str("Balance: error"),
                }
            }
        }
    }
}
