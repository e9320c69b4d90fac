//! Address resolution for free-form user input.
//!
//! Users type either a hex address or an ENS name into the same field.
//! [`AddressResolver`] turns that text into a validated [`Address`] or
//! nothing at all. It never fails loudly: empty, malformed and unresolvable
//! input all come back as `None`, and callers treat that as "no address".

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::provider::EnsLookup;

/// Default ENS name suffix.
pub const DEFAULT_ENS_SUFFIX: &str = ".eth";

/// Length of a `0x`-prefixed 20-byte hex address.
const ADDRESS_TEXT_LEN: usize = 42;

/// How mixed-case hex input is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// All-lowercase and all-uppercase input is accepted as is; mixed-case
    /// input must carry a correct EIP-55 checksum.
    #[default]
    Eip55,
    /// Casing is ignored.
    Lenient,
}

/// Resolves user input into on-chain addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressResolver {
    ens_suffix: String,
    checksum: ChecksumPolicy,
}

impl Default for AddressResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ENS_SUFFIX, ChecksumPolicy::default())
    }
}

impl AddressResolver {
    /// Create a resolver with the given ENS suffix and checksum policy.
    #[must_use]
    pub fn new(ens_suffix: impl Into<String>, checksum: ChecksumPolicy) -> Self {
        Self {
            ens_suffix: ens_suffix.into().to_ascii_lowercase(),
            checksum,
        }
    }

    /// The ENS suffix used to detect names.
    #[must_use]
    pub fn ens_suffix(&self) -> &str {
        &self.ens_suffix
    }

    /// The checksum policy applied to hex input.
    #[must_use]
    pub const fn checksum(&self) -> ChecksumPolicy {
        self.checksum
    }

    /// Whether `input` looks like an ENS name rather than a hex address.
    #[must_use]
    pub fn is_ens_name(&self, input: &str) -> bool {
        !self.ens_suffix.is_empty() && input.to_ascii_lowercase().contains(&self.ens_suffix)
    }

    /// Validate a hex address string without any network access.
    ///
    /// The input must be exactly `0x` followed by 40 hex digits.
    #[must_use]
    pub fn validate(&self, input: &str) -> Option<Address> {
        let input = input.trim();
        if input.len() != ADDRESS_TEXT_LEN {
            return None;
        }
        let digits = input.strip_prefix("0x")?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let address: Address = input.parse().ok()?;

        let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
        let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
        if self.checksum == ChecksumPolicy::Eip55
            && has_upper
            && has_lower
            && address.to_checksum(None) != input
        {
            debug!(input, "rejecting address with invalid checksum");
            return None;
        }

        Some(address)
    }

    /// Resolve free-form input to an address.
    ///
    /// ENS-looking input is sent to `ens` first and the returned candidate is
    /// validated. Anything else is validated directly as hex. Lookup errors
    /// are treated the same as a missing record.
    pub async fn resolve<E>(&self, input: &str, ens: &E) -> Option<Address>
    where
        E: EnsLookup + ?Sized,
    {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if !self.is_ens_name(input) {
            return self.validate(input);
        }

        match ens.resolve_name(input).await {
            Ok(Some(candidate)) if !candidate.is_zero() => {
                debug!(name = input, address = %candidate, "resolved ENS name");
                self.validate(&candidate.to_checksum(None))
            }
            Ok(_) => {
                debug!(name = input, "ENS name has no address");
                None
            }
            Err(e) => {
                debug!(name = input, error = %e, "ENS lookup failed");
                None
            }
        }
    }
}
