//! EVM wallet capability backed by alloy.
//!
//! [`EvmWallet`] implements [`WalletProvider`] on top of a local signer
//! ([`kobe`] HD derivation or a raw private key) and one HTTP provider for
//! the active chain plus one for ENS lookups on mainnet. Without a key the
//! wallet runs read-only: lookups and balances work, sending does not.

use std::sync::Arc;

use alloy::ens::ProviderEnsExt;
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest as RpcTransactionRequest;
use alloy::signers::Signer;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::{ChainConfig, DeckConfig};
use crate::error::WalletError;
use crate::provider::{
    Balance, ChainId, ChainInfo, Credential, EnsLookup, TransactionRequest, TxHash,
    WalletProvider,
};

/// Builder for constructing an [`EvmWallet`].
///
/// Created by [`EvmWallet::builder`]. Use method chaining to configure
/// the wallet, then call [`build`](Self::build).
///
/// # Examples
///
/// ```rust,ignore
/// // Signing wallet from an HD mnemonic
/// let wallet = EvmWallet::builder()
///     .mnemonic("abandon abandon ...")
///     .index(0)
///     .chains(config.chains.clone())
///     .build()
///     .await?;
///
/// // Read-only wallet
/// let wallet = EvmWallet::builder()
///     .config(&DeckConfig::default())
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct EvmWalletBuilder {
    /// BIP39 mnemonic phrase.
    mnemonic: Option<String>,
    /// BIP39 passphrase (optional "25th word").
    passphrase: Option<String>,
    /// HD derivation index (default 0).
    index: u32,
    /// Raw private key hex string.
    private_key: Option<String>,
    /// Networks available for switching.
    chains: Vec<ChainConfig>,
    /// Chain selected on build (first chain if unset).
    chain_id: Option<ChainId>,
    /// RPC endpoint for ENS lookups.
    ens_rpc_url: Option<String>,
}

impl EvmWalletBuilder {
    /// Set the BIP39 mnemonic phrase for HD key derivation.
    #[must_use]
    pub fn mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.mnemonic = Some(mnemonic.into());
        self
    }

    /// Set the BIP39 passphrase (optional "25th word").
    #[must_use]
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Set the HD derivation index (default 0).
    #[must_use]
    pub const fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Set the private key directly (hex string, with or without 0x prefix).
    #[must_use]
    pub fn private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    /// Set the networks the wallet can switch between.
    #[must_use]
    pub fn chains(mut self, chains: Vec<ChainConfig>) -> Self {
        self.chains = chains;
        self
    }

    /// Select the initial chain.
    #[must_use]
    pub const fn chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Set the RPC endpoint used for ENS lookups.
    #[must_use]
    pub fn ens_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.ens_rpc_url = Some(url.into());
        self
    }

    /// Take chains, the initial chain and the ENS endpoint from a config.
    #[must_use]
    pub fn config(mut self, config: &DeckConfig) -> Self {
        self.chains = config.chains.clone();
        self.chain_id = config.initial_chain().map(|c| c.id);
        self.ens_rpc_url = config.ens_rpc_url().map(str::to_string);
        self
    }

    /// Build the [`EvmWallet`].
    ///
    /// At least one chain is required. With neither `mnemonic` nor
    /// `private_key` the wallet starts read-only and can be connected later.
    pub async fn build(mut self) -> Result<EvmWallet, WalletError> {
        let credential = match (self.mnemonic.take(), self.private_key.take()) {
            (Some(_), Some(_)) => {
                return Err(WalletError::Config(
                    "set either mnemonic or private_key, not both".into(),
                ));
            }
            (Some(phrase), None) => Some(Credential::Mnemonic {
                phrase,
                passphrase: self.passphrase.take(),
                index: self.index,
            }),
            (None, Some(key)) => Some(Credential::PrivateKey(key)),
            (None, None) => None,
        };
        let signer = credential.as_ref().map(signer_from_credential).transpose()?;

        let chain = match self.chain_id {
            Some(id) => self
                .chains
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or(WalletError::UnknownChain(id))?,
            None => self
                .chains
                .first()
                .cloned()
                .ok_or_else(|| WalletError::Config("at least one chain is required".into()))?,
        };

        let provider = connect_chain(&chain, signer.as_ref()).await?;
        let ens_url = self.ens_rpc_url.take().unwrap_or_else(|| chain.rpc_url.clone());
        let ens = if ens_url == chain.rpc_url {
            Arc::clone(&provider)
        } else {
            Arc::new(
                ProviderBuilder::new()
                    .connect(&ens_url)
                    .await
                    .map_err(|e| {
                        WalletError::provider(format!("failed to connect to '{ens_url}': {e}"))
                    })?
                    .erased(),
            )
        };

        info!(
            address = ?signer.as_ref().map(|s| s.address()),
            chain_id = chain.id,
            chain = %chain.name,
            "EVM wallet initialized",
        );

        Ok(EvmWallet {
            chains: self.chains,
            active: watch::Sender::new(ActiveChain {
                chain,
                provider,
                signer,
            }),
            ens,
        })
    }
}

/// Derive a signer from either kind of credential.
fn signer_from_credential(credential: &Credential) -> Result<PrivateKeySigner, WalletError> {
    match credential {
        Credential::PrivateKey(key) => signer_from_private_key(key),
        Credential::Mnemonic {
            phrase,
            passphrase,
            index,
        } => signer_from_mnemonic(phrase, passphrase.as_deref(), *index),
    }
}

/// Derive a signer from a BIP39 mnemonic using kobe.
fn signer_from_mnemonic(
    mnemonic: &str,
    passphrase: Option<&str>,
    index: u32,
) -> Result<PrivateKeySigner, WalletError> {
    let wallet = kobe::Wallet::from_mnemonic(mnemonic, passphrase)
        .map_err(|e| WalletError::Derivation(format!("invalid mnemonic: {e}")))?;

    let deriver = kobe_eth::Deriver::new(&wallet);
    let derived = deriver
        .derive(index)
        .map_err(|e| WalletError::Derivation(format!("key derivation failed: {e}")))?;

    let key_hex = &*derived.private_key_hex;
    key_hex
        .parse::<PrivateKeySigner>()
        .map_err(|e| WalletError::Derivation(format!("signer creation failed: {e}")))
}

/// Create a signer from a raw private key hex string.
fn signer_from_private_key(key: &str) -> Result<PrivateKeySigner, WalletError> {
    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse::<PrivateKeySigner>()
        .map_err(|e| WalletError::Config(format!("invalid private key: {e}")))
}

/// Connect to `chain`, attaching `signer` when present, and check that the
/// endpoint serves the expected chain.
async fn connect_chain(
    chain: &ChainConfig,
    signer: Option<&PrivateKeySigner>,
) -> Result<Arc<DynProvider<Ethereum>>, WalletError> {
    let url = &chain.rpc_url;
    let provider: DynProvider<Ethereum> = match signer {
        Some(signer) => ProviderBuilder::new()
            .wallet(signer.clone())
            .connect(url)
            .await
            .map_err(|e| WalletError::provider(format!("failed to connect to '{url}': {e}")))?
            .erased(),
        None => ProviderBuilder::new()
            .connect(url)
            .await
            .map_err(|e| WalletError::provider(format!("failed to connect to '{url}': {e}")))?
            .erased(),
    };

    let reported = provider
        .get_chain_id()
        .await
        .map_err(|e| WalletError::provider(format!("failed to get chain ID: {e}")))?;
    if reported != chain.id {
        return Err(WalletError::Config(format!(
            "rpc for '{}' serves chain {reported}, expected {}",
            chain.name, chain.id
        )));
    }

    Ok(Arc::new(provider))
}

/// The selected chain, its provider and the signer attached to it.
#[derive(Clone)]
struct ActiveChain {
    chain: ChainConfig,
    provider: Arc<DynProvider<Ethereum>>,
    signer: Option<PrivateKeySigner>,
}

/// An EVM-compatible wallet exposed as a [`WalletProvider`].
///
/// # Construction
///
/// ```rust,ignore
/// let wallet = EvmWallet::builder()
///     .private_key(std::env::var("WALLETDECK_PRIVATE_KEY")?)
///     .config(&config)
///     .build()
///     .await?;
/// ```
pub struct EvmWallet {
    /// Networks available for switching.
    chains: Vec<ChainConfig>,
    /// Active chain and signer, replaced on switch, connect and disconnect.
    active: watch::Sender<ActiveChain>,
    /// Provider used for ENS lookups.
    ens: Arc<DynProvider<Ethereum>>,
}

impl std::fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWallet")
            .field("address", &self.sender())
            .field("chain_id", &self.active.borrow().chain.id)
            .finish_non_exhaustive()
    }
}

impl EvmWallet {
    /// Create a builder for constructing an [`EvmWallet`].
    #[must_use]
    pub fn builder() -> EvmWalletBuilder {
        EvmWalletBuilder::default()
    }

    fn snapshot(&self) -> ActiveChain {
        self.active.borrow().clone()
    }
}

#[async_trait]
impl EnsLookup for EvmWallet {
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, WalletError> {
        match self.ens.resolve_name(name).await {
            Ok(address) => Ok(Some(address)),
            Err(e) => {
                // Unregistered names surface as resolver errors.
                debug!(name, error = %e, "ENS name not resolved");
                Ok(None)
            }
        }
    }

    async fn lookup_address(&self, address: Address) -> Result<Option<String>, WalletError> {
        match self.ens.lookup_address(&address).await {
            Ok(name) if !name.is_empty() => Ok(Some(name)),
            Ok(_) => Ok(None),
            Err(e) => {
                debug!(%address, error = %e, "no primary ENS name");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl WalletProvider for EvmWallet {
    fn sender(&self) -> Option<Address> {
        self.active.borrow().signer.as_ref().map(|s| s.address())
    }

    async fn connect(&self, credential: Credential) -> Result<Address, WalletError> {
        let signer = signer_from_credential(&credential)?;
        let ActiveChain { chain, .. } = self.snapshot();
        let provider = connect_chain(&chain, Some(&signer)).await?;

        let address = signer.address();
        info!(%address, connector = credential.kind().name(), "wallet connected");
        self.active.send_replace(ActiveChain {
            chain,
            provider,
            signer: Some(signer),
        });
        Ok(address)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        let ActiveChain { chain, signer, .. } = self.snapshot();
        if signer.is_none() {
            return Ok(());
        }
        let provider = connect_chain(&chain, None).await?;
        info!("wallet disconnected");
        self.active.send_replace(ActiveChain {
            chain,
            provider,
            signer: None,
        });
        Ok(())
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, WalletError> {
        let ActiveChain {
            provider, signer, ..
        } = self.snapshot();
        let from = signer
            .as_ref()
            .map(|s| s.address())
            .ok_or(WalletError::NotConnected)?;
        let tx = RpcTransactionRequest::default()
            .with_from(from)
            .with_to(request.to)
            .with_value(request.value);

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| WalletError::transaction(e.to_string()))?;

        let hash = *pending.tx_hash();
        info!(tx_hash = %hash, to = %request.to, "transaction broadcast");
        Ok(TxHash(hash))
    }

    async fn balance(&self, address: Address) -> Result<Balance, WalletError> {
        let ActiveChain {
            chain, provider, ..
        } = self.snapshot();
        let value = provider
            .get_balance(address)
            .await
            .map_err(|e| WalletError::provider(format!("failed to get balance: {e}")))?;
        Ok(Balance {
            value,
            decimals: chain.decimals,
            symbol: chain.symbol,
        })
    }

    fn chains(&self) -> Vec<ChainInfo> {
        self.chains.iter().map(ChainConfig::info).collect()
    }

    fn active_chain(&self) -> Option<ChainInfo> {
        Some(self.active.borrow().chain.info())
    }

    async fn switch_chain(&self, id: ChainId) -> Result<(), WalletError> {
        let ActiveChain { chain, signer, .. } = self.snapshot();
        if chain.id == id {
            return Ok(());
        }
        let chain = self
            .chains
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(WalletError::UnknownChain(id))?;

        let provider = connect_chain(&chain, signer.as_ref()).await?;
        info!(chain_id = chain.id, chain = %chain.name, "switched chain");
        self.active.send_replace(ActiveChain {
            chain,
            provider,
            signer,
        });
        Ok(())
    }
}
