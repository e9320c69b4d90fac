//! Network selector view model.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::error::WalletError;
use crate::provider::{ChainId, ChainInfo, WalletProvider};

/// One row of the network list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEntry {
    /// The network.
    pub info: ChainInfo,
    /// Whether it is the active network.
    pub active: bool,
}

/// Switching state shown alongside the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorState {
    /// Chain being switched to, while a switch is in flight.
    pub switching: Option<ChainId>,
    /// Message of the last failed switch.
    pub error: Option<String>,
}

/// Lists the wallet's networks and switches between them, one switch at a
/// time.
pub struct NetworkSelector {
    wallet: Arc<dyn WalletProvider>,
    state: watch::Sender<SelectorState>,
}

impl fmt::Debug for NetworkSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkSelector")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl NetworkSelector {
    /// Create a selector over `wallet`.
    #[must_use]
    pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
        Self {
            wallet,
            state: watch::Sender::new(SelectorState::default()),
        }
    }

    /// Networks in configured order, with the active one marked.
    #[must_use]
    pub fn entries(&self) -> Vec<NetworkEntry> {
        let active = self.wallet.active_chain().map(|c| c.id);
        self.wallet
            .chains()
            .into_iter()
            .map(|info| NetworkEntry {
                active: Some(info.id) == active,
                info,
            })
            .collect()
    }

    /// Current switching state.
    #[must_use]
    pub fn state(&self) -> SelectorState {
        self.state.borrow().clone()
    }

    /// Watch switching state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SelectorState> {
        self.state.subscribe()
    }

    /// Whether a switch is in flight.
    #[must_use]
    pub fn is_switching(&self) -> bool {
        self.state.borrow().switching.is_some()
    }

    /// Message of the last failed switch.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Switch the active network.
    ///
    /// Fails with [`WalletError::SwitchInProgress`] while another switch is
    /// running. A failure is also kept as [`last_error`](Self::last_error)
    /// until the next switch starts.
    pub async fn switch(&self, id: ChainId) -> Result<(), WalletError> {
        let started = self.state.send_if_modified(|s| {
            if s.switching.is_some() {
                return false;
            }
            s.switching = Some(id);
            s.error = None;
            true
        });
        if !started {
            return Err(WalletError::SwitchInProgress);
        }

        let guard = SwitchGuard {
            state: &self.state,
            armed: true,
        };
        let result = self.wallet.switch_chain(id).await;
        guard.disarm();

        let error = result.as_ref().err().map(ToString::to_string);
        if let Some(message) = &error {
            warn!(chain_id = id, error = %message, "network switch failed");
        }
        self.state.send_modify(|s| {
            s.switching = None;
            s.error = error;
        });
        result
    }
}

impl fmt::Display for NetworkSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        if state.switching.is_some() {
            writeln!(f, "Supported networks (loading)")?;
        } else {
            writeln!(f, "Supported networks")?;
        }
        for entry in self.entries() {
            let marker = if entry.active { "*" } else { " " };
            writeln!(f, "{marker} {} ({})", entry.info.name, entry.info.id)?;
        }
        if let Some(error) = state.error {
            writeln!(f, "Error: {error}")?;
        }
        Ok(())
    }
}

/// Clears the switching flag if the switch future is dropped mid-flight.
struct SwitchGuard<'a> {
    state: &'a watch::Sender<SelectorState>,
    armed: bool,
}

impl SwitchGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|s| s.switching = None);
        }
    }
}
