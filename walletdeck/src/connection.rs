//! Connection panel view model.
//!
//! Shows the connected account with a way to disconnect, or the available
//! connectors while disconnected.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::watch;
use tracing::warn;

use crate::details::truncate_address;
use crate::error::WalletError;
use crate::provider::{ConnectorKind, Credential, WalletProvider};

/// Connecting state shown alongside the connectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// Connector in use, while a connection attempt is in flight.
    pub connecting: Option<ConnectorKind>,
    /// Message of the last failed attempt.
    pub error: Option<String>,
}

/// Connects and disconnects the wallet's sending account, one attempt at a
/// time.
pub struct ConnectionPanel {
    wallet: Arc<dyn WalletProvider>,
    state: watch::Sender<ConnectionState>,
}

impl fmt::Debug for ConnectionPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPanel")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl ConnectionPanel {
    /// Create a panel over `wallet`.
    #[must_use]
    pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
        Self {
            wallet,
            state: watch::Sender::new(ConnectionState::default()),
        }
    }

    /// The connected account, if any.
    #[must_use]
    pub fn account(&self) -> Option<Address> {
        self.wallet.sender()
    }

    /// Connectors the wallet offers.
    #[must_use]
    pub fn connectors(&self) -> Vec<ConnectorKind> {
        self.wallet.connectors()
    }

    /// Current connecting state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Watch connecting state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Whether a connection attempt is in flight.
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.state.borrow().connecting.is_some()
    }

    /// Connect with `credential`.
    ///
    /// Fails with [`WalletError::ConnectInProgress`] while another attempt is
    /// running. A failure is kept in [`state`](Self::state) until the next
    /// attempt starts.
    pub async fn connect(&self, credential: Credential) -> Result<Address, WalletError> {
        let kind = credential.kind();
        let started = self.state.send_if_modified(|s| {
            if s.connecting.is_some() {
                return false;
            }
            s.connecting = Some(kind);
            s.error = None;
            true
        });
        if !started {
            return Err(WalletError::ConnectInProgress);
        }

        let guard = ConnectGuard {
            state: &self.state,
            armed: true,
        };
        let result = self.wallet.connect(credential).await;
        guard.disarm();

        let error = result.as_ref().err().map(ToString::to_string);
        if let Some(message) = &error {
            warn!(connector = kind.name(), error = %message, "connection failed");
        }
        self.state.send_modify(|s| {
            s.connecting = None;
            s.error = error;
        });
        result
    }

    /// Disconnect the sending account. A no-op while disconnected.
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        let result = self.wallet.disconnect().await;
        let error = result.as_ref().err().map(ToString::to_string);
        self.state.send_modify(|s| s.error = error);
        result
    }
}

impl fmt::Display for ConnectionPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        if let Some(account) = self.account() {
            writeln!(f, "Connected: {}", truncate_address(&account))?;
            writeln!(f, "[disconnect]")?;
        } else {
            for kind in self.connectors() {
                let marker = if state.connecting == Some(kind) {
                    " (connecting)"
                } else {
                    ""
                };
                writeln!(f, "[connect] {}{marker}", kind.name())?;
            }
        }
        if let Some(error) = state.error {
            writeln!(f, "Error: {error}")?;
        }
        Ok(())
    }
}

/// Clears the connecting flag if the connect future is dropped mid-flight.
struct ConnectGuard<'a> {
    state: &'a watch::Sender<ConnectionState>,
    armed: bool,
}

impl ConnectGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|s| s.connecting = None);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy::primitives::address;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::provider::testing::FakeWallet;

    const ACCOUNT: Address = address!("0x1111111111111111111111111111111111111111");

    fn panel(wallet: FakeWallet) -> (Arc<FakeWallet>, ConnectionPanel) {
        let wallet = Arc::new(wallet);
        let panel = ConnectionPanel::new(Arc::clone(&wallet) as Arc<dyn WalletProvider>);
        (wallet, panel)
    }

    fn key() -> Credential {
        Credential::PrivateKey("0x01".into())
    }

    #[tokio::test]
    async fn test_disconnected_lists_connectors() {
        let (_, panel) = panel(FakeWallet::default());
        assert_eq!(panel.account(), None);
        assert_eq!(
            panel.to_string(),
            "[connect] Private key\n[connect] Mnemonic\n"
        );
    }

    #[tokio::test]
    async fn test_connect_then_disconnect() {
        let mut wallet = FakeWallet::default();
        wallet.connect_as = Some(ACCOUNT);
        let (wallet, panel) = panel(wallet);

        assert_eq!(assert_ok!(panel.connect(key()).await), ACCOUNT);
        assert_eq!(wallet.sender(), Some(ACCOUNT));
        assert_eq!(panel.to_string(), "Connected: 0x1111...1111\n[disconnect]\n");

        assert_ok!(panel.disconnect().await);
        assert_eq!(wallet.sender(), None);
        assert!(panel.to_string().starts_with("[connect] Private key"));
    }

    #[tokio::test]
    async fn test_failed_connect_keeps_error() {
        let (wallet, panel) = panel(FakeWallet::default());
        let err = assert_err!(panel.connect(key()).await);
        assert!(matches!(err, WalletError::Derivation(_)));
        assert_eq!(wallet.sender(), None);
        assert!(panel.state().error.is_some());
        assert!(panel.to_string().contains("Error: "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_connect_at_a_time() {
        let mut wallet = FakeWallet::default();
        wallet.connect_as = Some(ACCOUNT);
        wallet.connect_delay = Duration::from_secs(1);
        let (wallet, panel) = panel(wallet);
        let panel = Arc::new(panel);

        let first = tokio::spawn({
            let panel = Arc::clone(&panel);
            async move { panel.connect(key()).await }
        });
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(panel.is_connecting());
        assert!(panel.to_string().contains("Private key (connecting)"));
        assert_eq!(
            panel.connect(key()).await,
            Err(WalletError::ConnectInProgress)
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_ok!(first.await.unwrap());
        assert!(!panel.is_connecting());
        assert_eq!(wallet.sender(), Some(ACCOUNT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_connect_clears_flag() {
        let mut wallet = FakeWallet::default();
        wallet.connect_as = Some(ACCOUNT);
        wallet.connect_delay = Duration::from_secs(1);
        let (_, panel) = panel(wallet);

        let connected = tokio::time::timeout(Duration::from_millis(10), panel.connect(key())).await;
        assert!(connected.is_err());
        assert!(!panel.is_connecting());
    }
}
