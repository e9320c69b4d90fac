//! Interactive dashboard REPL.
//!
//! Each line is one command. Form edits return immediately; the form
//! settles in the background, so `status` right after `to` shows the
//! recipient still resolving.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use walletdeck::address::AddressResolver;
use walletdeck::config::DeckConfig;
use walletdeck::connection::ConnectionPanel;
use walletdeck::debounce::FieldPhase;
use walletdeck::details::{WalletDetails, truncate_address};
use walletdeck::form::{FormSnapshot, SubmissionStatus, TransactionForm};
use walletdeck::network::NetworkSelector;
use walletdeck::provider::{ChainId, Credential, WalletProvider};
use walletdeck::units::format_units;
use walletdeck::{ChainConfig, FormError};

/// A parsed dashboard command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Edit the recipient input.
    To(String),
    /// Edit the amount input.
    Amount(String),
    /// Print the form.
    Status,
    /// Wait for the form to settle, then print it.
    Wait,
    /// Submit the form.
    Submit,
    /// Show the connected wallet.
    Details,
    /// Look up an address or ENS name.
    Search(String),
    /// List networks.
    Networks,
    /// Switch network.
    Switch(ChainId),
    /// Show the connection panel.
    Connection,
    /// Connect a sending account.
    Connect(Credential),
    /// Disconnect the sending account.
    Disconnect,
    /// Print the command list.
    Help,
    /// Leave the dashboard.
    Exit,
}

impl Command {
    /// Parse one input line. Unknown commands give an error message.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match word {
            "to" => Ok(Self::To(rest.to_string())),
            "amount" => Ok(Self::Amount(rest.to_string())),
            "status" => Ok(Self::Status),
            "wait" => Ok(Self::Wait),
            "submit" | "send" => Ok(Self::Submit),
            "details" | "me" => Ok(Self::Details),
            "search" => Ok(Self::Search(rest.to_string())),
            "networks" => Ok(Self::Networks),
            "switch" => rest
                .parse()
                .map(Self::Switch)
                .map_err(|_| format!("invalid chain id: {rest:?}")),
            "connect" => Self::parse_credential(rest),
            "disconnect" => Ok(Self::Disconnect),
            "help" | "?" => Ok(Self::Help),
            "exit" | "quit" => Ok(Self::Exit),
            other => Err(format!("unknown command: {other} (try 'help')")),
        }
    }

    fn parse_credential(rest: &str) -> Result<Self, String> {
        let (kind, secret) = rest.split_once(' ').unwrap_or((rest, ""));
        let secret = secret.trim();
        match kind {
            "" => Ok(Self::Connection),
            "key" if !secret.is_empty() => Ok(Self::Connect(Credential::PrivateKey(
                secret.to_string(),
            ))),
            "mnemonic" if !secret.is_empty() => {
                let words: Vec<&str> = secret.split_whitespace().collect();
                Ok(Self::Connect(Credential::Mnemonic {
                    phrase: words.join(" "),
                    passphrase: None,
                    index: 0,
                }))
            }
            "key" | "mnemonic" => Err(format!("usage: connect {kind} <secret>")),
            other => Err(format!("unknown connector: {other} (use 'key' or 'mnemonic')")),
        }
    }
}

const HELP: &str = "\
Commands:
  to <address or ENS>   set the recipient
  amount <value>        set the amount
  status                show the send form
  wait                  wait for inputs to settle, then show the form
  submit                send the transaction
  details               show the connected wallet
  search <input>        look up an address or ENS name
  networks              list networks
  switch <chain id>     switch network
  connect               show the connection panel
  connect key <hex>     connect with a private key
  connect mnemonic <words>
                        connect with a BIP39 mnemonic (index 0)
  disconnect            disconnect the sending account
  exit                  quit";

/// Text view of the send form.
#[derive(Debug, Clone, Copy)]
pub struct FormView<'a> {
    /// The form to show.
    pub snapshot: &'a FormSnapshot,
    /// Chain whose symbol and decimals label the amount.
    pub chain: &'a ChainConfig,
}

impl fmt::Display for FormView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { snapshot, chain } = *self;
        let to = match (snapshot.to_phase, snapshot.state.resolved_address) {
            (FieldPhase::Empty, _) => String::new(),
            (phase, _) if phase.is_pending() || snapshot.state.to_pending => "resolving...".into(),
            (_, Some(address)) => format!("-> {}", truncate_address(&address)),
            (_, None) => "invalid address".into(),
        };
        let amount = match (snapshot.amount_phase, snapshot.state.base_amount) {
            (FieldPhase::Empty, _) => String::new(),
            (phase, _) if phase.is_pending() || snapshot.state.amount_pending => "...".into(),
            (_, Some(value)) => format!("= {value} base units"),
            (_, None) => "invalid amount".into(),
        };

        writeln!(f, "To:     {:<44} {to}", snapshot.to_input)?;
        writeln!(
            f,
            "Amount: {:<44} {amount}",
            format!("{} {}", snapshot.amount_input, chain.symbol)
        )?;
        if let Some(request) = snapshot.request {
            writeln!(
                f,
                "Send {} {} to {}",
                format_units(request.value, chain.decimals),
                chain.symbol,
                request.to
            )?;
        }
        match &snapshot.state.submission {
            SubmissionStatus::Pending => writeln!(f, "Sending...")?,
            _ if snapshot.can_submit => writeln!(f, "[submit] ready")?,
            _ => writeln!(f, "[submit] disabled")?,
        }
        match &snapshot.state.submission {
            SubmissionStatus::Sent(hash) => writeln!(f, "Transaction sent: {hash}"),
            SubmissionStatus::Failed(message) => writeln!(f, "Error: {message}"),
            SubmissionStatus::Idle | SubmissionStatus::Pending => Ok(()),
        }
    }
}

/// Render the send form as text.
#[must_use]
pub fn render_form(snapshot: &FormSnapshot, chain: &ChainConfig) -> String {
    FormView { snapshot, chain }.to_string()
}

/// The interactive dashboard.
pub struct Dashboard {
    wallet: Arc<dyn WalletProvider>,
    config: DeckConfig,
    resolver: AddressResolver,
    networks: NetworkSelector,
    connection: ConnectionPanel,
    form: TransactionForm,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("networks", &self.networks)
            .field("connection", &self.connection)
            .field("form", &self.form)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Create a dashboard over `wallet`.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(wallet: Arc<dyn WalletProvider>, config: DeckConfig) -> Self {
        let resolver = AddressResolver::new(config.ens_suffix.clone(), config.checksum);
        let networks = NetworkSelector::new(Arc::clone(&wallet));
        let connection = ConnectionPanel::new(Arc::clone(&wallet));
        let chain = wallet.active_chain().and_then(|c| config.chain(c.id));
        let form = TransactionForm::new(Arc::clone(&wallet), &config.form_config(chain));
        Self {
            wallet,
            config,
            resolver,
            networks,
            connection,
            form,
        }
    }

    fn active_chain(&self) -> ChainConfig {
        self.wallet
            .active_chain()
            .and_then(|c| self.config.chain(c.id).cloned())
            .or_else(|| self.config.initial_chain().cloned())
            .unwrap_or_else(|| ChainConfig::new(0, "unknown", "", "ETH"))
    }

    fn print_form(&self) {
        let snapshot = self.form.snapshot();
        let chain = self.active_chain();
        print!("{}", FormView {
            snapshot: &snapshot,
            chain: &chain,
        });
    }

    /// Run one command. Returns `false` when the dashboard should exit.
    pub async fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::To(input) => self.form.set_to(input),
            Command::Amount(input) => self.form.set_amount(input),
            Command::Status => self.print_form(),
            Command::Wait => {
                self.form.settled().await;
                self.print_form();
            }
            Command::Submit => {
                self.form.settled().await;
                match self.form.submit().await {
                    Ok(hash) => println!("Transaction sent: {hash}"),
                    Err(FormError::NotReady) => self.print_form(),
                    Err(e) => println!("Error: {e}"),
                }
            }
            Command::Details => {
                println!("{}", WalletDetails::connected(self.wallet.as_ref()).await);
            }
            Command::Search(input) => println!(
                "{}",
                WalletDetails::search(self.wallet.as_ref(), &self.resolver, &input).await
            ),
            Command::Networks => print!("{}", self.networks),
            Command::Switch(id) => {
                if self.networks.switch(id).await.is_ok() {
                    self.form.set_decimals(self.active_chain().decimals);
                }
                print!("{}", self.networks);
            }
            Command::Connection => print!("{}", self.connection),
            Command::Connect(credential) => {
                // Failures are shown by the panel.
                let _ = self.connection.connect(credential).await;
                print!("{}", self.connection);
            }
            Command::Disconnect => {
                let _ = self.connection.disconnect().await;
                print!("{}", self.connection);
            }
            Command::Help => println!("{HELP}"),
            Command::Exit => return false,
        }
        true
    }

    /// Run the interactive REPL loop until `exit` or end of input.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = io::stdout();

        println!("walletdeck dashboard (type 'help' for commands, 'exit' to quit)");
        println!("{}", WalletDetails::connected(self.wallet.as_ref()).await);
        println!();

        loop {
            print!("> ");
            stdout.flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Ok(command) => {
                    if !self.execute(command).await {
                        break;
                    }
                }
                Err(message) => println!("{message}"),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use alloy::primitives::{Address, U256, address};
    use async_trait::async_trait;
    use walletdeck::provider::{
        Balance, ChainInfo, EnsLookup, TransactionRequest, TxHash,
    };
    use walletdeck::{FormState, WalletError};

    use super::*;

    const SENDER: Address = address!("0x1111111111111111111111111111111111111111");
    const VITALIK: Address = address!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045");

    /// Wallet with a fixed chain list and a connectable account.
    #[derive(Debug, Default)]
    struct TestWallet {
        sender: Mutex<Option<Address>>,
        active: Mutex<ChainId>,
    }

    #[async_trait]
    impl EnsLookup for TestWallet {
        async fn resolve_name(&self, _name: &str) -> Result<Option<Address>, WalletError> {
            Ok(None)
        }

        async fn lookup_address(&self, _address: Address) -> Result<Option<String>, WalletError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl WalletProvider for TestWallet {
        fn sender(&self) -> Option<Address> {
            *self.sender.lock().unwrap()
        }

        async fn connect(&self, _credential: Credential) -> Result<Address, WalletError> {
            *self.sender.lock().unwrap() = Some(SENDER);
            Ok(SENDER)
        }

        async fn disconnect(&self) -> Result<(), WalletError> {
            *self.sender.lock().unwrap() = None;
            Ok(())
        }

        async fn send_transaction(&self, _request: TransactionRequest) -> Result<TxHash, WalletError> {
            Err(WalletError::transaction("not supported"))
        }

        async fn balance(&self, _address: Address) -> Result<Balance, WalletError> {
            Err(WalletError::provider("not supported"))
        }

        fn chains(&self) -> Vec<ChainInfo> {
            config().chains.iter().map(ChainConfig::info).collect()
        }

        fn active_chain(&self) -> Option<ChainInfo> {
            let id = *self.active.lock().unwrap();
            config().chain(id).map(ChainConfig::info)
        }

        async fn switch_chain(&self, id: ChainId) -> Result<(), WalletError> {
            config().chain(id).ok_or(WalletError::UnknownChain(id))?;
            *self.active.lock().unwrap() = id;
            Ok(())
        }
    }

    fn config() -> DeckConfig {
        let mut stable = ChainConfig::new(100, "Stable", "http://localhost:8546", "USD");
        stable.decimals = 6;
        DeckConfig {
            debounce_ms: 0,
            chains: vec![
                ChainConfig::new(1, "Ethereum", "http://localhost:8545", "ETH"),
                stable,
            ],
            ..DeckConfig::default()
        }
    }

    fn dashboard() -> Dashboard {
        let wallet = TestWallet {
            active: Mutex::new(1),
            ..TestWallet::default()
        };
        Dashboard::new(Arc::new(wallet), config())
    }

    fn empty_snapshot() -> FormSnapshot {
        FormSnapshot {
            to_input: String::new(),
            amount_input: String::new(),
            to_phase: FieldPhase::Empty,
            amount_phase: FieldPhase::Empty,
            state: FormState::default(),
            request: None,
            can_submit: false,
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("to vitalik.eth"),
            Ok(Command::To("vitalik.eth".into()))
        );
        assert_eq!(
            Command::parse("  amount   0.05 "),
            Ok(Command::Amount("0.05".into()))
        );
        assert_eq!(Command::parse("to"), Ok(Command::To(String::new())));
        assert_eq!(Command::parse("switch 137"), Ok(Command::Switch(137)));
        assert_eq!(Command::parse("quit"), Ok(Command::Exit));
        assert!(Command::parse("switch polygon").is_err());
        assert!(Command::parse("launch").is_err());
    }

    #[test]
    fn test_parse_connection_commands() {
        assert_eq!(Command::parse("connect"), Ok(Command::Connection));
        assert_eq!(Command::parse("disconnect"), Ok(Command::Disconnect));
        assert_eq!(
            Command::parse("connect key 0xabc"),
            Ok(Command::Connect(Credential::PrivateKey("0xabc".into())))
        );
        assert_eq!(
            Command::parse("connect mnemonic  test  test junk"),
            Ok(Command::Connect(Credential::Mnemonic {
                phrase: "test test junk".into(),
                passphrase: None,
                index: 0,
            }))
        );
        assert!(Command::parse("connect key").is_err());
        assert!(Command::parse("connect ledger").is_err());
    }

    #[test]
    fn test_render_empty_form() {
        let chain = ChainConfig::new(1, "Ethereum", "http://localhost:8545", "ETH");
        let text = render_form(&empty_snapshot(), &chain);
        assert!(text.contains("[submit] disabled"));
        assert!(!text.contains("Send"));
    }

    #[test]
    fn test_render_ready_form() {
        let mut snapshot = empty_snapshot();
        snapshot.to_input = "vitalik.eth".into();
        snapshot.amount_input = "0.05".into();
        snapshot.to_phase = FieldPhase::Settled;
        snapshot.amount_phase = FieldPhase::Settled;
        snapshot.state.resolved_address = Some(VITALIK);
        snapshot.state.base_amount = Some(U256::from(50_000_000_000_000_000_u64));
        snapshot.state.submission = SubmissionStatus::Failed("insufficient funds".into());
        snapshot.request = snapshot.state.transaction_request();
        snapshot.can_submit = true;

        let chain = ChainConfig::new(1, "Ethereum", "http://localhost:8545", "ETH");
        let text = FormView {
            snapshot: &snapshot,
            chain: &chain,
        }
        .to_string();
        assert!(text.contains("-> 0xd8dA...6045"));
        assert!(text.contains("= 50000000000000000 base units"));
        assert!(text.contains("Send 0.05 ETH to 0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"));
        assert!(text.contains("[submit] ready"));
        assert!(text.ends_with("Error: insufficient funds\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_keeps_form_inputs() {
        let mut dashboard = dashboard();
        assert!(dashboard.execute(Command::To(VITALIK.to_string())).await);
        assert!(dashboard.execute(Command::Amount("1.5".into())).await);
        dashboard.form.settled().await;
        assert_eq!(
            dashboard.form.state().base_amount,
            Some(U256::from(15 * 10_u64.pow(17)))
        );

        assert!(dashboard.execute(Command::Switch(100)).await);
        let state = tokio::time::timeout(Duration::from_secs(1), dashboard.form.settled())
            .await
            .unwrap();
        let snapshot = dashboard.form.snapshot();
        assert_eq!(snapshot.to_input, VITALIK.to_string());
        assert_eq!(snapshot.amount_input, "1.5");
        assert_eq!(state.resolved_address, Some(VITALIK));
        assert_eq!(state.base_amount, Some(U256::from(1_500_000_u64)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_and_disconnect_update_views() {
        let mut dashboard = dashboard();
        assert!(dashboard.execute(Command::To(VITALIK.to_string())).await);
        assert!(dashboard.execute(Command::Amount("1".into())).await);
        dashboard.form.settled().await;
        assert!(!dashboard.form.can_submit());
        assert!(dashboard.connection.to_string().contains("[connect] Private key"));

        let credential = Credential::PrivateKey("0x01".into());
        assert!(dashboard.execute(Command::Connect(credential)).await);
        assert_eq!(dashboard.wallet.sender(), Some(SENDER));
        assert!(dashboard.connection.to_string().starts_with("Connected: 0x1111...1111"));
        assert!(dashboard.form.can_submit());

        assert!(dashboard.execute(Command::Disconnect).await);
        assert_eq!(dashboard.wallet.sender(), None);
        assert!(!dashboard.form.can_submit());
    }
}
