//! walletdeck - wallet dashboard in the terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use walletdeck::config::CONFIG_ENV;
use walletdeck::provider::{ChainId, WalletProvider};
use walletdeck::{
    AddressResolver, DeckConfig, EvmWallet, NetworkSelector, TransactionForm, WalletDetails,
};
use walletdeck_cli::{Dashboard, render_form};

/// walletdeck - wallet details, ENS search and transfers
#[derive(Parser, Debug)]
#[command(name = "walletdeck")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a JSON config file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Hex private key of the sending account
    #[arg(long, env = "WALLETDECK_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// BIP39 mnemonic of the sending account
    #[arg(
        long,
        env = "WALLETDECK_MNEMONIC",
        hide_env_values = true,
        conflicts_with = "private_key"
    )]
    mnemonic: Option<String>,

    /// HD derivation index used with --mnemonic
    #[arg(long, default_value_t = 0)]
    index: u32,

    /// Chain ID to start on (config default if not specified)
    #[arg(long)]
    chain: Option<ChainId>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show the connected wallet's ENS name, address and balance
    Details,
    /// Look up an address or ENS name
    Search {
        /// 0x address or ENS name
        input: String,
    },
    /// List configured networks
    Networks,
    /// Switch network and list networks
    Switch {
        /// Chain ID
        id: ChainId,
    },
    /// Send native tokens
    Send {
        /// Recipient address or ENS name
        #[arg(long)]
        to: String,
        /// Amount in display units, e.g. 0.05
        #[arg(long)]
        amount: String,
    },
    /// Interactive dashboard (default)
    Dashboard,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("walletdeck=debug,walletdeck_cli=debug")
    } else {
        EnvFilter::new("walletdeck=warn,walletdeck_cli=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn connect(args: &Args, config: &DeckConfig) -> anyhow::Result<EvmWallet> {
    let mut builder = EvmWallet::builder().config(config);
    if let Some(id) = args.chain {
        builder = builder.chain_id(id);
    }
    if let Some(key) = &args.private_key {
        builder = builder.private_key(key);
    }
    if let Some(mnemonic) = &args.mnemonic {
        builder = builder.mnemonic(mnemonic).index(args.index);
    }
    builder.build().await.context("failed to connect wallet")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = DeckConfig::load_or_default(args.config.as_deref())
        .await
        .context("failed to load config")?;
    let wallet: Arc<dyn WalletProvider> = Arc::new(connect(&args, &config).await?);

    match args.command.unwrap_or(Cmd::Dashboard) {
        Cmd::Details => println!("{}", WalletDetails::connected(wallet.as_ref()).await),
        Cmd::Search { input } => {
            let resolver = AddressResolver::new(config.ens_suffix.clone(), config.checksum);
            println!(
                "{}",
                WalletDetails::search(wallet.as_ref(), &resolver, &input).await
            );
        }
        Cmd::Networks => print!("{}", NetworkSelector::new(wallet)),
        Cmd::Switch { id } => {
            let networks = NetworkSelector::new(wallet);
            let switched = networks.switch(id).await;
            print!("{networks}");
            switched?;
        }
        Cmd::Send { to, amount } => {
            let chain = wallet
                .active_chain()
                .and_then(|c| config.chain(c.id).cloned())
                .context("no active chain")?;
            // One-shot input has nothing to debounce.
            let form_config = config.form_config(Some(&chain)).debounce(Duration::ZERO);
            let form = TransactionForm::new(Arc::clone(&wallet), &form_config);
            form.set_to(to);
            form.set_amount(amount);
            form.settled().await;

            let result = form.submit().await;
            print!("{}", render_form(&form.snapshot(), &chain));
            result?;
        }
        Cmd::Dashboard => Dashboard::new(wallet, config).run().await?,
    }

    Ok(())
}
