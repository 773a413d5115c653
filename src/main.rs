//! Phantasma CLI - query a Phantasma node from the command line.
//!
//! Every command maps onto one or a few read-only RPC calls and prints the
//! decoded records as pretty JSON on stdout. Logs go to stderr and are
//! controlled with `RUST_LOG`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phantasma_link::api::{collect_pages, PhantasmaApi};
use phantasma_link::config::ClientConfig;
use phantasma_link::keys::is_valid_address;
use phantasma_link::registry::TokenRegistry;
use phantasma_link::rpc::HttpTransport;

/// Query a Phantasma node over JSON-RPC
#[derive(Parser, Debug)]
#[command(name = "phantasma", version)]
#[command(about = "Query a Phantasma node over JSON-RPC")]
struct Cli {
    /// JSON-RPC endpoint URL (overrides config file and PHANTASMA_RPC_URL)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Account name and balances of an address
    Account {
        address: String,
        /// Print balances scaled by token decimals instead of the raw record
        #[arg(long)]
        scaled: bool,
    },
    /// Address that owns a registered name
    Name { name: String },
    /// Current height of a chain
    Height {
        #[arg(default_value = "main")]
        chain: String,
    },
    /// A block, by hash or by height
    Block {
        #[arg(long, conflicts_with = "height", required_unless_present = "height")]
        hash: Option<String>,
        #[arg(long)]
        height: Option<u64>,
        #[arg(long, default_value = "main")]
        chain: String,
        /// Print the serialized block as hex
        #[arg(long)]
        raw: bool,
    },
    /// A transaction by hash
    Tx { hash: String },
    /// Every chain on the nexus
    Chains,
    /// Every deployed token
    Tokens,
    /// One token definition
    Token { symbol: String },
    /// Attributes of one non-fungible token instance
    TokenData { symbol: String, id: String },
    /// Every registered app
    Apps,
    /// Every transaction of an address (walks all pages)
    History {
        address: String,
        #[arg(long, default_value_t = 50)]
        page_size: u32,
    },
    /// One page of a token's transfers
    Transfers {
        symbol: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Active auctions for a token (walks all pages)
    Auctions {
        symbol: String,
        #[arg(long, default_value = "main")]
        chain: String,
        #[arg(long, default_value_t = 50)]
        page_size: u32,
    },
    /// Balance of one token for an address
    Balance {
        address: String,
        symbol: String,
        #[arg(long, default_value = "main")]
        chain: String,
    },
}

#[derive(Serialize)]
struct ScaledBalance<'a> {
    chain: &'a str,
    symbol: &'a str,
    amount: String,
    ids: &'a [String],
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{}", text);
    Ok(())
}

fn require_address(address: &str) -> Result<()> {
    if !is_valid_address(address) {
        bail!("{:?} is not a valid address", address);
    }
    Ok(())
}

async fn run(api: &PhantasmaApi<HttpTransport>, command: Command) -> Result<()> {
    match command {
        Command::Account { address, scaled } => {
            require_address(&address)?;
            let account = api.get_account(&address).await?;
            if !scaled {
                return print_json(&account);
            }

            let mut registry = TokenRegistry::new();
            registry.refresh(api).await?;
            let balances: Vec<ScaledBalance> = account
                .balances
                .iter()
                .map(|b| ScaledBalance {
                    chain: &b.chain,
                    symbol: &b.symbol,
                    amount: registry.display_amount(b),
                    ids: &b.ids,
                })
                .collect();
            print_json(&balances)
        }
        Command::Name { name } => print_json(&api.look_up_name(&name).await?),
        Command::Height { chain } => print_json(&api.get_block_height(&chain).await?),
        Command::Block {
            hash,
            height,
            chain,
            raw,
        } => match (hash, height) {
            (Some(hash), _) if raw => print_json(&api.get_raw_block_by_hash(&hash).await?),
            (Some(hash), _) => print_json(&api.get_block_by_hash(&hash).await?),
            (None, Some(height)) if raw => {
                print_json(&api.get_raw_block_by_height(&chain, height).await?)
            }
            (None, Some(height)) => print_json(&api.get_block_by_height(&chain, height).await?),
            (None, None) => bail!("either --hash or --height is required"),
        },
        Command::Tx { hash } => print_json(&api.get_transaction(&hash).await?),
        Command::Chains => print_json(&api.get_chains().await?),
        Command::Tokens => print_json(&api.get_tokens().await?),
        Command::Token { symbol } => print_json(&api.get_token(&symbol).await?),
        Command::TokenData { symbol, id } => print_json(&api.get_token_data(&symbol, &id).await?),
        Command::Apps => print_json(&api.get_apps().await?),
        Command::History { address, page_size } => {
            require_address(&address)?;
            let txs = api.get_all_address_transactions(&address, page_size).await?;
            tracing::info!(address = %address, transactions = txs.len(), "history collected");
            print_json(&txs)
        }
        Command::Transfers {
            symbol,
            page,
            page_size,
        } => print_json(&api.get_token_transfers(&symbol, page, page_size).await?),
        Command::Auctions {
            symbol,
            chain,
            page_size,
        } => {
            let (chain, symbol) = (chain.as_str(), symbol.as_str());
            let auctions =
                collect_pages(move |page| api.get_auctions(chain, symbol, page, page_size)).await?;
            print_json(&auctions)
        }
        Command::Balance {
            address,
            symbol,
            chain,
        } => {
            require_address(&address)?;
            print_json(&api.get_token_balance(&address, &symbol, &chain).await?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr, stdout carries the JSON output)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "phantasma=info,phantasma_link=info".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::resolve()?;
    config.apply_flags(cli.endpoint, cli.timeout);
    config.validate()?;

    tracing::debug!(endpoint = %config.endpoint, "using node");

    let transport = config
        .http_transport()
        .context("Failed to create HTTP client")?;
    let api = PhantasmaApi::new(transport);

    run(&api, cli.command).await
}
