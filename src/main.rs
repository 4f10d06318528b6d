//! agentbridge CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use agentbridge::chain::{ChainTransport, EthRegistry};
use agentbridge::hub::types::{ListParams, MintRequest, ProfileUpdate};
use agentbridge::hub::{HubClient, fetch_all};
use agentbridge::identity::registration::{CrossRefContext, build_document, to_data_uri};
use agentbridge::identity::wallet::Wallet;
use agentbridge::settings::Settings;
use agentbridge::sync::{SyncOptions, run_batch};

#[derive(Parser)]
#[command(name = "agentbridge", version, about = "Sync agent identities into the onchain registry")]
struct Cli {
    /// Signing key for authenticated and onchain operations.
    #[arg(long, env = "AGENT_PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest all hub records and register each one onchain.
    Sync {
        /// Records to bypass after filtering and sorting (manual
        /// resume after a previous partial run).
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Records per ingestion page.
        #[arg(long)]
        page_size: Option<u64>,
    },

    /// List hub records.
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        framework: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u64,
    },

    /// Show one hub record.
    Get { token_id: u64 },

    /// Render the registration document for one record.
    Card { token_id: u64 },

    /// Update an agent's personality, narrative, or traits.
    Update {
        token_id: u64,
        #[arg(long)]
        personality: Option<String>,
        #[arg(long)]
        narrative: Option<String>,
        /// Comma-separated trait list; replaces the existing set.
        #[arg(long, value_delimiter = ',')]
        traits: Option<Vec<String>>,
        /// Ask the hub to also push the change to the registry contract.
        #[arg(long)]
        onchain: bool,
    },

    /// Mint a new identity record with the hub.
    Mint {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "custom")]
        framework: String,
        /// Agent address; defaults to the signing wallet's address.
        #[arg(long)]
        agent_address: Option<String>,
        #[arg(long)]
        referral_code: Option<String>,
    },

    /// Show the signing account's onchain balance.
    Balance,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load();

    match cli.command {
        Command::Sync { skip, page_size } => {
            let wallet = wallet_from(&cli.private_key)?;
            run_sync(&settings, &wallet, skip, page_size).await
        }
        Command::List {
            search,
            framework,
            page,
        } => {
            let client = hub_client(&settings)?;
            let result = client
                .list_agents(&ListParams {
                    page: Some(page),
                    search,
                    framework,
                    ..Default::default()
                })
                .await?;
            println!("page {}/{}", result.page, result.total);
            for agent in result.agents {
                println!(
                    "{:>8}  {:<24}  {:<12}  {}",
                    agent.token_id, agent.name, agent.framework, agent.agent_address
                );
            }
            Ok(())
        }
        Command::Get { token_id } => {
            let client = hub_client(&settings)?;
            let record = client.get_agent(token_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Command::Card { token_id } => {
            let client = hub_client(&settings)?;
            let record = client.get_agent(token_id).await?;
            let document = build_document(&record, &cross_ref(&settings)?);
            println!("{}", serde_json::to_string_pretty(&document)?);
            println!("\n{}", to_data_uri(&document));
            Ok(())
        }
        Command::Update {
            token_id,
            personality,
            narrative,
            traits,
            onchain,
        } => {
            let wallet = wallet_from(&cli.private_key)?;
            let client = hub_client(&settings)?;
            let record = client
                .update_profile(
                    &wallet,
                    token_id,
                    &ProfileUpdate {
                        personality,
                        narrative,
                        traits,
                        onchain: onchain.then_some(true),
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Command::Mint {
            name,
            framework,
            agent_address,
            referral_code,
        } => {
            let wallet = wallet_from(&cli.private_key)?;
            let client = hub_client(&settings)?;
            let receipt = client
                .mint(
                    &wallet,
                    &MintRequest {
                        name,
                        framework,
                        agent_address: agent_address.unwrap_or_else(|| wallet.address_hex()),
                        referral_code,
                    },
                )
                .await?;
            println!("minted token {}", receipt.token_id);
            if let Some(tx) = receipt.tx_hash {
                println!("tx: {tx}");
            }
            Ok(())
        }
        Command::Balance => {
            let wallet = wallet_from(&cli.private_key)?;
            let chain = eth_registry(&settings, &wallet)?;
            let balance = chain.balance().await?;
            println!(
                "{} ({})",
                wallet.address_hex(),
                format_eth(balance)
            );
            Ok(())
        }
    }
}

async fn run_sync(
    settings: &Settings,
    wallet: &Wallet,
    skip: usize,
    page_size: Option<u64>,
) -> anyhow::Result<()> {
    let client = hub_client(settings)?;
    let page_size = page_size.unwrap_or(settings.hub.page_size);

    // Cold-start phase: any page failure is fatal before submission
    // begins; a batch never starts from an incomplete record set.
    let records = fetch_all(&client, page_size)
        .await
        .context("ingestion failed, no batch was started")?;

    let chain = eth_registry(settings, wallet)?;
    let opts = SyncOptions {
        skip,
        settling_pause: settings.sync.settling_pause(),
        progress_interval: settings.sync.progress_interval,
    };
    let report = run_batch(records, &chain, &cross_ref(settings)?, &opts).await?;

    println!(
        "registered: {}  errors: {}  skipped (unnamed): {}",
        report.registered, report.errors, report.skipped_unnamed
    );
    if let Some(token_id) = report.last_confirmed_token_id {
        println!("last confirmed token id: {token_id} (resume with --skip)");
    }
    if let Some(balance) = report.remaining_balance {
        println!("remaining balance: {}", format_eth(balance));
    }
    if report.aborted {
        anyhow::bail!("batch aborted: signing account is out of funds");
    }
    Ok(())
}

fn wallet_from(private_key: &Option<String>) -> anyhow::Result<Wallet> {
    let key = private_key
        .as_deref()
        .context("AGENT_PRIVATE_KEY is not set")?;
    Ok(Wallet::from_private_key(key)?)
}

fn hub_client(settings: &Settings) -> anyhow::Result<HubClient> {
    let base = Url::parse(&settings.hub.base_url)
        .with_context(|| format!("invalid hub base URL: {}", settings.hub.base_url))?;
    Ok(HubClient::new(base, &settings.hub.siwa_domain)?)
}

fn eth_registry(settings: &Settings, wallet: &Wallet) -> anyhow::Result<EthRegistry> {
    let rpc_url = Url::parse(&settings.chain.rpc_url)
        .with_context(|| format!("invalid RPC URL: {}", settings.chain.rpc_url))?;
    let contract = registry_address(settings)?
        .parse()
        .context("invalid registry contract address")?;
    Ok(EthRegistry::new(
        rpc_url,
        wallet,
        contract,
        settings.chain.confirmation_timeout(),
        settings.chain.poll_interval(),
    ))
}

fn cross_ref(settings: &Settings) -> anyhow::Result<CrossRefContext> {
    Ok(CrossRefContext {
        chain_id: settings.chain.chain_id,
        registry_address: registry_address(settings)?.to_string(),
    })
}

fn registry_address(settings: &Settings) -> anyhow::Result<&str> {
    settings
        .chain
        .registry_address
        .as_deref()
        .context("chain.registry_address is not configured")
}

fn format_eth(wei: alloy::primitives::U256) -> String {
    format!("{} ETH", alloy::primitives::utils::format_ether(wei))
}
