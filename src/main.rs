use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use conjure::config::{self, Config};
use conjure::domain::ChainRegistry;
use conjure::donation::{units, DonationPlanner, DEFAULT_RECIPIENT};
use conjure::engine::{InvocationEngine, InvocationResult};
use conjure::infrastructure::artifacts::ArtifactSet;
use conjure::infrastructure::wallet::RpcWallet;
use conjure::negotiate::ChainNegotiator;
use conjure::session::WalletSession;
use conjure::store::ContractRegistry;

#[derive(Debug, Parser)]
#[command(
    name = "conjure",
    version,
    about = "Deploy contract artifacts and invoke functions on them through a connected wallet"
)]
struct Args {
    /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
    #[arg(long)]
    rpc: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the chains this application supports
    Chains,

    /// List deployable artifacts
    Artifacts {
        /// Artifact directory (defaults to config, then ./artifacts)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Deploy an artifact by name
    Deploy {
        name: String,

        /// Constructor argument as name=value (repeatable)
        #[arg(long = "arg", value_parser = parse_key_val)]
        args: Vec<(String, String)>,

        /// Artifact directory (defaults to config, then ./artifacts)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List contracts deployed from the connected account
    List {
        /// Include every chain, not only the wallet's active one
        #[arg(long)]
        all_chains: bool,
    },

    /// Remove a recorded contract
    Remove {
        address: String,

        /// Chain id (defaults to the wallet's active chain)
        #[arg(long)]
        chain: Option<u64>,
    },

    /// Invoke a function on a recorded contract
    Call {
        address: String,
        function: String,

        /// Function argument as name=value (repeatable)
        #[arg(long = "arg", value_parser = parse_key_val)]
        args: Vec<(String, String)>,
    },

    /// Switch the wallet to another supported chain
    Switch { chain_id: u64 },

    /// Donate native currency, or an ERC-20 with --token
    Donate {
        /// Token contract address (omit for native currency)
        #[arg(long)]
        token: Option<String>,

        /// Decimal amount (omit to donate everything)
        #[arg(long)]
        amount: Option<String>,

        /// Recipient override
        #[arg(long)]
        to: Option<String>,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn to_map(entries: Vec<(String, String)>) -> BTreeMap<String, String> {
    entries.into_iter().collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = config::load();
    let chains = chain_registry(&config);

    match args.command {
        Command::Chains => {
            for chain in chains.iter() {
                println!(
                    "{:>10}  {:<18} {:<6} {}",
                    chain.id, chain.name, chain.symbol, chain.rpc_url
                );
            }
        }

        Command::Artifacts { dir } => {
            let set = load_artifacts(&config, dir);
            if set.is_empty() {
                println!("No deployable artifacts found");
            }
            for artifact in set.iter() {
                let constructor: Vec<String> =
                    conjure::domain::constructor_inputs(&artifact.abi)
                        .iter()
                        .map(|param| format!("{}: {}", param.name, param.selector_type()))
                        .collect();
                println!("{} ({})", artifact.name, constructor.join(", "));
            }
            for error in &set.errors {
                eprintln!("warning: {error}");
            }
        }

        Command::Deploy { name, args: raw, dir } => {
            let set = load_artifacts(&config, dir);
            let Some(artifact) = set.get(&name) else {
                bail!("artifact '{name}' not found");
            };

            let mut session = connect(&args.rpc, &config).await?;
            let signer = session.signer()?;
            let mut registry = open_registry(&config)?;

            let engine = InvocationEngine::new();
            let outcome = engine
                .deploy(&signer, &mut registry, artifact, &to_map(raw))
                .await?;
            println!("Deployed {} at {}", artifact.name, outcome.address);
            println!("  tx: {}", outcome.tx_hash);
            session.disconnect();
        }

        Command::List { all_chains } => {
            let mut session = connect(&args.rpc, &config).await?;
            let state = session.state().context("not connected")?;
            let registry = open_registry(&config)?;

            let scope = if all_chains { None } else { Some(state.chain_id) };
            let records = registry.list(state.account, scope);
            if records.is_empty() {
                println!("No contracts recorded");
            }
            for record in records {
                let when = chrono::DateTime::from_timestamp(record.deployed_at, 0)
                    .map(|when| when.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {:<20} {:<16} {}",
                    record.address,
                    record.name,
                    chains.display_name(record.chain_id),
                    when
                );
            }
            session.disconnect();
        }

        Command::Remove { address, chain } => {
            let mut session = connect(&args.rpc, &config).await?;
            let state = session.state().context("not connected")?;
            let mut registry = open_registry(&config)?;

            let address = parse_address(&address)?;
            let chain_id = chain.unwrap_or(state.chain_id);
            if registry.remove(state.account, chain_id, address)? {
                println!("Removed {address}");
            } else {
                println!("No matching record for {address}");
            }
            session.disconnect();
        }

        Command::Call {
            address,
            function,
            args: raw,
        } => {
            let mut session = connect(&args.rpc, &config).await?;
            let state = session.state().context("not connected")?;
            let signer = session.signer()?;
            let registry = open_registry(&config)?;

            let address = parse_address(&address)?;
            let Some(record) = registry.find(state.account, state.chain_id, address) else {
                bail!(
                    "contract {address} is not recorded for this account on {}",
                    chains.display_name(state.chain_id)
                );
            };

            let engine = InvocationEngine::new();
            match engine.invoke(&signer, record, &function, &to_map(raw)).await? {
                InvocationResult::Read { values } => {
                    if values.is_empty() {
                        println!("ok (no return values)");
                    }
                    for value in values {
                        println!("{} ({}) = {}", value.name, value.kind, value.value);
                    }
                }
                InvocationResult::Write { tx_hash } => {
                    println!("Confirmed: {tx_hash}");
                }
            }
            session.disconnect();
        }

        Command::Switch { chain_id } => {
            let mut session = connect(&args.rpc, &config).await?;
            let current = session.chain_id()?;

            let provider = Arc::clone(session.provider());
            let mut negotiator = ChainNegotiator::new(provider.as_ref(), &chains);
            negotiator.negotiate(current, chain_id).await?;
            println!("Wallet is on {}", chains.display_name(chain_id));

            // The switch invalidates cached session state; rebuild it.
            session.disconnect();
            let state = session.connect().await?;
            println!("Session rebuilt on chain {}", state.chain_id);
        }

        Command::Donate { token, amount, to } => {
            let mut session = connect(&args.rpc, &config).await?;
            let state = session.state().context("not connected")?;
            let signer = session.signer()?;

            let recipient = donation_recipient(&config, to)?;
            let provider = Arc::clone(session.provider());
            let planner = DonationPlanner::new(provider.as_ref(), recipient);

            match token {
                Some(token) => {
                    let token = parse_address(&token)?;
                    let info = planner.token_info(token, state.account).await?;
                    println!(
                        "{}: balance {}",
                        info.symbol,
                        units::format_amount(info.balance, info.decimals)
                    );

                    let requested = amount
                        .map(|amount| units::parse_amount(&amount, info.decimals))
                        .transpose()?;
                    let plan = planner.plan_token(token, state.account, requested).await?;
                    let tx_hash = planner.execute_token(&signer, &plan).await?;
                    println!(
                        "Donated {} {} to {} ({})",
                        units::format_amount(plan.amount, info.decimals),
                        info.symbol,
                        plan.recipient,
                        tx_hash
                    );
                }
                None => {
                    let symbol = chains
                        .get(state.chain_id)
                        .map(|chain| chain.symbol.clone())
                        .unwrap_or_else(|| "ETH".to_string());

                    let requested = amount
                        .map(|amount| units::parse_amount(&amount, 18))
                        .transpose()?;
                    let plan = planner.plan_native(state.account, requested).await?;
                    println!(
                        "Sending {} {} (gas reserve {})",
                        units::format_amount(plan.amount, 18),
                        symbol,
                        units::format_amount(plan.buffered_cost, 18)
                    );

                    let tx_hash = planner.execute_native(&signer, &plan).await?;
                    println!(
                        "Donated {} {} to {} ({})",
                        units::format_amount(plan.amount, 18),
                        symbol,
                        plan.recipient,
                        tx_hash
                    );
                }
            }
            session.disconnect();
        }
    }

    Ok(())
}

fn chain_registry(config: &Config) -> ChainRegistry {
    let mut chains = ChainRegistry::builtin();
    for chain in &config.chains {
        chains.insert(chain.clone());
    }
    chains
}

async fn connect(rpc: &Option<String>, config: &Config) -> Result<WalletSession> {
    let endpoint = rpc
        .clone()
        .or_else(|| config.rpc.clone())
        .unwrap_or_else(|| "http://127.0.0.1:8545".to_string());

    let wallet = RpcWallet::new(&endpoint)?;
    let mut session = WalletSession::new(Arc::new(wallet));
    session
        .connect()
        .await
        .with_context(|| format!("connecting wallet at {endpoint}"))?;
    Ok(session)
}

fn open_registry(config: &Config) -> Result<ContractRegistry> {
    let path = config::registry_path(config).context("cannot determine registry path")?;
    Ok(ContractRegistry::open(path))
}

fn load_artifacts(config: &Config, dir: Option<PathBuf>) -> ArtifactSet {
    let root = dir
        .or_else(|| config.artifacts_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("artifacts"));
    ArtifactSet::load_dir(root)
}

fn donation_recipient(config: &Config, to: Option<String>) -> Result<Address> {
    if let Some(to) = to {
        return parse_address(&to);
    }
    if let Some(recipient) = &config.donation_recipient {
        return parse_address(recipient);
    }
    Ok(DEFAULT_RECIPIENT)
}

fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value.trim()).with_context(|| format!("invalid address '{value}'"))
}
