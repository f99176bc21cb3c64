//! Payflow command-line tool.
//!
//! Inspects supported chains, runs the wallet/token resolver against flow and
//! payment files, talks to the payment API and edits local settings.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use payflow_checkout::backend::HttpBackend;
use payflow_checkout::config::ClientConfig;
use payflow_checkout::settings::{JsonFileStore, Settings};
use payflow_common::chain::{chain_by_name, ChainReference, Network, SUPPORTED_CHAINS};
use payflow_common::flow::Flow;
use payflow_common::payment::{Payment, ReferenceId};
use payflow_common::resolver::{resolve, ResolveInput};
use payflow_common::routing::{enabled_currencies, PaymentOption};
use payflow_common::services::PaymentService;
use payflow_common::token::StaticTokenRegistry;
use serde::de::DeserializeOwned;

#[derive(Parser)]
#[command(name = "payflow", about = "Payflow wallet and payment tools")]
struct Cli {
    /// Payment API base URL (overrides PAYFLOW_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Settings file (default: <config dir>/payflow/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List supported networks.
    Chains,

    /// Resolve compatible wallets and tokens for a flow.
    Resolve {
        /// Flow JSON file.
        #[arg(long)]
        flow: PathBuf,

        /// Payment JSON file fixing network, token or amount.
        #[arg(long)]
        payment: Option<PathBuf>,

        /// Routing payment options JSON file (array); implies --cross-chain.
        #[arg(long)]
        options: Option<PathBuf>,

        /// Network the wallet is on, by id, name or CAIP-2 (`eip155:8453`).
        #[arg(long, value_parser = parse_network)]
        active_network: Option<Network>,

        /// Pay cross-chain through the routing service.
        #[arg(long)]
        cross_chain: bool,
    },

    /// Payment records on the backend.
    Payment {
        #[command(subcommand)]
        command: PaymentCommand,
    },

    /// Local app settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand)]
enum PaymentCommand {
    Get { reference_id: String },
    Cancel { reference_id: String },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    /// Preferred network by id or name; "none" clears it.
    SetNetwork { network: String },
    DismissTopUp { flow_uuid: String },
}

fn parse_network(s: &str) -> Result<Network, String> {
    if let Ok(id) = s.parse::<u64>() {
        return Ok(Network(id));
    }
    if let Ok(chain) = s.parse::<ChainReference>() {
        return chain
            .network()
            .ok_or_else(|| format!("{chain} is not an EVM chain"));
    }
    chain_by_name(s)
        .map(|info| info.network)
        .ok_or_else(|| format!("unknown network {s:?}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn backend(cli: &Cli) -> Result<HttpBackend> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url.clone());
    }
    Ok(HttpBackend::new(config)?)
}

fn settings(cli: &Cli) -> Result<Settings<JsonFileStore>> {
    let store = match &cli.settings {
        Some(path) => JsonFileStore::new(path),
        None => JsonFileStore::at_default_path()?,
    };
    Ok(Settings::init(store)?)
}

fn run_resolve(
    flow: &Path,
    payment: Option<&Path>,
    options: Option<&Path>,
    active_network: Option<Network>,
    cross_chain: bool,
) -> Result<()> {
    let flow: Flow = read_json(flow)?;
    let payment: Option<Payment> = payment.map(read_json).transpose()?;
    let options: Option<Vec<PaymentOption>> = options.map(read_json).transpose()?;
    let allowed = options.as_deref().map(enabled_currencies);

    let input = ResolveInput {
        payment: payment.as_ref(),
        cross_chain: cross_chain || allowed.is_some(),
        allowed_currencies: allowed.as_deref(),
        active_network,
        ..ResolveInput::new(&flow)
    };
    let resolution = resolve(&input, &StaticTokenRegistry);
    if resolution.is_empty() {
        tracing::warn!(flow = %flow.uuid, "no compatible wallet");
    }
    print_json(&resolution)
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Chains => {
            for chain in SUPPORTED_CHAINS {
                println!(
                    "{:>10}  {:<14} {:<6} {}{}",
                    chain.network.id(),
                    chain.name,
                    chain.native_symbol,
                    chain.explorer_url,
                    if chain.testnet { "  (testnet)" } else { "" }
                );
            }
        }
        Command::Resolve {
            flow,
            payment,
            options,
            active_network,
            cross_chain,
        } => run_resolve(
            flow,
            payment.as_deref(),
            options.as_deref(),
            *active_network,
            *cross_chain,
        )?,
        Command::Payment { command } => {
            let backend = backend(&cli)?;
            match command {
                PaymentCommand::Get { reference_id } => {
                    let payment = backend
                        .get_payment(&ReferenceId(reference_id.clone()))
                        .await?;
                    print_json(&payment)?;
                }
                PaymentCommand::Cancel { reference_id } => {
                    let reference_id = ReferenceId(reference_id.clone());
                    let payment = backend.get_payment(&reference_id).await?;
                    if !payment.status.is_open() {
                        bail!("payment {reference_id} is {:?}, not open", payment.status);
                    }
                    backend.cancel_payment(&reference_id).await?;
                    tracing::info!(reference_id = %reference_id, "payment cancelled");
                }
            }
        }
        Command::Settings { command } => {
            let settings = settings(&cli)?;
            let current = match command {
                SettingsCommand::Show => settings.get(),
                SettingsCommand::SetNetwork { network } => {
                    let network = match network.as_str() {
                        "none" => None,
                        other => Some(parse_network(other).map_err(anyhow::Error::msg)?),
                    };
                    settings.set_preferred_network(network)?
                }
                SettingsCommand::DismissTopUp { flow_uuid } => {
                    settings.dismiss_top_up(flow_uuid)?
                }
            };
            print_json(&current)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}
