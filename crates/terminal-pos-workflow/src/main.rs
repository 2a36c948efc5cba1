/*
[INPUT]:  CLI arguments, YAML configuration file, TERMINAL_POS_BACKEND_URL, Ctrl-C
[OUTPUT]: Backend operations and simulated card-present payments run from the terminal
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or shutdown handling
*/

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use terminal_pos_adapter::{RegisterReaderRequest, SimulatedReader, TerminalBackendClient};
use terminal_pos_workflow::{
    LineItem, RefundRequest, WorkflowConfig, WorkflowController, WorkflowError,
};

#[derive(Parser, Debug)]
#[command(name = "terminal-pos", version, about = "Card-present point-of-sale workflow runner")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request a connection token from the backend
    Token,
    /// List backend locations
    Locations,
    /// Register a reader with a pairing code
    Register {
        #[arg(long)]
        label: String,
        #[arg(long = "code")]
        registration_code: String,
        #[arg(long)]
        location: Option<String>,
    },
    /// Ask the backend whether a reader is reachable
    Verify {
        #[arg(long = "reader")]
        reader_id: String,
    },
    /// Collect a payment on the simulated reader
    Pay {
        /// Unit amount in major units, e.g. 10.50
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long, default_value = "Producto")]
        description: String,
        #[arg(long)]
        tax: Option<Decimal>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Refund a charge on the simulated reader
    Refund {
        #[arg(long = "charge")]
        charge_id: String,
        /// Amount in minor units
        #[arg(long)]
        amount: i64,
        #[arg(long)]
        currency: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = load_config(args.config_path.as_ref())?.with_env_overrides();
    info!(backend_url = %config.backend_url, "configuration loaded");

    let backend = TerminalBackendClient::with_config(config.client_config(), &config.backend_url)
        .context("create backend client")?;

    match args.command {
        Command::Token => {
            let token = backend
                .create_connection_token()
                .await
                .context("create connection token")?;
            println!("{}", token.secret);
        }
        Command::Locations => {
            let locations = backend.list_locations().await.context("list locations")?;
            print_json(&locations)?;
        }
        Command::Register {
            label,
            registration_code,
            location,
        } => {
            let reader = backend
                .register_reader(&RegisterReaderRequest {
                    label,
                    registration_code,
                    location,
                })
                .await
                .context("register reader")?;
            print_json(&reader)?;
        }
        Command::Verify { reader_id } => {
            let reader = backend
                .verify_terminal_connection(&reader_id)
                .await
                .context("verify reader")?;
            print_json(&reader)?;
        }
        Command::Pay {
            amount,
            quantity,
            description,
            tax,
            currency,
        } => {
            let controller = simulated_controller(backend, config).await?;
            let mut cart = controller
                .new_cart()
                .with_item(LineItem::new(description, amount, quantity));
            if let Some(tax) = tax {
                cart.set_tax_amount(tax);
            }
            if let Some(currency) = currency {
                cart.set_currency(currency);
            }

            let controller = Arc::new(controller);
            let shutdown = CancellationToken::new();
            setup_signal_handler(shutdown.clone());
            let canceller = spawn_payment_canceller(Arc::clone(&controller), shutdown.clone());

            let result = controller.collect_card_payment(&cart).await;
            shutdown.cancel();
            // Joined so the last controller reference is released here.
            if let Err(err) = canceller.await {
                warn!(error = %err, "payment canceller task failed");
            }

            match result {
                Ok(outcome) => print_json(&outcome)?,
                Err(WorkflowError::PaymentCanceled) => info!("payment canceled by operator"),
                Err(err) => return Err(anyhow::Error::new(err).context("collect card payment")),
            }
        }
        Command::Refund {
            charge_id,
            amount,
            currency,
        } => {
            let controller = simulated_controller(backend, config).await?;
            let refund = controller
                .collect_refund(RefundRequest {
                    charge_id,
                    amount,
                    currency,
                })
                .await
                .context("collect refund")?;
            print_json(&refund)?;
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<WorkflowConfig> {
    let Some(path) = path else {
        return Ok(WorkflowConfig::default());
    };
    let path_str = path.to_str().context("config path must be valid utf-8")?;
    WorkflowConfig::from_file(path_str).context("load config")
}

async fn simulated_controller(
    backend: TerminalBackendClient,
    config: WorkflowConfig,
) -> Result<WorkflowController> {
    let (reader, _handle) = SimulatedReader::new();
    let controller = WorkflowController::new(Arc::new(reader), Arc::new(backend), config);
    let handle = controller
        .connect_to_simulator()
        .await
        .context("connect to simulated reader")?;
    info!(reader_id = %handle.id, "using simulated reader");
    Ok(controller)
}

/// Cancels the pending payment when `shutdown` fires while collection is cancelable
fn spawn_payment_canceller(
    controller: Arc<WorkflowController>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        shutdown.cancelled().await;
        if !controller.snapshot().cancelable_payment {
            return;
        }
        if let Err(err) = controller.cancel_pending_payment().await {
            warn!(error = %err, "failed to cancel pending payment");
        }
    })
}

fn setup_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown.cancel();
    });
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("render output")?;
    println!("{rendered}");
    Ok(())
}
