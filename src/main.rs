use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use payledger::application::settlement::SettlementEngine;
use payledger::config::{self, GatewayConfig};
use payledger::domain::money::Amount;
use payledger::domain::order::CaptureRequest;
use payledger::domain::ports::{LedgerStoreBox, OrderRegistryBox, PaymentGatewayBox};
use payledger::domain::signature::SignatureVerifier;
use payledger::infrastructure::gateway::direct::DirectCaptureGateway;
use payledger::infrastructure::gateway::hosted::HostedCheckoutGateway;
use payledger::infrastructure::gateway::mock::MockGateway;
use payledger::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryOrderRegistry};
use payledger::interfaces::csv::report_writer::ReportWriter;
use payledger::interfaces::json::action_reader::{ActionReader, ActionRequest};
use payledger::interfaces::json::response::ActionResponse;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GatewayKind {
    /// Hosted checkout with signed callbacks
    Hosted,
    /// Server-to-server capture, no callback signature
    Direct,
    /// Deterministic in-process gateway (signed callbacks)
    Mock,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input action requests, one JSON object per line
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Payment gateway to settle against
    #[arg(long, value_enum, default_value = "hosted")]
    gateway: GatewayKind,

    /// Write the CSV reconciliation report of all orders to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Gateway key/client identifier
    #[arg(long, env = config::KEY_ID_VAR, default_value = "")]
    key_id: String,

    /// Gateway key/client secret; also keys callback signature verification
    #[arg(long, env = config::KEY_SECRET_VAR, default_value = "", hide_env_values = true)]
    key_secret: String,

    /// Gateway API base URL
    #[arg(long, env = config::GATEWAY_URL_VAR)]
    gateway_url: Option<String>,

    /// Settlement currency code
    #[arg(long, env = config::CURRENCY_VAR, default_value = "USD")]
    currency: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = GatewayConfig::new(
        cli.key_id.clone(),
        cli.key_secret.clone(),
        cli.gateway_url.clone(),
        cli.currency.clone(),
    );

    let gateway: PaymentGatewayBox = match cli.gateway {
        GatewayKind::Hosted => Box::new(HostedCheckoutGateway::new(&config).into_diagnostic()?),
        GatewayKind::Direct => Box::new(DirectCaptureGateway::new(&config).into_diagnostic()?),
        GatewayKind::Mock => Box::new(MockGateway::hosted()),
    };
    let verifier = SignatureVerifier::new(config.key_secret.as_str()).into_diagnostic()?;

    let (orders, ledger) = match &cli.db_path {
        Some(path) => open_persistent(path).into_diagnostic()?,
        None => (
            Box::new(InMemoryOrderRegistry::new()) as OrderRegistryBox,
            Box::new(InMemoryLedgerStore::new()) as LedgerStoreBox,
        ),
    };

    let engine = SettlementEngine::new(gateway, orders, ledger, verifier);

    // Process the action stream
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = ActionReader::new(BufReader::new(file));
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for action in reader.actions() {
        match action {
            Ok(action) => {
                let response = run_action(&engine, action).await;
                serde_json::to_writer(&mut out, &response).into_diagnostic()?;
                writeln!(out).into_diagnostic()?;
            }
            Err(e) => {
                eprintln!("Error reading action: {e}");
            }
        }
    }

    if let Some(report_path) = &cli.report {
        let file = File::create(report_path).into_diagnostic()?;
        let mut writer = ReportWriter::new(file);
        writer
            .write_orders(engine.all_orders().await.into_diagnostic()?)
            .into_diagnostic()?;
    }

    Ok(())
}

async fn run_action(engine: &SettlementEngine, action: ActionRequest) -> ActionResponse {
    match action {
        ActionRequest::CreateOrder { amount, user_id } => {
            let amount = match Amount::from_decimal(amount) {
                Ok(amount) => amount,
                Err(e) => return ActionResponse::error(&e),
            };
            match engine.create_order(amount, &user_id).await {
                Ok(order) => ActionResponse::order_created(&order),
                Err(e) => ActionResponse::error(&e),
            }
        }
        ActionRequest::CaptureOrder {
            order_id,
            payment_id,
            signature,
            user_id,
        } => {
            let request = CaptureRequest {
                order_id,
                payment_id,
                signature,
                user_id,
            };
            match engine.capture_order(request).await {
                Ok(settlement) => ActionResponse::captured(&settlement),
                Err(e) => ActionResponse::capture_failed(&e),
            }
        }
        ActionRequest::Balance { user_id } => match engine.balance(&user_id).await {
            Ok(balance) => ActionResponse::balance(&user_id, balance),
            Err(e) => ActionResponse::error(&e),
        },
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent(path: &Path) -> payledger::error::Result<(OrderRegistryBox, LedgerStoreBox)> {
    let store = payledger::infrastructure::rocksdb::RocksDbStore::open(path)?;
    Ok((Box::new(store.clone()), Box::new(store)))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent(_path: &Path) -> payledger::error::Result<(OrderRegistryBox, LedgerStoreBox)> {
    Err(payledger::error::PaymentError::InvalidInput(
        "this build has no persistent storage; rebuild with --features storage-rocksdb".to_string(),
    ))
}
