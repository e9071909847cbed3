use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use supply_monitor::{
    providers::{CoinMarketCapProvider, HttpSupplySource, TelegramClient},
    CommandListener, EventSink, MonitorConfig, ReportService, SupplyMonitor, TracingEventSink,
};

/// HTTP client crates log full request URLs, which carry the bot token.
const QUIET_DEPENDENCIES: &str = "reqwest=warn,hyper=warn,hyper_util=warn";

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let config = match MonitorConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},{}", config.log_level, QUIET_DEPENDENCIES))
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        symbol = %config.symbol,
        delay_secs = config.delay.as_secs(),
        "supply-monitor starting"
    );

    if let Err(e) = run(config).await {
        error!("Fatal error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let supply = Arc::new(HttpSupplySource::new(config.data_url.clone())?);
    let price = Arc::new(CoinMarketCapProvider::new(
        config.cmc_api_key.clone(),
        config.symbol.clone(),
        config.convert.clone(),
    )?);
    let telegram = Arc::new(TelegramClient::new(
        config.bot_token.clone(),
        config.chat_id.clone(),
    )?);
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);

    let report = Arc::new(ReportService::new(
        &config,
        supply.clone(),
        price.clone(),
        events.clone(),
    ));
    let listener = CommandListener::new(telegram.clone(), report);
    let monitor = SupplyMonitor::new(&config, supply, price, telegram, events);

    let shutdown = CancellationToken::new();
    let monitor_task = tokio::spawn(monitor.run(shutdown.clone()));
    let listener_task = tokio::spawn(listener.run(shutdown.clone()));

    wait_for_signal().await;
    shutdown.cancel();

    let (monitor_res, listener_res) = tokio::join!(monitor_task, listener_task);
    if let Err(e) = monitor_res {
        error!(error = %e, "Monitor task ended abnormally");
    }
    if let Err(e) = listener_res {
        error!(error = %e, "Command listener task ended abnormally");
    }

    info!("Goodbye");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn wait_for_signal() {
    let terminate = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    term.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Cannot listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "Cannot listen for SIGINT");
                std::future::pending::<()>().await;
            }
            info!("Received SIGINT, shutting down");
        }
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
