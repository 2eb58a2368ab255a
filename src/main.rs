mod chart;
mod config;
mod gateway;
mod model;
mod notifier;
mod parser;
mod pipeline;
mod request;
mod resolver;
mod storage;
mod utils;

use chart::{ChartSession, ChartSessionManager, JsonFileBackend};
use config::{load_config, AppConfig};
use gateway::{GatewayClient, MarketGateway};
use notifier::ConsoleNotifier;
use pipeline::Pipeline;
use resolver::SeriesResolver;
use storage::SqliteStorage;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config: AppConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            return;
        }
    };

    let gateway = match GatewayClient::new(&config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return;
        }
    };

    // Last-used values are a convenience; run without them if the db is unusable
    let storage = match SqliteStorage::new(&config.state_db) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Failed to open state db {}: {}", config.state_db, e);
            None
        }
    };

    let symbols = match gateway.symbols().await {
        Ok(s) => s,
        Err(e) => {
            error!("Error fetching symbols: {}", e);
            Vec::new()
        }
    };

    let mut selection = config.selection.clone();
    if let Some(storage) = &storage {
        match storage.load_last_used() {
            Ok(last) => selection.restore(&last, &symbols),
            Err(e) => warn!("Failed to load last used values: {}", e),
        }
    } else {
        selection.restore(&Default::default(), &symbols);
    }
    info!("Selection: {} {}", selection.instrument, selection.timeframe);

    let resolver = SeriesResolver::new(config.denoise_methods.iter().cloned());
    let mut charts = ChartSessionManager::new(JsonFileBackend::new(&config.chart_output_dir));
    let mut session = ChartSession::new();
    let notifier = ConsoleNotifier::new();

    info!("🚀 mt5view started against {}", config.base_url);

    let outcome = Pipeline {
        gateway: &gateway,
        storage: storage.as_ref(),
        resolver: &resolver,
        charts: &mut charts,
        notifier: &notifier,
    }
    .fetch_and_plot(&selection, &mut session)
    .await;

    match outcome {
        Ok(report) => {
            info!(
                "Rendered {} bars with overlays {:?}",
                report.bars, report.overlays
            );
        }
        Err(e) => {
            warn!("Nothing rendered: {:?}", e.kind());
            return;
        }
    }

    // Charts stay on display until the user closes the viewer.
    info!("Charts in {}. Press Ctrl-C to close.", config.chart_output_dir);
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
    info!("Closing charts.");
    charts.clear(&mut session);
}
