use {
    detflow::{
        channel,
        config::{Config, SourceKind},
        source::{EventSource, Simulator, SimulatorConfig, StdinSource, TailSource},
        ui,
    },
    std::env,
    tokio::sync::{mpsc, watch},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?.apply_args(&args)?;

    // Logs go to stderr; the dashboard draws on the alternate screen
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.rust_log))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("🚀 Starting detflow...");
    log::info!("📊 Configuration:");
    log::info!("   Source: {}", config.source.as_str());
    if config.source == SourceKind::File {
        log::info!("   Events path: {} (from start: {})", config.events_path.display(), config.from_start);
    }
    log::info!("   Channel buffer: {}", config.channel_buffer);
    log::info!("   Top N: {}", config.top_n);
    log::info!("   Output: {}", if config.headless { "headless JSON" } else { "dashboard" });

    let (event_channel, store, subscription) = detflow::connect();

    let source: Box<dyn EventSource> = match config.source {
        SourceKind::Simulate => Box::new(Simulator::new(SimulatorConfig {
            interval: config.sim_interval,
            limit: config.sim_limit,
            ..SimulatorConfig::default()
        })),
        SourceKind::Stdin => Box::new(StdinSource::new()),
        SourceKind::File => Box::new(TailSource::new(config.events_path.clone(), config.from_start)),
    };
    let source_name = source.name();

    let (tx, rx) = mpsc::channel(config.channel_buffer);
    let (ended_tx, ended_rx) = watch::channel(false);

    let source_handle = tokio::spawn(async move {
        if let Err(e) = source.run(tx).await {
            log::error!("❌ Source '{}' failed: {}", source_name, e);
        }
    });

    let pump_channel = event_channel.clone();
    let pump_handle = tokio::spawn(async move {
        channel::pump(rx, pump_channel).await;
        // No receivers left is fine: the consumer may already have quit
        let _ = ended_tx.send(true);
    });

    log::info!("✅ Pipeline configured, streaming from {}", source_name);

    let outcome = if config.headless {
        ui::run_headless(store.clone(), config.top_n, ended_rx, std::io::stdout())
            .await
            .map(|lines| log::info!("Wrote {} snapshots", lines))
    } else {
        ui::run_ui(store.clone(), event_channel.clone(), config.top_n, source_name, ended_rx).await
    };

    event_channel.unsubscribe(subscription);
    source_handle.abort();
    pump_handle.abort();

    let stats = event_channel.stats();
    log::info!(
        "👋 Session closed: {} events aggregated, {} rejected, revision {}",
        store.read(|state| state.event_count()),
        stats.rejected,
        store.revision()
    );

    outcome
}
