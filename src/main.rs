use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use waypost_core::config::AppConfig;
use waypost_core::types::PoiKey;
use waypost_gui::WaypostApp;
use waypost_monitor::{
    AlertSink, ArrivalMonitor, Effect, MarkerRegistry, MonitorEvent, MonitorState,
    TracingAlertSink,
};
use waypost_track::{LocationSource, ReplayScript, ReplaySource, WatchOptions, WatchUpdate};

/// Waypost - Map-based arrival notifier
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Run without a window, driving the monitor from a replay script
    #[arg(long, requires = "replay")]
    headless: bool,

    /// Replay script (YAML) used as the position source in headless mode
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Marker key to arm in headless mode (defaults to the first configured POI)
    #[arg(long)]
    target: Option<String>,

    /// Override the configured log level
    #[arg(long, env = "WAYPOST_LOG")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = if args.config.exists() {
        AppConfig::from_config_builder(&args.config)
            .with_context(|| format!("failed to load config from {:?}", args.config))?
    } else {
        AppConfig::default()
    };
    config.validate().context("invalid configuration")?;

    init_tracing(&config, args.log_level.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    if args.headless {
        // clap's `requires` guarantees the script path is present.
        let replay = args.replay.context("headless mode requires --replay")?;
        return runtime.block_on(run_headless(config, replay, args.target));
    }

    run_gui(config, runtime)
}

fn init_tracing(config: &AppConfig, override_level: Option<&str>) -> Result<()> {
    let level = override_level.unwrap_or(&config.logging.level);
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log level {level:?}"))?;

    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn run_gui(config: AppConfig, runtime: tokio::runtime::Runtime) -> Result<()> {
    info!(pois = config.pois.len(), "starting Waypost");

    let handle = runtime.handle().clone();
    let alerts: Arc<dyn AlertSink> = Arc::new(TracingAlertSink);

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Waypost",
        options,
        Box::new(move |_cc| Ok(Box::new(WaypostApp::new(config, alerts, handle)?))),
    )
    .map_err(|e| anyhow::anyhow!("gui error: {e}"))
}

/// Drives the monitor from a replay script until arrival or exhaustion.
async fn run_headless(config: AppConfig, replay: PathBuf, target: Option<String>) -> Result<()> {
    let registry = Arc::new(MarkerRegistry::with_pois(config.poi_list()));
    let mut monitor = ArrivalMonitor::new(Arc::clone(&registry), config.monitor.radius_m)?;
    let alerts = TracingAlertSink;

    let key: PoiKey = match target {
        Some(key) => key.into(),
        None => {
            let first = config
                .pois
                .first()
                .context("no --target given and no POIs configured")?;
            PoiKey::new(&first.key)
        }
    };

    monitor.handle(MonitorEvent::MarkerClicked(key.clone()));
    if monitor.state() != MonitorState::Selected {
        bail!("unknown marker key {key}");
    }
    info!(key = %key, radius_m = config.monitor.radius_m, "target selected");

    let effects = monitor.handle(MonitorEvent::ArmToggled);
    if !effects.contains(&Effect::RequestWatch) {
        bail!("arming was rejected");
    }

    let script = ReplayScript::from_file(&replay)
        .with_context(|| format!("failed to load replay script {replay:?}"))?;
    let source = ReplaySource::new(script);
    let opts = WatchOptions {
        timeout: config.monitor.watch_timeout(),
        high_accuracy: config.monitor.high_accuracy,
    };
    let mut watch = source.watch(opts).context("failed to start watch")?;
    monitor.watch_started(watch.id);

    while let Some(update) = watch.updates.next().await {
        let event = match update {
            WatchUpdate::Fix { watch_id, fix } => MonitorEvent::PositionUpdate { watch_id, fix },
            WatchUpdate::Error { watch_id, error } => MonitorEvent::WatchError { watch_id, error },
        };

        for effect in monitor.handle(event) {
            match effect {
                Effect::StopWatch(_) => watch.handle.clear(),
                Effect::Arrived { poi, distance_m } => {
                    alerts.arrival(&poi, distance_m);
                    return Ok(());
                }
                Effect::Rejected(reason) => alerts.prompt(&reason.to_string()),
                _ => {}
            }
        }
    }

    warn!("replay exhausted without reaching the target");
    bail!("no arrival before the position stream ended")
}
