//! Fleet simulator entry point: CLI wiring, batch runs and the live runtime.

mod cli;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fleet_sim::config::ScenarioConfig;
use fleet_sim::io::export::export_csv;
use fleet_sim::runtime::{FleetRuntime, JsonLinesSink, RuntimeConfig, SnapshotSink, TracingSink};
use fleet_sim::sim::metrics::{FleetMetrics, PolicyComparison};
use fleet_sim::sim::snapshot::HistorySample;
use fleet_sim::sim::{FleetConfig, PolicyMode, Simulation};

use cli::CliOptions;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

/// Loads the scenario from `--scenario`, then `--preset`, then the default preset.
fn load_scenario(cli: &CliOptions) -> ScenarioConfig {
    let loaded = if let Some(ref path) = cli.scenario {
        ScenarioConfig::from_toml_file(path)
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::island())
    };
    let mut scenario = loaded.unwrap_or_else(|e| fail(e));

    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(mode) = cli.mode {
        scenario.simulation.mode = mode;
    }
    if let Some(hours) = cli.hours {
        scenario.simulation.duration_hours = hours;
    }
    scenario
}

fn write_history(history: &[HistorySample], path: &Path) {
    if let Err(e) = export_csv(history, path) {
        fail(format!("failed to write CSV: {e}"));
    }
    eprintln!("Telemetry written to {}", path.display());
}

/// Runs one policy headless and prints its report.
fn run_batch(config: Arc<FleetConfig>, hours: f64, telemetry_out: Option<&PathBuf>) {
    let mut sim = Simulation::new(config);
    info!(mode = %sim.mode(), seed = sim.seed(), hours, "batch run");
    sim.run_hours(hours);

    for event in sim.events().collect::<Vec<_>>().into_iter().rev() {
        println!("[{}] {} {}", event.clock, event.category, event.message);
    }
    println!();
    println!("Mode: {}  Seed: {}  Simulated: {hours} h", sim.mode(), sim.seed());
    println!("{}", sim.metrics());
    let suppressed = sim.events_suppressed();
    if suppressed > 0 {
        println!("Events suppressed by rate limit: {suppressed}");
    }

    if let Some(path) = telemetry_out {
        let history: Vec<_> = sim.history().cloned().collect();
        write_history(&history, path);
    }
}

/// Runs both policies on the same seed and prints the difference.
fn run_compare(config: Arc<FleetConfig>, hours: f64) {
    let seed = config.seed;
    let report = |mode: PolicyMode| -> FleetMetrics {
        let mut sim = Simulation::with_seed(Arc::clone(&config), mode, seed);
        let metrics = *sim.run_hours(hours);
        println!("=== {mode} ===");
        println!("{metrics}");
        println!();
        metrics
    };
    let baseline = report(PolicyMode::Baseline);
    let adaptive = report(PolicyMode::Adaptive);
    println!("{}", PolicyComparison::new(baseline, adaptive));
}

async fn wait_for_exit(duration: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    match duration {
        Some(d) => {
            tokio::select! {
                () = tokio::time::sleep(d) => {}
                () = ctrl_c => info!("interrupted"),
            }
        }
        None => ctrl_c.await,
    }
}

async fn run_live<S>(config: Arc<FleetConfig>, runtime: RuntimeConfig, sink: S, cli: &CliOptions)
where
    S: SnapshotSink + Send + 'static,
{
    let fleet = FleetRuntime::launch(Simulation::new(config), runtime, sink, true);

    #[cfg(feature = "api")]
    let server = cli.serve.then(|| {
        let state = Arc::new(fleet_sim::api::AppState {
            fleet: fleet.handle(),
        });
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cli.port));
        tokio::spawn(async move {
            if let Err(e) = fleet_sim::api::serve(state, addr).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    });

    wait_for_exit(cli.live_secs.map(Duration::from_secs)).await;

    let last = fleet.handle().latest();
    #[cfg(feature = "api")]
    if let Some(server) = server {
        server.abort();
    }
    fleet.shutdown().await;

    println!("Mode: {}  Tick: {}  Clock: {}", last.mode, last.tick, last.clock);
    println!("{}", last.metrics.totals);
    if let Some(ref path) = cli.telemetry_out {
        write_history(&last.history, path);
    }
}

fn main() {
    init_tracing();

    let cli = cli::parse_args().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        cli::print_usage();
        process::exit(1);
    });

    let scenario = load_scenario(&cli);
    let config = match scenario.build() {
        Ok(config) => Arc::new(config),
        Err(errors) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(1);
        }
    };
    let hours = scenario.simulation.duration_hours;

    if !cli.is_live() {
        if cli.compare {
            run_compare(config, hours);
        } else {
            run_batch(config, hours, cli.telemetry_out.as_ref());
        }
        return;
    }

    let rt = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| fail(format!("failed to create tokio runtime: {e}")));
    let runtime = scenario.runtime_config();
    rt.block_on(async {
        match cli.snapshot_out {
            Some(ref path) => {
                let file = File::create(path)
                    .unwrap_or_else(|e| fail(format!("cannot create {}: {e}", path.display())));
                let sink = JsonLinesSink::new(BufWriter::new(file));
                run_live(config, runtime, sink, &cli).await;
            }
            None => run_live(config, runtime, TracingSink, &cli).await,
        }
    });
}
