use std::env;
use std::path::PathBuf;

use fleet_sim::sim::PolicyMode;

/// Parsed command-line options.
#[derive(Debug, Default)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub mode: Option<PolicyMode>,
    pub hours: Option<f64>,
    pub telemetry_out: Option<PathBuf>,
    pub compare: bool,
    /// Run the live runtime for this many wall-clock seconds.
    pub live_secs: Option<u64>,
    pub snapshot_out: Option<PathBuf>,
    #[cfg(feature = "api")]
    pub serve: bool,
    #[cfg(feature = "api")]
    pub port: u16,
}

impl CliOptions {
    /// True when the concurrent runtime is needed instead of a batch run.
    pub fn is_live(&self) -> bool {
        #[cfg(feature = "api")]
        if self.serve {
            return true;
        }
        self.live_secs.is_some()
    }
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

fn value<'a>(args: &'a [String], index: usize, flag: &str, expected: &str) -> Result<&'a str, String> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing value for {flag} (expected {expected})"))
}

fn parse_value<T: std::str::FromStr>(raw: &str, flag: &str, expected: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("{flag} value \"{raw}\" is not a valid {expected}"))
}

pub fn parse_args_from(args: &[String]) -> Result<CliOptions, String> {
    let mut opts = CliOptions {
        #[cfg(feature = "api")]
        port: 3000,
        ..CliOptions::default()
    };

    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--scenario" => {
                i += 1;
                let path = value(args, i, flag, "a TOML file path")?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = value(args, i, flag, "a preset name")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                opts.seed = Some(parse_value(value(args, i, flag, "a u64")?, flag, "u64")?);
            }
            "--mode" => {
                i += 1;
                let raw = value(args, i, flag, "baseline or adaptive")?;
                opts.mode = Some(raw.parse::<PolicyMode>()?);
            }
            "--hours" => {
                i += 1;
                let hours: f64 = parse_value(value(args, i, flag, "a number")?, flag, "number")?;
                if !hours.is_finite() || hours <= 0.0 {
                    return Err("--hours must be a finite number > 0".to_string());
                }
                opts.hours = Some(hours);
            }
            "--telemetry-out" => {
                i += 1;
                opts.telemetry_out = Some(PathBuf::from(value(args, i, flag, "a file path")?));
            }
            "--compare" => opts.compare = true,
            "--live" => {
                i += 1;
                let secs = parse_value(value(args, i, flag, "seconds")?, flag, "u64")?;
                opts.live_secs = Some(secs);
            }
            "--snapshot-out" => {
                i += 1;
                opts.snapshot_out = Some(PathBuf::from(value(args, i, flag, "a file path")?));
            }
            #[cfg(feature = "api")]
            "--serve" => opts.serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                opts.port = parse_value(value(args, i, flag, "a u16")?, flag, "u16")?;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }
    if opts.compare && opts.is_live() {
        return Err("`--compare` runs headless and cannot be combined with a live run".to_string());
    }
    if opts.snapshot_out.is_some() && !opts.is_live() {
        return Err("`--snapshot-out` requires `--live`".to_string());
    }

    Ok(opts)
}

pub fn print_usage() {
    eprintln!("fleet-sim: island EV shuttle fleet on a solar microgrid");
    eprintln!();
    eprintln!("Usage: fleet-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (default, baseline, dense, low_battery)");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --mode <mode>            Override dispatch policy (baseline, adaptive)");
    eprintln!("  --hours <f64>            Simulated hours for a batch run");
    eprintln!("  --telemetry-out <path>   Export history samples to CSV");
    eprintln!("  --compare                Run both policies on the same seed");
    eprintln!("  --live <secs>            Run the live stepper and broadcaster");
    eprintln!("  --snapshot-out <path>    Write broadcast snapshots as JSON lines");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Serve the REST API while running live");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the default preset is used.");
}
