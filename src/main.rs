//! Appliance scheduler entry point: CLI wiring and config-driven runner construction.

use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use appliance_scheduler::config::ScenarioConfig;
use appliance_scheduler::io::export::export_csv;
use appliance_scheduler::sim::{RunSummary, Runner};

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    telemetry_out: Option<String>,
    quiet: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("appliance-scheduler: timeframe scheduling for smart appliances and EV chargers");
    eprintln!();
    eprintln!("Usage: appliance-scheduler [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --telemetry-out <path>   Export tick records to CSV");
    eprintln!("  --quiet                  Print the summary only");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after the run");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        telemetry_out: None,
        quiet: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--seed" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --seed requires a u64 argument");
                    process::exit(1);
                }
                if let Ok(s) = args[i].parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{}\" is not a valid u64", args[i]);
                    process::exit(1);
                }
            }
            "--telemetry-out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --telemetry-out requires a path argument");
                    process::exit(1);
                }
                cli.telemetry_out = Some(args[i].clone());
            }
            "--quiet" | "-q" => {
                cli.quiet = true;
            }
            #[cfg(feature = "api")]
            "--serve" => {
                cli.serve = true;
            }
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --port requires a u16 argument");
                    process::exit(1);
                }
                if let Ok(p) = args[i].parse::<u16>() {
                    cli.port = p;
                } else {
                    eprintln!("error: --port value \"{}\" is not a valid u16", args[i]);
                    process::exit(1);
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = parse_args();
    init_tracing();

    // --scenario takes priority, then --preset, then baseline default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }

    let mut runner = match Runner::from_config(&scenario) {
        Ok(runner) => runner,
        Err(errors) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(1);
        }
    };

    let records = runner.run();
    let summary = RunSummary::from_records(&records, runner.dt_hours());

    if !cli.quiet {
        for r in &records {
            println!("{r}");
        }
    }
    println!("\n{summary}");

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&records, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let end = records
            .last()
            .map_or(scenario.simulation.start, |r| r.timestamp);
        let queue = runner.handler_mut().inspect(end);
        let state = Arc::new(appliance_scheduler::api::AppState {
            appliance_id: scenario.simulation.appliance_id.clone(),
            summary,
            queue,
            ticks: records,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(appliance_scheduler::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
