//! Integration tests for closed-loop runs of the built-in presets and scenario files.

use std::path::Path;
use std::process::Command;

use appliance_scheduler::config::ScenarioConfig;
use appliance_scheduler::sim::{RunSummary, Runner};

fn run_preset(name: &str) -> RunSummary {
    let config = ScenarioConfig::from_preset(name).expect("preset should load");
    let mut runner = Runner::from_config(&config).expect("preset should be valid");
    let records = runner.run();
    RunSummary::from_records(&records, runner.dt_hours())
}

#[test]
fn baseline_charges_to_target_and_stops() {
    let summary = run_preset("baseline");

    assert_eq!(summary.ticks, 720);
    assert!(summary.final_soc >= 80.0 && summary.final_soc < 81.5, "{summary}");
    assert_eq!(summary.windows_retired, 1);
    assert_eq!(summary.windows_remaining, 0);
    // ~33 kWh at 11 kW needs about three hours of one-minute ticks
    assert!(summary.active_ticks > 170 && summary.active_ticks < 200, "{summary}");
    assert!(summary.peak_charge_kw <= 11.0 + 1e-9);
}

#[test]
fn overlap_preset_runs_runtime_window_first() {
    let config = ScenarioConfig::overlap();
    let mut runner = Runner::from_config(&config).expect("preset should be valid");
    let records = runner.run();

    // the runtime window keeps the charger while the SoC window overlaps it
    assert!(records[..120].iter().all(|r| r.request_kind == Some("runtime")));
    assert_eq!(records[120].request_kind, Some("soc"));

    let summary = RunSummary::from_records(&records, runner.dt_hours());
    assert_eq!(summary.windows_retired, 2);
    assert!(summary.final_soc >= 70.0 && summary.final_soc < 72.0, "{summary}");
}

#[test]
fn optional_energy_preset_is_capped_by_surplus() {
    let config = ScenarioConfig::optional_energy();
    let mut runner = Runner::from_config(&config).expect("preset should be valid");
    let records = runner.run();

    let optional: Vec<_> = records
        .iter()
        .filter(|r| r.request_kind == Some("optional_energy_soc"))
        .collect();
    assert_eq!(optional.len(), 240);
    assert!(optional.iter().all(|r| r.charge_kw <= config.charger.surplus_kw + 1e-9));

    let summary = RunSummary::from_records(&records, runner.dt_hours());
    assert_eq!(summary.windows_retired, 2);
    assert!(summary.final_soc >= 90.0 && summary.final_soc < 91.5, "{summary}");
}

#[test]
fn runs_are_deterministic_for_a_seed() {
    let mut config = ScenarioConfig::baseline();
    config.charger.soc_noise_std = 0.5;
    let first = Runner::from_config(&config).expect("valid").run();
    let second = Runner::from_config(&config).expect("valid").run();
    assert_eq!(first, second);
}

#[test]
fn scenario_files_are_valid() {
    for path in ["scenarios/overnight.toml", "scenarios/surplus_then_commute.toml"] {
        let config = ScenarioConfig::from_toml_file(Path::new(path))
            .unwrap_or_else(|e| panic!("{path}: {e}"));
        let errors = config.validate();
        assert!(errors.is_empty(), "{path}: {errors:?}");
    }
}

#[test]
fn cli_prints_summary_for_scenario_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_appliance-scheduler"))
        .args(["--scenario", "scenarios/overnight.toml", "--quiet"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("appliance-scheduler process should run");

    assert!(
        output.status.success(),
        "run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    let final_soc = parse_metric(&stdout, "Final SoC:", "%");
    assert!((80.0..81.5).contains(&final_soc), "{stdout}");
    assert!(!stdout.contains("t=   0"), "--quiet should suppress tick lines");
}

#[test]
fn cli_rejects_unknown_preset() {
    let output = Command::new(env!("CARGO_BIN_EXE_appliance-scheduler"))
        .args(["--preset", "nonexistent"])
        .output()
        .expect("appliance-scheduler process should run");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

fn parse_metric(stdout: &str, label: &str, unit: &str) -> f64 {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with(label))
        .unwrap_or_else(|| panic!("missing summary line `{label}` in output: {stdout}"));

    let raw = line
        .split_once(':')
        .map(|(_, right)| right.trim())
        .unwrap_or_else(|| panic!("invalid summary format for line `{line}`"));

    let numeric = raw.strip_suffix(unit).unwrap_or(raw).trim();
    numeric
        .parse::<f64>()
        .unwrap_or_else(|_| panic!("failed parsing `{numeric}` from summary line `{line}`"))
}
