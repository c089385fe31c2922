//! CDMP Simulator CLI
//!
//! Run bargaining scenarios on the collective decision-making core.

use cdmp_core::{PCEModel, PolicyConfig, ReportingLevel, StateTransMode, VPModel, VotingRule};
use cdmp_sim::scenarios::ScenarioId;
use cdmp_sim::{ScenarioResult, ScenarioRunner, SimConfig};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// CDMP scenario simulator
#[derive(Parser, Debug)]
#[command(name = "cdmp-sim")]
#[command(about = "Run collective decision-making scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = draw one and report it)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of actors
    #[arg(short, long, default_value = "6")]
    actors: usize,

    /// Scenario to run (clear_majority, polarized, random_field, consensus, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Maximum number of turns
    #[arg(short, long, default_value = "10")]
    turns: usize,

    /// Voting rule (Binary, PropBin, Proportional, PropCbc, Cubic)
    #[arg(long, default_value = "PropBin")]
    voting_rule: VotingRule,

    /// Victory-probability model (Linear, Square, Quartic, Octic, Binary)
    #[arg(long, default_value = "Linear")]
    vp_model: VPModel,

    /// PCE model (Conditional, MarkovIncentive, MarkovUniform)
    #[arg(long, default_value = "MarkovUniform")]
    pce_model: PCEModel,

    /// State transition mode (Deterministic, Stochastic)
    #[arg(long, default_value = "Deterministic")]
    mode: StateTransMode,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export every turn of the run to a JSON file
    #[arg(long)]
    export: Option<String>,
}

/// Log filter: `RUST_LOG` directives if set, otherwise DEBUG with
/// `--verbose` and INFO without.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    EnvFilter::builder()
        .with_default_directive(default.into())
        .parse_lossy(rust_log.unwrap_or(""))
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let filter = log_filter(args.verbose, std::env::var("RUST_LOG").ok().as_deref());
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("CDMP Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: clear_majority, polarized, random_field, consensus, all");
            std::process::exit(1);
        })]
    };

    let config = SimConfig {
        seed: args.seed,
        num_actors: args.actors,
        max_turns: args.turns,
        policy: PolicyConfig {
            voting_rule: args.voting_rule,
            vp_model: args.vp_model,
            pce_model: args.pce_model,
            state_trans_mode: args.mode,
            ..Default::default()
        },
        reporting: if args.verbose {
            ReportingLevel::Medium
        } else {
            ReportingLevel::Silent
        },
        ..Default::default()
    };
    let runner = ScenarioRunner::new(config);

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let scenario = scenarios[0];
        match runner.run_recorded(scenario) {
            Ok((result, export)) => {
                if let Err(e) = export.write_to_file(export_path) {
                    error!("Failed to write export: {}", e);
                    std::process::exit(1);
                }
                info!("Exported {} turns to {}", export.turns.len(), export_path);
                if !result.passed {
                    error!(
                        "✗ {} FAILED: {}",
                        scenario.name(),
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                    std::process::exit(1);
                }
                info!("✓ {} (seed={}) PASSED", scenario.name(), result.seed);
            }
            Err(e) => {
                error!("✗ {} ERROR: {}", scenario.name(), e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Run simulations
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;
    let mut errors: Vec<(ScenarioId, String)> = Vec::new();

    for scenario in &scenarios {
        match runner.run(*scenario) {
            Ok(result) => {
                if !args.json {
                    if result.passed {
                        info!("✓ {} (seed={}) PASSED", scenario.name(), result.seed);
                    } else {
                        error!(
                            "✗ {} (seed={}) FAILED: {}",
                            scenario.name(),
                            result.seed,
                            result.failure_reason.as_deref().unwrap_or("unknown")
                        );
                    }
                }
                if !result.passed {
                    failed_count += 1;
                }
                all_results.push(result);
            }
            Err(e) => {
                error!("✗ {} ERROR: {}", scenario.name(), e);
                failed_count += 1;
                errors.push((*scenario, e.to_string()));
            }
        }
    }

    // Summary
    let total = scenarios.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "turns": r.turns,
                    "winning_position": r.winning_position,
                    "winner_probability": r.winner_probability,
                    "final_unique_positions": r.final_unique_positions,
                    "converged": r.metrics.converged,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
            "errors": errors.iter().map(|(s, e)| {
                serde_json::json!({ "scenario": s.name(), "error": e })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_follow_verbose() {
        assert_eq!(log_filter(true, None).to_string(), "debug");
        assert_eq!(log_filter(false, None).to_string(), "info");
    }

    #[test]
    fn test_log_filter_honors_rust_log() {
        let filter = log_filter(false, Some("cdmp_core=trace")).to_string();
        assert!(filter.contains("cdmp_core=trace"));
    }
}
