mod backends;
mod policy;
mod reports;
mod runner;
mod scenarios;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use hotseat_game::InterviewConfig;
use runner::{ScenarioResult, ScenarioRunner};
use scenarios::{catalog, find_scenario, list_scenarios};
use util::{load_config, resolve_seeds, split_csv};

#[derive(Debug, Parser)]
#[command(name = "hotseat-tester", version = "0.1.0")]
#[command(about = "Automated QA for Hotseat - plays full interviews against scripted backends")]
struct Args {
    /// Scenarios to run (comma-separated, `all` for the whole catalog)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Interview config JSON; unset fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let config = load_config(args.config.as_deref())?;
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = resolve_seeds(&split_csv(&args.seeds))?;

    let results = run_scenarios(&args, config, &scenarios, &seeds);
    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut sink = report_sink(args.output.as_deref())?;
    writeln!(sink, "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(sink, "  {key:20} - {description}")?;
    }
    sink.flush()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎙️ Hotseat Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for scenario in catalog() {
            if !scenarios.iter().any(|s| s == scenario.key) {
                scenarios.push(scenario.key.to_string());
            }
        }
    }
    scenarios
}

fn run_scenarios(
    args: &Args,
    config: InterviewConfig,
    scenarios: &[String],
    seeds: &[u64],
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Interview Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let runner = ScenarioRunner::new(config, args.verbose);
    let mut results = Vec::new();
    for key in scenarios {
        if let Some(scenario) = find_scenario(key) {
            results.extend(runner.run_scenario(&scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", key.yellow());
        }
    }
    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut sink = report_sink(args.output.as_deref())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut sink, results)?,
        "markdown" if results.is_empty() => writeln!(
            sink,
            "# Hotseat Interview Test Results\n\n_No scenarios executed._"
        )?,
        "markdown" => reports::generate_markdown_report(&mut sink, results)?,
        _ => {
            if results.is_empty() {
                writeln!(sink, "No scenarios executed.")?;
            } else {
                reports::generate_console_report(&mut sink, results, start_time.elapsed())?;
            }
            writeln!(sink)?;
            writeln!(sink, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }

    sink.flush()
        .with_context(|| format!("failed to flush {}", sink_label(args.output.as_deref())))
}

/// Buffered writer over the `--output` file, or stdout when none is given.
fn report_sink(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(stdout())));
    };
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn sink_label(path: Option<&Path>) -> String {
    path.map_or_else(|| "stdout".to_string(), |path| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
            config: None,
        }
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke".to_string(),
            seed: 1337,
            passed,
            iterations_run: 3,
            successful_iterations: if passed { 3 } else { 2 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["failure".to_string()]
            },
            average_duration: Duration::from_millis(10),
            performance_data: vec![Duration::from_millis(10)],
        }
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("lost-session,all");
        assert_eq!(expanded[0], "lost-session");
        assert_eq!(expanded.len(), catalog().len());
        assert!(expanded.contains(&"determinism".to_string()));
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("smoke,flaky-backend");
        assert_eq!(expanded, vec!["smoke".to_string(), "flaky-backend".to_string()]);
    }

    #[test]
    fn run_scenarios_skips_unknown_keys() {
        let args = base_args();
        let results = run_scenarios(
            &args,
            InterviewConfig::default(),
            &["nope".to_string(), "smoke".to_string()],
            &[7],
        );
        assert_eq!(results.len(), 1);
        assert!(results[0].passed, "{:?}", results[0].failures);
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = std::env::temp_dir().join("hotseat-scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("silence-nudge"));
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = std::env::temp_dir().join("hotseat-report-empty.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No scenarios executed"));
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = std::env::temp_dir().join("hotseat-report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("scenario_name"));
        assert!(content.contains("\"passed\": false"));
    }

    #[test]
    fn write_reports_console_includes_total_time() {
        let temp = std::env::temp_dir().join("hotseat-report-console.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Smoke"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn report_sink_defaults_to_stdout() {
        let mut sink = report_sink(None).unwrap();
        sink.write_all(b"ok").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink_label(None), "stdout");
    }

    #[test]
    fn report_sink_buffers_until_flushed() {
        let temp = std::env::temp_dir().join("hotseat-sink.txt");
        let mut sink = report_sink(Some(&temp)).unwrap();
        writeln!(sink, "line").unwrap();
        sink.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&temp).unwrap(), "line\n");
        assert!(sink_label(Some(&temp)).ends_with("hotseat-sink.txt"));
    }

    #[test]
    fn report_sink_reports_unwritable_path() {
        let missing = std::env::temp_dir().join("hotseat-no-such-dir").join("report.txt");
        let err = report_sink(Some(&missing)).err().unwrap();
        assert!(err.to_string().contains("failed to create"));
    }
}
