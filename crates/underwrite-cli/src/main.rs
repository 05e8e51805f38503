//! underwrite CLI - score loan-underwriting transcripts from the terminal
//!
//! - `score` prints the reward of one transcript
//! - `explain` prints every check behind that reward
//! - `batch` scores a JSONL file and summarizes the band distribution

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use underwrite_core::{
    CheckOutcome, Evaluation, Outcome, RewardConfig, RewardFn, Response, ScoringEngine,
};
use underwrite_runtime::{
    create_reward_fn, BatchScorer, Experience, RewardKind, RolloutScorer, RuntimeConfig,
    StatsSnapshot,
};

#[derive(Parser)]
#[command(name = "underwrite")]
#[command(about = "Rule-based reward for multi-agent loan-underwriting transcripts", long_about = None)]
#[command(version)]
struct Cli {
    /// Reward calibration file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one transcript
    Score {
        /// Transcript file, or "-" for stdin
        #[arg(default_value = "-")]
        path: String,

        /// Print the breakdown mapping instead of the scalar reward
        #[arg(long)]
        dict: bool,

        /// Truth file for the truth-breakdown reward
        #[arg(long)]
        truth: Option<PathBuf>,

        /// Reward function to run
        #[arg(long, default_value = "rule_based")]
        kind: RewardKind,
    },

    /// Show every check behind a transcript's reward
    Explain {
        /// Transcript file, or "-" for stdin
        #[arg(default_value = "-")]
        path: String,

        #[arg(long, value_enum, default_value = "text")]
        format: ExplainFormat,
    },

    /// Score a JSONL file, one task per line
    Batch {
        /// JSONL file, or "-" for stdin
        path: String,

        /// Runtime config (reward kind, concurrency, cache)
        #[arg(long)]
        runtime_config: Option<PathBuf>,

        /// Override the configured concurrency
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExplainFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .without_time(),
        )
        .init();

    match cli.command {
        Commands::Score {
            path,
            dict,
            truth,
            kind,
        } => {
            let calibration = load_calibration(cli.config.as_deref())?;
            let text = read_input(&path)?;
            let truth = truth.as_deref().map(read_json).transpose()?;

            let reward_fn = create_reward_fn(kind, calibration);
            let output = reward_fn.call(&Response::text(text), None, truth.as_ref(), dict);
            println!("{}", serde_json::to_string(&output.to_value())?);
        }

        Commands::Explain { path, format } => {
            let calibration = load_calibration(cli.config.as_deref())?;
            let text = read_input(&path)?;
            let evaluation = ScoringEngine::new(calibration).evaluate(&Response::text(text));

            match format {
                ExplainFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&evaluation)?)
                }
                ExplainFormat::Text => print!("{}", render_evaluation(&evaluation)),
            }
        }

        Commands::Batch {
            path,
            runtime_config,
            concurrency,
        } => {
            let mut config = match &runtime_config {
                Some(file) => RuntimeConfig::from_yaml_file(file).with_context(|| {
                    format!("Failed to load runtime config: {}", file.display())
                })?,
                None => RuntimeConfig::default(),
            };
            if let Some(concurrency) = concurrency {
                if concurrency == 0 {
                    bail!("--concurrency must be at least 1");
                }
                config.concurrency = concurrency;
            }
            if let Some(calibration) = cli.config {
                config.calibration = Some(calibration);
            }

            let tasks = read_input(&path)?
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(index, line)| {
                    parse_task(line).with_context(|| format!("Invalid task on line {}", index + 1))
                })
                .collect::<Result<Vec<_>>>()?;

            run_batch(&config, tasks).await?;
        }
    }

    Ok(())
}

/// One line of a batch file.
#[derive(Debug, PartialEq)]
struct Task {
    response: Response,
    prompt: Option<Value>,
    truth: Option<Value>,
}

/// A line is `{"response": ..., "prompt": ..., "truth": ...}`, a bare JSON
/// string, or any other JSON value taken as the response itself.
fn parse_task(line: &str) -> Result<Task> {
    let value: Value = serde_json::from_str(line)?;

    let task = match value {
        Value::String(text) => Task {
            response: Response::text(text),
            prompt: None,
            truth: None,
        },
        Value::Object(mut map) if map.contains_key("response") => {
            let response = match map.remove("response") {
                Some(Value::String(text)) => Response::text(text),
                Some(other) => Response::from(other),
                None => Response::from(Value::Null),
            };
            Task {
                response,
                prompt: map.remove("prompt").filter(|v| !v.is_null()),
                truth: map.remove("truth").filter(|v| !v.is_null()),
            }
        }
        other => Task {
            response: Response::from(other),
            prompt: None,
            truth: None,
        },
    };
    Ok(task)
}

async fn run_batch(config: &RuntimeConfig, tasks: Vec<Task>) -> Result<()> {
    match config.reward_kind {
        RewardKind::RuleBased => {
            let scorer =
                BatchScorer::from_config(config).context("Failed to build batch scorer")?;
            let responses = tasks.into_iter().map(|task| task.response).collect();

            for (index, evaluation) in scorer.score_batch(responses).await.iter().enumerate() {
                let line = json!({
                    "index": index,
                    "reward": evaluation.reward,
                    "outcome": evaluation.assessment.outcome,
                });
                println!("{}", serde_json::to_string(&line)?);
            }

            eprint!("{}", render_summary(&scorer.stats().snapshot()));
        }
        kind => {
            let calibration = config
                .reward_config()
                .context("Failed to load reward calibration")?;
            let scorer = RolloutScorer::new(create_reward_fn(kind, calibration)).eval_mode(true);

            let mut experiences: Vec<Experience> = tasks
                .into_iter()
                .map(|task| Experience {
                    response_text: match task.response {
                        Response::Text(text) => text,
                        Response::Structured(value) => value.to_string(),
                    },
                    prompt: task.prompt,
                    truth: task.truth,
                    ..Experience::default()
                })
                .collect();
            scorer.score(&mut experiences);

            for (index, experience) in experiences.iter().enumerate() {
                let line = json!({
                    "index": index,
                    "reward": experience.reward,
                    "metrics": experience.metrics,
                });
                println!("{}", serde_json::to_string(&line)?);
            }
            eprintln!("Scored {} responses with {}", experiences.len(), kind);
        }
    }
    Ok(())
}

fn load_calibration(path: Option<&Path>) -> Result<RewardConfig> {
    match path {
        Some(path) => RewardConfig::from_file(path)
            .with_context(|| format!("Failed to load reward calibration: {}", path.display())),
        None => Ok(RewardConfig::default()),
    }
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read input: {}", path))
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read truth file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse truth file: {}", path.display()))
}

fn render_evaluation(evaluation: &Evaluation) -> String {
    let assessment = &evaluation.assessment;
    let mut out = String::new();

    let verdict = match &assessment.outcome {
        Outcome::Malformed { reason } => format!("malformed ({})", reason),
        Outcome::Gated { structure } => format!("gated (structure {:.2})", structure),
        Outcome::Banded { band } => band.name().to_string(),
    };
    out.push_str(&format!("Reward: {:.4}  [{}]\n", evaluation.reward, verdict));
    out.push_str(&format!(
        "Weighted score: {:.4}  base reward: {:.4}\n",
        assessment.weighted_score, assessment.base_reward
    ));

    for finding in &assessment.findings {
        out.push_str(&format!(
            "\n{:<16} {:.2}\n",
            finding.component.name(),
            finding.score
        ));
        for check in &finding.checks {
            let mark = match check.outcome {
                CheckOutcome::Earned { .. } => "+",
                CheckOutcome::NotEarned => "-",
                CheckOutcome::Skipped => " ",
            };
            out.push_str(&format!(
                "  [{}] {:<7} {:.2}  {}",
                mark,
                check.check_id,
                check.outcome.points(),
                check.description
            ));
            if let Some(rationale) = &check.rationale {
                out.push_str(&format!(" ({})", rationale));
            }
            out.push('\n');
        }
    }
    out
}

fn render_summary(snapshot: &StatsSnapshot) -> String {
    let mut out = format!(
        "Scored {} responses ({} malformed, {} gated), mean reward {:.4}\n",
        snapshot.scored, snapshot.malformed, snapshot.gated, snapshot.mean_reward
    );
    for (band, count) in snapshot.bands.iter().rev() {
        let fraction = snapshot.band_fractions.get(band).copied().unwrap_or(0.0);
        out.push_str(&format!(
            "  {:<10} {:>6}  {:>5.1}%\n",
            band.name(),
            count,
            fraction * 100.0
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_shapes() {
        let bare = parse_task(r#""{\"decision\": \"APPROVED\"}""#).unwrap();
        assert_eq!(bare.response, Response::text(r#"{"decision": "APPROVED"}"#));

        let wrapped =
            parse_task(r#"{"response": {"decision": "DENIED"}, "truth": {"a": 1}, "prompt": null}"#)
                .unwrap();
        assert_eq!(wrapped.response, Response::from(json!({"decision": "DENIED"})));
        assert_eq!(wrapped.truth, Some(json!({"a": 1})));
        assert_eq!(wrapped.prompt, None);

        let envelope = parse_task(r#"{"decision": "DENIED"}"#).unwrap();
        assert_eq!(envelope.response, Response::from(json!({"decision": "DENIED"})));

        assert!(parse_task("not json").is_err());
    }

    #[test]
    fn test_render_malformed() {
        let evaluation = ScoringEngine::default().evaluate(&Response::text("nope"));
        let text = render_evaluation(&evaluation);
        assert!(text.starts_with("Reward: 0.0000  [malformed"));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "underwrite",
            "batch",
            "tasks.jsonl",
            "--concurrency",
            "4",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Batch {
                concurrency: Some(4),
                ..
            }
        ));

        let cli = Cli::try_parse_from(["underwrite", "score", "--kind", "truth-breakdown"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Score {
                kind: RewardKind::TruthBreakdown,
                ..
            }
        ));
    }
}
