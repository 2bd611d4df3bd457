//! burnish - clean up a source file with model-backed agents and keep it
//! compiling while you do it.

use anyhow::{Context, Result};
use burnish::{
    config::Config, logging, pipeline, AgentKind, Language, NoEnrichment, OpenRouterBackend,
    PipelineOptions, RunStatus, SequencingMode,
};
use clap::Parser;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "burnish",
    about = "Model-backed code cleanup with a self-correcting validation loop",
    version
)]
struct Args {
    /// Source file to clean up
    path: Option<PathBuf>,

    /// Language override (python, javascript, typescript, rust, go);
    /// guessed from the file extension when omitted
    #[arg(long)]
    language: Option<String>,

    /// Comma-separated agents to run (default: all).
    /// Available: rename, import, duplication, long-function, complexity
    #[arg(long, value_delimiter = ',')]
    agents: Vec<String>,

    /// Run agents independently against the original instead of chained
    #[arg(long)]
    independent: bool,

    /// Skip the corrective patch passes
    #[arg(long)]
    no_patch: bool,

    /// Skip external-tool validation entirely
    #[arg(long)]
    no_test: bool,

    /// Cap on patch/test iterations
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Temperature for every agent (overrides per-agent defaults)
    #[arg(long)]
    temperature: Option<f32>,

    /// Write the result here instead of printing it
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Overwrite the input file in place
    #[arg(long)]
    write: bool,

    /// Store an OpenRouter API key (BYOK mode)
    #[arg(long)]
    setup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    if args.setup {
        return setup_api_key();
    }

    let path = args
        .path
        .clone()
        .context("no input file given (see --help)")?;
    let code = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;

    let language = resolve_language(&args, &path)?;
    let selected = resolve_agents(&args)?;

    let config = Config::load();
    let api_key = config
        .get_api_key()
        .context("no API key configured; run 'burnish --setup' first")?;
    let backend = OpenRouterBackend::new(api_key, config.model.clone());

    let mut temperature_overrides = HashMap::new();
    if let Some(t) = args.temperature {
        for agent in &selected {
            temperature_overrides.insert(*agent, t);
        }
    }

    let options = PipelineOptions {
        auto_patch: !args.no_patch,
        auto_test: !args.no_test,
        max_iterations: args.max_iterations.unwrap_or(config.max_iterations),
        sequencing: if args.independent {
            SequencingMode::Independent
        } else {
            SequencingMode::Chained
        },
        temperature_overrides,
        ..PipelineOptions::default()
    };

    let outcome =
        pipeline::run_pipeline(&code, language, selected, options, &backend, &NoEnrichment)
            .await?;

    print_summary(&outcome);

    if args.write {
        std::fs::write(&path, &outcome.final_code)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        eprintln!("  wrote {}", path.display());
    } else if let Some(output) = &args.output {
        std::fs::write(output, &outcome.final_code)
            .with_context(|| format!("failed to write '{}'", output.display()))?;
        eprintln!("  wrote {}", output.display());
    } else {
        println!("{}", outcome.final_code);
    }

    Ok(())
}

fn resolve_language(args: &Args, path: &std::path::Path) -> Result<Language> {
    if let Some(name) = &args.language {
        return Language::from_name(name)
            .with_context(|| format!("unsupported language '{}'", name));
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
        .context("could not guess the language; pass --language")
}

fn resolve_agents(args: &Args) -> Result<Vec<AgentKind>> {
    if args.agents.is_empty() {
        return Ok(AgentKind::ALL.to_vec());
    }
    args.agents
        .iter()
        .map(|name| {
            AgentKind::from_name(name).with_context(|| format!("unknown agent '{}'", name))
        })
        .collect()
}

fn print_summary(outcome: &burnish::RunOutcome) {
    eprintln!();
    for result in &outcome.agent_results {
        eprintln!(
            "  {:<14} {:<10} {} findings, {}ms",
            result.agent.label(),
            result.outcome.as_status_str(),
            result.findings.len(),
            result.duration_ms
        );
    }
    if let Some(report) = outcome.validation_history.last() {
        for tool in &report.tool_reports {
            let verdict = if tool.skipped {
                "skipped"
            } else if tool.passed {
                "ok"
            } else {
                "failed"
            };
            eprintln!("  tool {:<12} {}", tool.tool, verdict);
        }
    }
    let marker = match outcome.status {
        RunStatus::Success => "+",
        RunStatus::Warning => "~",
        RunStatus::Degraded => "!",
    };
    eprintln!(
        "  {} {} after {} iteration(s)",
        marker,
        outcome.status.label(),
        outcome.iterations
    );
    eprintln!();
}

fn setup_api_key() -> Result<()> {
    eprint!("OpenRouter API key: ");
    std::io::stderr().flush()?;
    let mut key = String::new();
    std::io::stdin().read_line(&mut key)?;
    let key = key.trim().to_string();
    if key.is_empty() {
        anyhow::bail!("no key entered");
    }

    let mut config = Config::load();
    config.api_key = Some(key);
    config.save()?;
    eprintln!("  + API key saved");
    Ok(())
}
