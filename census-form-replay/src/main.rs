//! Replays a scripted respondent against a questionnaire.
//!
//! ```text
//! census-form-replay --schema census_household --script scripts/schoolchild.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use census_form::{
    Engine, EngineConfig, Questionnaire, ScriptError, ScriptedRespondent, SummaryRow,
};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "census-form-replay")]
#[command(about = "Replay scripted answers through a questionnaire and print the summary")]
struct Args {
    /// Schema file, or the id of a bundled questionnaire.
    #[arg(short, long)]
    schema: String,

    /// Script of pages to submit, as JSON.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Engine settings, as TOML.
    #[arg(short, long, env = "CENSUS_FORM_CONFIG")]
    config: Option<PathBuf>,

    /// Log as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn load_questionnaire(schema: &str) -> Result<Questionnaire> {
    let path = Path::new(schema);
    if path.is_file() {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read schema {}", path.display()))?;
        return Questionnaire::from_json(&json)
            .with_context(|| format!("invalid schema {}", path.display()));
    }

    match example_questionnaires::by_id(schema) {
        Some(questionnaire) => {
            questionnaire.with_context(|| format!("bundled schema '{schema}' failed to load"))
        }
        None => bail!("no schema file or bundled questionnaire named '{schema}'"),
    }
}

fn load_script(path: Option<&Path>) -> Result<ScriptedRespondent> {
    let Some(path) = path else {
        return Ok(ScriptedRespondent::new());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    ScriptedRespondent::from_json(&json)
        .with_context(|| format!("invalid script {}", path.display()))
}

fn print_summary(rows: &[SummaryRow], no_answer: &str) {
    let mut section = None;
    for row in rows {
        if section != Some(&row.location.section) {
            section = Some(&row.location.section);
            println!("\n[{}]", row.location.section);
        }
        println!("{}", row.title);
        for line in row.value.text(no_answer).lines() {
            println!("    {line}");
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let questionnaire = load_questionnaire(&args.schema)?;
    let script = load_script(args.script.as_deref())?;
    info!(
        questionnaire = questionnaire.id(),
        pages = script.pages().len(),
        "replaying script"
    );

    let engine = Engine::new(questionnaire, config);
    let run = match script.run(&engine) {
        Ok(run) => run,
        Err(ScriptError::Rejected { block, errors }) => {
            for error in &errors {
                eprintln!("{block}: {error}");
            }
            bail!("block '{block}' was rejected");
        }
        Err(e) => return Err(e.into()),
    };

    let visited: Vec<String> = run
        .visited
        .iter()
        .map(|location| location.block.to_string())
        .collect();
    println!("Path: {}", visited.join(" -> "));

    for (rule, total) in engine.session_state(run.session)?.totals().iter() {
        println!("Total '{rule}': {} ({:?})", total.total, total.outcome);
    }

    let summary = engine.summary(run.session)?;
    print_summary(&summary, &engine.config().no_answer_text);

    if !run.completed {
        bail!("script stopped before the summary");
    }
    Ok(())
}
