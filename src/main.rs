use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use mcq_case_audit_lib::activity_log;
use mcq_case_audit_lib::batch::{run_audit, BatchConfig, BatchEvent};
use mcq_case_audit_lib::config::Config;
use mcq_case_audit_lib::converter::{
    CaseConverter, ConverterKind, LlmConverter, ReplayConverter, TemplateConverter,
};
use mcq_case_audit_lib::dataset::load_mcqs;
use mcq_case_audit_lib::integrity::check_all;
use mcq_case_audit_lib::llm_client::LlmClient;
use mcq_case_audit_lib::report::{render_text_report, save_report};
use mcq_case_audit_lib::scoring::{scorer_for, AnalysisMode};
use mcq_case_audit_lib::vocabulary::Vocabulary;

/// Audit the quality of MCQ to clinical case conversions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: ~/.mcq-case-audit/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a sample of MCQs and score the generated cases
    Analyze(AnalyzeArgs),

    /// Check MCQ records against the question-bank data model
    Lint {
        /// MCQ dataset (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// MCQ dataset (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// comprehensive, preservation or strict
    #[arg(short, long, default_value = "comprehensive")]
    mode: AnalysisMode,

    /// template, llm or replay
    #[arg(long, default_value = "template")]
    converter: ConverterKind,

    /// Recorded cases for the replay converter
    #[arg(long)]
    cases: Option<PathBuf>,

    /// MCQs sampled per specialty (0 = all)
    #[arg(long)]
    per_specialty: Option<usize>,

    /// Skip specialties with fewer MCQs
    #[arg(long, default_value = "0")]
    min_specialty_size: usize,

    /// Only these specialties (repeatable)
    #[arg(long = "specialty")]
    specialties: Vec<String>,

    /// Seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Improvement cycle number recorded in the report
    #[arg(long, default_value = "1")]
    cycle: u32,

    /// Report directory (overrides config)
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Print the report without saving it
    #[arg(long)]
    no_save: bool,

    /// LLM model (overrides config)
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default(),
    };
    config.apply_env_overrides();

    // flushes the log file when main returns
    let _log_guard = activity_log::init_logging(args.verbose, config.log_dir.as_deref())
        .context("Failed to initialize logging")?;
    info!("MCQ case audit v{} starting", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Analyze(analyze_args) => {
            analyze(analyze_args, config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Lint { input } => lint(&input),
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn analyze(args: AnalyzeArgs, mut config: Config) -> Result<()> {
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(dir) = args.report_dir {
        config.report_dir = Some(dir);
    }

    let mcqs = load_mcqs(&args.input)
        .with_context(|| format!("Failed to load MCQs from {:?}", args.input))?;

    let vocabulary = match &config.vocabulary_path {
        Some(path) => Vocabulary::load(path)?,
        None => Vocabulary::default(),
    };
    let scorer = scorer_for(args.mode, Arc::new(vocabulary));
    let converter = build_converter(args.converter, args.cases.as_deref(), &config)?;

    let batch_config = BatchConfig {
        per_specialty: args.per_specialty.unwrap_or(config.default_per_specialty),
        min_specialty_size: args.min_specialty_size,
        specialties: args.specialties,
        seed: args.seed,
    };

    let report = run_audit(
        &mcqs,
        &batch_config,
        converter.as_ref(),
        scorer.as_ref(),
        args.cycle,
        |event| match event {
            BatchEvent::Started { total, specialties } => {
                eprintln!("Testing {} MCQs across {} specialties", total, specialties);
            }
            BatchEvent::Scored {
                index,
                total,
                result,
            } => {
                let status = match &result.error {
                    Some(error) => format!("ERROR: {}", error),
                    None => format!("{:.1}/100 ({})", result.quality_score, result.band()),
                };
                eprintln!(
                    "[{}/{}] MCQ {} ({}): {}",
                    index + 1,
                    total,
                    result.mcq_id,
                    result.subspecialty,
                    status
                );
            }
        },
    )
    .await;

    println!("{}", render_text_report(&report));

    if !args.no_save {
        let path = save_report(&report, &config.report_dir())?;
        activity_log::log_report_saved(&report.run_id.to_string(), &path);
        println!("Report saved: {}", path.display());
    }
    Ok(())
}

fn build_converter(
    kind: ConverterKind,
    cases: Option<&std::path::Path>,
    config: &Config,
) -> Result<Box<dyn CaseConverter>> {
    let converter: Box<dyn CaseConverter> = match kind {
        ConverterKind::Template => Box::new(TemplateConverter::new(config.validation_threshold)),
        ConverterKind::Llm => {
            let client = LlmClient::new(
                &config.llm_base_url,
                &config.api_key,
                env!("CARGO_PKG_NAME"),
                config.request_timeout(),
            )
            .context("Failed to create LLM client")?;
            Box::new(LlmConverter::new(
                client,
                &config.model,
                config.max_conversion_attempts,
                config.validation_threshold,
            ))
        }
        ConverterKind::Replay => {
            let path = cases.context("--cases is required with --converter replay")?;
            Box::new(ReplayConverter::load(path)?)
        }
    };
    Ok(converter)
}

fn lint(input: &std::path::Path) -> Result<ExitCode> {
    let mcqs = load_mcqs(input).with_context(|| format!("Failed to load MCQs from {:?}", input))?;
    let issues = check_all(&mcqs);

    for issue in &issues {
        println!("{}", issue);
    }

    let mut flagged: Vec<i64> = issues.iter().map(|i| i.mcq_id).collect();
    flagged.dedup();
    activity_log::log_lint_summary(mcqs.len(), flagged.len(), issues.len());
    println!(
        "\n{} MCQs checked, {} with issues ({} issues)",
        mcqs.len(),
        flagged.len(),
        issues.len()
    );

    if issues.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
