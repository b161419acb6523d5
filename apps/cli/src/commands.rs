//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use lessonforge_core::{
    JobSpec, Orchestrator, ProgressEvent, ProgressKind, ProgressReporter,
};
use lessonforge_gateways::{OpenRouterClient, RetryPolicy, TavilyClient};
use lessonforge_shared::{
    init_config, load_config, AppConfig, Credentials, JobId, ScalePreset,
};
use lessonforge_storage::{JobRecord, JobStore, LibsqlStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LessonForge — turn a topic into a structured lesson knowledge base.
#[derive(Parser)]
#[command(
    name = "lessonforge",
    version,
    about = "Generate lesson knowledge bases from web sources via LLM synthesis.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a generation job for a topic.
    Run {
        /// Topic to build a knowledge base for.
        topic: String,

        /// Generation scale: quick, standard, comprehensive, or book.
        #[arg(short, long)]
        scale: Option<ScalePreset>,

        /// Learner proficiency level (e.g. B1, beginner).
        #[arg(long)]
        level: Option<String>,

        /// Target language for language-learning runs.
        #[arg(long)]
        language: Option<String>,

        /// Explicit subtopic (repeatable); skips discovery when given.
        #[arg(long = "subtopic")]
        subtopics: Vec<String>,

        /// Pinned reference URL (repeatable), seeded ahead of search hits.
        #[arg(long = "pin")]
        pinned_urls: Vec<String>,

        /// Skip practice exercises in the generated lessons.
        #[arg(long)]
        no_exercises: bool,

        /// Database path (defaults to the configured job store).
        #[arg(long)]
        db: Option<String>,
    },

    /// Show progress and results for a job.
    Status {
        /// Job id to inspect.
        #[arg(long)]
        job: JobId,

        /// Database path (defaults to the configured job store).
        #[arg(long)]
        db: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "lessonforge=info",
        1 => "lessonforge=debug",
        _ => "lessonforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            topic,
            scale,
            level,
            language,
            subtopics,
            pinned_urls,
            no_exercises,
            db,
        } => {
            cmd_run(
                &topic,
                scale,
                level,
                language,
                subtopics,
                pinned_urls,
                no_exercises,
                db.as_deref(),
            )
            .await
        }
        Command::Status { job, db } => cmd_status(&job, db.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    topic: &str,
    scale: Option<ScalePreset>,
    level: Option<String>,
    language: Option<String>,
    subtopics: Vec<String>,
    pinned_urls: Vec<String>,
    no_exercises: bool,
    db: Option<&str>,
) -> Result<()> {
    // Validate credentials before doing anything
    let config = load_config()?;
    let credentials = Credentials::resolve(&config)?;

    let scale = scale.unwrap_or(config.defaults.scale);
    let level = level.or_else(|| config.defaults.level.clone());
    let language = language.or_else(|| config.defaults.language.clone());

    let retry = RetryPolicy::from_config(&config.retry);
    let completion = OpenRouterClient::new(
        credentials.openrouter_api_key,
        config.openrouter.default_model.clone(),
        retry,
    )?;
    let search = TavilyClient::new(credentials.tavily_api_key, retry)?;

    let db_path = resolve_db_path(db, &config)?;
    let store = LibsqlStore::open(&db_path).await?;

    let job = JobRecord::new(topic, scale);
    store.create_job(&job).await?;

    let mut spec = JobSpec::new(topic, scale);
    spec.level = level;
    spec.language = language;
    spec.subtopics = subtopics;
    spec.pinned_urls = pinned_urls;
    spec.include_exercises = !no_exercises;
    spec.domain_allowlist = config.collector.domain_allowlist.clone();

    info!(topic, scale = scale.as_str(), job_id = %job.id, "starting generation job");

    let reporter = CliProgress::new();
    let orchestrator = Orchestrator::new(completion, search, store);
    let report = orchestrator.run_job(&job.id, &spec, &reporter).await?;

    println!();
    println!("  Knowledge base generated!");
    println!("  Job:       {}", report.job_id);
    println!("  Subtopics: {}/{} completed", report.completed, report.total);
    if report.failed > 0 {
        println!("  Failed:    {} (see `lessonforge status`)", report.failed);
    }
    println!("  Store:     {}", db_path.display());
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

/// Expand `~` and pick the flag value over the configured default.
fn resolve_db_path(flag: Option<&str>, config: &AppConfig) -> Result<PathBuf> {
    let raw = flag.unwrap_or(&config.defaults.db_path);
    if let Some(rest) = raw.strip_prefix("~/") {
        let home =
            dirs::home_dir().ok_or_else(|| eyre!("could not determine home directory"))?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(raw))
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

async fn cmd_status(job_id: &JobId, db: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db_path(db, &config)?;
    let store = LibsqlStore::open(&db_path).await?;

    let job = store
        .get_job(job_id)
        .await?
        .ok_or_else(|| eyre!("no job {job_id} in {}", db_path.display()))?;

    println!();
    println!("  Job:    {}", job.id);
    println!("  Topic:  {}", job.topic);
    println!("  Scale:  {}", job.scale.as_str());
    println!("  Status: {}", job.status);
    println!();

    let rows = store.list_subtopics(job_id).await?;
    if rows.is_empty() {
        println!("  (no subtopics yet)");
        return Ok(());
    }

    println!("  {:<42} {:<13} {:>7} {:>7}", "Subtopic", "Status", "Sources", "Words");
    for row in &rows {
        println!(
            "  {:<42} {:<13} {:>7} {:>7}",
            row.name, row.status, row.source_count, row.word_count
        );
        if let Some(error) = &row.error_message {
            println!("      {error}");
        }
    }

    let total_words: usize = rows.iter().map(|r| r.word_count).sum();
    println!();
    println!("  Total words: {total_words}");

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn event(&self, event: &ProgressEvent) {
        match event.kind {
            ProgressKind::Phase => {
                self.spinner.set_message(format!("{}: {}", event.phase, event.message));
            }
            ProgressKind::Subtopic => {
                let subtopic = event.subtopic.as_deref().unwrap_or("");
                self.spinner.set_message(format!(
                    "[{}/{}] {} — {}",
                    event.current, event.total, subtopic, event.phase
                ));
            }
            ProgressKind::Error => {
                self.spinner.set_message(format!("Error: {}", event.message));
            }
            ProgressKind::Done => {
                self.spinner.finish_and_clear();
            }
        }
    }
}
