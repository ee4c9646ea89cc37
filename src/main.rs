//! # quizthebest CLI
//!
//! Command-line front end for study-set generation.
//!
//! ## Subcommands
//!
//! - `generate`: search, scrape and generate a study set for a topic
//! - `agent`: generate a study set through the delegated agent path
//! - `search` / `scrape`: inspect the content-gathering stages on their own
//! - `synoptic`: one summary connecting several topics
//! - `list`, `show`, `export`, `regenerate-quiz`, `delete`: manage stored sets
//! - `action`: answer one agent action-group callback read as JSON
//!
//! Configuration comes from the environment (see `AppConfig`); flags
//! override it per invocation.

mod telemetry;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use quizthebest::agent::{
    into_materials, ActionGroupHandler, ActionGroupRequest, AgentClient, AgentGenerationOptions,
    AgentInvocationOptions, AgentOrchestrator, ModelAgentRuntime,
};
use quizthebest::config::AppConfig;
use quizthebest::crawler::{Scraper, ScraperConfig};
use quizthebest::export::{export_csv, export_json};
use quizthebest::model::gemini_from_config;
use quizthebest::pipeline::{GenerationOptions, GenerationOrchestrator};
use quizthebest::render;
use quizthebest::sanitizer::sanitize;
use quizthebest::search::{SearchOrchestrator, SerpApiClient};
use quizthebest::store::{LibsqlStore, StudySetRepository};
use quizthebest::types::{GeneratedMaterials, StudySet};
use quizthebest::usage::UsageLedger;
use telemetry::OtelGuard;
use termcolor::{ColorChoice, StandardStream};
use tokio::io::AsyncReadExt;
use tracing::instrument;

#[derive(Parser)]
#[command(author, version, about = "Turn a topic into summaries, flashcards and quizzes", long_about = None)]
struct Cli {
    /// Study-set database path (overrides QTB_DATABASE)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a study set with the search-and-generate pipeline
    Generate(GenerateArgs),

    /// Generate a study set through the delegated agent
    Agent(AgentArgs),

    /// Search and rank content for a query
    Search(SearchArgs),

    /// Scrape a single page
    Scrape(ScrapeArgs),

    /// Write one summary connecting several topics
    Synoptic(SynopticArgs),

    /// List a user's study sets
    List(ListArgs),

    /// Show a stored study set
    Show(ShowArgs),

    /// Export a stored study set
    Export(ExportArgs),

    /// Replace the quiz of a stored study set with a new one
    RegenerateQuiz(RegenerateQuizArgs),

    /// Delete a stored study set
    Delete(DeleteArgs),

    /// Answer an agent action-group callback
    Action(ActionArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Topic to study
    #[arg(required = true)]
    topic: String,

    /// Owner of the saved study set
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Overall deadline in seconds (overrides QTB_GENERATION_TIMEOUT_SECS)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Number of flashcards
    #[arg(long, default_value = "10")]
    flashcards: usize,

    /// Number of quiz questions
    #[arg(long, default_value = "5")]
    questions: usize,

    /// Print the result without saving it
    #[arg(long)]
    no_save: bool,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct AgentArgs {
    /// Topic to study
    #[arg(required = true)]
    topic: String,

    /// Owner of the saved study set
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Invocation timeout in seconds (overrides QTB_AGENT_TIMEOUT_SECS)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Number of flashcards
    #[arg(long, default_value = "10")]
    flashcards: usize,

    /// Number of quiz questions
    #[arg(long, default_value = "5")]
    questions: usize,

    /// Tell the agent the summary is optional
    #[arg(long)]
    no_summary: bool,

    /// Print the result without saving it
    #[arg(long)]
    no_save: bool,

    /// Output format (text|json); json prints the raw agent result
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    query: String,

    /// Limit results
    #[arg(short, long, default_value = "20")]
    limit: usize,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// URL to scrape
    #[arg(required = true)]
    url: String,
}

#[derive(Args, Debug)]
struct SynopticArgs {
    /// Topics to connect
    #[arg(required = true, num_args = 1..)]
    topics: Vec<String>,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Owner of the study sets
    #[arg(short, long, default_value = "local")]
    user: String,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Study set id
    #[arg(required = true)]
    id: String,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Study set id
    #[arg(required = true)]
    id: String,

    /// Export format (csv|json); csv exports the flashcards
    #[arg(short, long, default_value = "csv", value_parser = ["csv", "json"])]
    format: String,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RegenerateQuizArgs {
    /// Study set id
    #[arg(required = true)]
    id: String,

    /// Number of quiz questions
    #[arg(long, default_value = "5")]
    questions: usize,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    /// Study set id
    #[arg(required = true)]
    id: String,
}

#[derive(Args, Debug)]
struct ActionArgs {
    /// User the callback acts for
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Request JSON file; stdin when absent
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _otel: OtelGuard = telemetry::init_tracing_subscriber();

    let mut config = AppConfig::from_env()?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    match cli.command {
        Some(Commands::Generate(args)) => generate_command(&config, args).await?,
        Some(Commands::Agent(args)) => agent_command(&config, args).await?,
        Some(Commands::Search(args)) => search_command(&config, args).await?,
        Some(Commands::Scrape(args)) => scrape_command(args).await?,
        Some(Commands::Synoptic(args)) => synoptic_command(&config, args).await?,
        Some(Commands::List(args)) => list_command(&config, args).await?,
        Some(Commands::Show(args)) => show_command(&config, args).await?,
        Some(Commands::Export(args)) => export_command(&config, args).await?,
        Some(Commands::RegenerateQuiz(args)) => regenerate_quiz_command(&config, args).await?,
        Some(Commands::Delete(args)) => delete_command(&config, args).await?,
        Some(Commands::Action(args)) => action_command(&config, args).await?,
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["quizthebest", "--help"]);
        }
    }

    Ok(())
}

/// Attach the client-facing cause code to a library error
fn classified(err: impl Into<quizthebest::Error>) -> anyhow::Error {
    let err = err.into();
    anyhow!("[{}] {}", err.kind().code(), err)
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

fn build_search(config: &AppConfig) -> anyhow::Result<SearchOrchestrator<SerpApiClient, Scraper>> {
    Ok(SearchOrchestrator::new(
        SerpApiClient::new(config.serpapi_key.clone()),
        Scraper::new(ScraperConfig::default())?,
    ))
}

async fn open_repository(config: &AppConfig) -> anyhow::Result<StudySetRepository<LibsqlStore>> {
    let store = LibsqlStore::open(&config.database_path)
        .await
        .map_err(classified)?;
    Ok(StudySetRepository::new(store))
}

async fn find_study_set(
    repository: &StudySetRepository<LibsqlStore>,
    id: &str,
) -> anyhow::Result<StudySet> {
    repository
        .get_study_set(id)
        .await
        .map_err(classified)?
        .ok_or_else(|| anyhow!("[NOT_FOUND] Study set not found: {id}"))
}

fn print_usage(usage: &UsageLedger) {
    let totals = usage.total();
    eprintln!(
        "Tokens used: {} ({} in, {} out)",
        totals.total_tokens, totals.input_tokens, totals.output_tokens
    );
}

/// Save (unless told not to) and print generated material
async fn finish_materials(
    config: &AppConfig,
    user: &str,
    topic: &str,
    materials: GeneratedMaterials,
    save: bool,
    format: &str,
) -> anyhow::Result<()> {
    let study_set = if save {
        let repository = open_repository(config).await?;
        let id = repository
            .create_study_set(user, topic, &materials)
            .await
            .map_err(classified)?;
        repository
            .create_topic(user, topic, Some(&id))
            .await
            .map_err(classified)?;
        find_study_set(&repository, &id).await?
    } else {
        let now = chrono::Utc::now().to_rfc3339();
        StudySet {
            id: "unsaved".to_string(),
            user_id: user.to_string(),
            topic: topic.to_string(),
            summary: materials.summary,
            flashcards: materials.flashcards,
            quiz: materials.quiz,
            created_at: now.clone(),
            updated_at: now,
        }
    };

    match format {
        "json" => println!("{}", export_json(&study_set)?),
        _ => {
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            render::render_study_set(&mut stdout, &study_set)?;
            if save {
                println!("\nSaved study set {}", study_set.id);
            }
        }
    }
    Ok(())
}

#[instrument(skip(config))]
async fn generate_command(config: &AppConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let usage = Arc::new(UsageLedger::new());
    let model = gemini_from_config(config, usage.clone()).map_err(classified)?;
    let pipeline = GenerationOrchestrator::new(model, build_search(config)?);

    let options = GenerationOptions::builder()
        .timeout(
            args.timeout
                .map(Duration::from_secs)
                .unwrap_or(config.generation_timeout),
        )
        .flashcard_count(args.flashcards)
        .quiz_count(args.questions)
        .build();

    let progress = spinner(format!("Generating study set for {}...", args.topic))?;
    let result = pipeline.generate(&args.topic, &options).await;
    progress.finish_and_clear();
    let materials = result.map_err(classified)?;
    print_usage(&usage);

    let topic = sanitize(&args.topic);
    finish_materials(config, &args.user, &topic, materials, !args.no_save, &args.format).await
}

#[instrument(skip(config))]
async fn agent_command(config: &AppConfig, args: AgentArgs) -> anyhow::Result<()> {
    let usage = Arc::new(UsageLedger::new());
    // The agent client records the run's usage itself
    let model = gemini_from_config(config, Arc::new(UsageLedger::new())).map_err(classified)?;
    let client = AgentClient::new(
        ModelAgentRuntime::new(model),
        AgentInvocationOptions::from_config(config),
        usage.clone(),
    );
    let orchestrator = AgentOrchestrator::new(client);

    let options = AgentGenerationOptions {
        include_summary: !args.no_summary,
        flashcard_count: args.flashcards,
        quiz_question_count: args.questions,
        timeout: args
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(config.agent_timeout),
    };

    let progress = spinner(format!("Asking the agent about {}...", args.topic))?;
    let result = orchestrator.generate_study_set(&args.topic, &options).await;
    progress.finish_and_clear();
    let result = result.map_err(classified)?;
    print_usage(&usage);

    if args.format == "json" && args.no_save {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let materials = into_materials(result, &options).map_err(classified)?;
    let topic = sanitize(&args.topic);
    finish_materials(config, &args.user, &topic, materials, !args.no_save, &args.format).await
}

#[instrument(skip(config))]
async fn search_command(config: &AppConfig, args: SearchArgs) -> anyhow::Result<()> {
    let search = build_search(config)?;

    let progress = spinner(format!("Searching for {}...", args.query))?;
    let results = search.search(&args.query).await;
    progress.finish_and_clear();
    let mut results = results.map_err(classified)?;
    results.truncate(args.limit);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&results)?),
        _ => {
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            render::render_search_results(&mut stdout, &results)?;
        }
    }
    Ok(())
}

#[instrument]
async fn scrape_command(args: ScrapeArgs) -> anyhow::Result<()> {
    use quizthebest::crawler::PageScraper;

    let scraper = Scraper::new(ScraperConfig::default()).map_err(classified)?;
    let page = scraper
        .scrape(&args.url)
        .await
        .ok_or_else(|| anyhow!("No usable content scraped from {}", args.url))?;

    println!("Title: {}", page.title);
    println!("Source: {} (priority {})", page.source, page.priority);
    println!("Length: {} characters", page.content.chars().count());
    println!();
    println!("{}", page.content);
    Ok(())
}

#[instrument(skip(config))]
async fn synoptic_command(config: &AppConfig, args: SynopticArgs) -> anyhow::Result<()> {
    let usage = Arc::new(UsageLedger::new());
    let model = gemini_from_config(config, usage.clone()).map_err(classified)?;
    let pipeline = GenerationOrchestrator::new(model, build_search(config)?);

    let progress = spinner(format!("Connecting {} topics...", args.topics.len()))?;
    let summary = pipeline.synoptic(&args.topics).await;
    progress.finish_and_clear();
    let summary = summary.map_err(classified)?;
    print_usage(&usage);

    println!("{summary}");
    Ok(())
}

#[instrument(skip(config))]
async fn list_command(config: &AppConfig, args: ListArgs) -> anyhow::Result<()> {
    let repository = open_repository(config).await?;
    let sets = repository
        .list_for_user(&args.user)
        .await
        .map_err(classified)?;

    println!("Study sets for {}: {}", args.user, sets.len());
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for set in &sets {
        render::render_study_set_line(&mut stdout, set)?;
    }
    Ok(())
}

#[instrument(skip(config))]
async fn show_command(config: &AppConfig, args: ShowArgs) -> anyhow::Result<()> {
    let repository = open_repository(config).await?;
    let study_set = find_study_set(&repository, &args.id).await?;

    match args.format.as_str() {
        "json" => println!("{}", export_json(&study_set)?),
        _ => {
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            render::render_study_set(&mut stdout, &study_set)?;
        }
    }
    Ok(())
}

#[instrument(skip(config))]
async fn export_command(config: &AppConfig, args: ExportArgs) -> anyhow::Result<()> {
    let repository = open_repository(config).await?;
    let study_set = find_study_set(&repository, &args.id).await?;

    let rendered = match args.format.as_str() {
        "json" => export_json(&study_set)?,
        _ => export_csv(&study_set.flashcards),
    };

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, rendered).await?;
            println!("Exported {} to {}", study_set.id, path.display());
        }
        None => {
            let mut stdout = std::io::stdout();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[instrument(skip(config))]
async fn regenerate_quiz_command(config: &AppConfig, args: RegenerateQuizArgs) -> anyhow::Result<()> {
    let usage = Arc::new(UsageLedger::new());
    let model = gemini_from_config(config, usage.clone()).map_err(classified)?;
    let repository = open_repository(config).await?;

    let progress = spinner(format!("Regenerating quiz for {}...", args.id))?;
    let quiz = repository.regenerate_quiz(&model, &args.id, args.questions).await;
    progress.finish_and_clear();
    let quiz = quiz.map_err(classified)?;
    print_usage(&usage);

    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    render::render_quiz(&mut stdout, &quiz)?;
    Ok(())
}

#[instrument(skip(config))]
async fn delete_command(config: &AppConfig, args: DeleteArgs) -> anyhow::Result<()> {
    let repository = open_repository(config).await?;
    if repository.delete(&args.id).await.map_err(classified)? {
        println!("Deleted study set {}", args.id);
        Ok(())
    } else {
        Err(anyhow!("[NOT_FOUND] Study set not found: {}", args.id))
    }
}

#[instrument(skip(config))]
async fn action_command(config: &AppConfig, args: ActionArgs) -> anyhow::Result<()> {
    let raw = match &args.input {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            raw
        }
    };
    let request: ActionGroupRequest = serde_json::from_str(&raw)?;

    let handler = ActionGroupHandler::new(build_search(config)?, open_repository(config).await?);
    let response = handler.handle(&request, &args.user).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
