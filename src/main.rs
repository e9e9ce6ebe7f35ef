//! # Scribe CLI
//!
//! Command-line front end for the ingestion pipeline.
//!
//! - `url`: train from a single page
//! - `site`: crawl a site and train from every page, with a progress bar;
//!   Ctrl-C asks the crawl to stop after the current page
//! - `text` / `qa`: add entries by hand
//! - `progress` / `stop`: inspect or cancel a run from another process
//! - `list` / `search`: read the knowledge store
//!
//! Results are printed as JSON on stdout; logs go to stderr (`RUST_LOG`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scribe::crawler::CrawlerConfig;
use scribe::fetcher::FetchConfig;
use scribe::knowledge::{Database, KnowledgeGateway};
use scribe::model::{
    DEFAULT_COMPLETION_MODEL, GeminiClient, GeminiCompletionModel, GeminiEmbeddingModel,
    ModelQuota,
};
use scribe::pipeline::{EntryOptions, Pipeline, PipelineConfig, TrainRequest, TrainResponse};
use scribe::processor::{DetailLevel, ProcessorConfig};
use scribe::progress::{self, RunStateStore, RunToken, SqlRunState};
use serde::Serialize;
use tracing::{info, instrument};

type GeminiPipeline = Pipeline<GeminiCompletionModel, GeminiEmbeddingModel>;

#[derive(Parser)]
#[command(author, version, about = "Teach a knowledge base from web pages and hand-written entries", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Knowledge database path
    #[arg(long, global = true, env = "SCRIBE_DATABASE", default_value = "knowledge.db")]
    database: String,

    /// Completion model used for summaries
    #[arg(long, global = true, default_value = DEFAULT_COMPLETION_MODEL)]
    model: String,

    /// Use the free-tier request quota
    #[arg(long, global = true)]
    free_tier: bool,

    /// Hosted reader endpoint, tried after direct fetches fail
    #[arg(long, global = true, env = "SCRIBE_READER_ENDPOINT")]
    reader_endpoint: Option<String>,

    /// API key for the hosted reader
    #[arg(long, global = true, env = "SCRIBE_READER_API_KEY", hide_env_values = true)]
    reader_api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train from a single URL
    Url(UrlArgs),

    /// Crawl a site and train from every page
    Site(SiteArgs),

    /// Add a titled text entry
    Text(TextArgs),

    /// Add a question and its answer
    Qa(QaArgs),

    /// Show the progress of a run
    Progress(TokenArgs),

    /// Ask a run to stop
    Stop(TokenArgs),

    /// Print all active entries
    List,

    /// Find the entries most relevant to a query
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct Labels {
    /// Category label
    #[arg(short, long)]
    category: Option<String>,

    /// Source label
    #[arg(short, long)]
    source: Option<String>,
}

#[derive(Args, Debug)]
struct UrlArgs {
    /// Page to train from
    url: String,

    /// Summary detail level, 1 (shortest) to 5 (verbatim)
    #[arg(short = 'l', long)]
    detail_level: Option<u8>,

    #[command(flatten)]
    labels: Labels,
}

#[derive(Args, Debug)]
struct SiteArgs {
    /// Seed URL
    url: String,

    /// Link depth, 1 to 5
    #[arg(short, long, default_value = "2")]
    depth: u32,

    /// Maximum number of pages to store
    #[arg(short = 'p', long)]
    max_pages: Option<usize>,

    /// Delay between fetches in milliseconds
    #[arg(short, long, default_value = "500")]
    rate: u64,

    /// Summary detail level, 1 (shortest) to 5 (verbatim)
    #[arg(short = 'l', long)]
    detail_level: Option<u8>,

    #[command(flatten)]
    labels: Labels,
}

#[derive(Args, Debug)]
struct EntryArgs {
    #[command(flatten)]
    labels: Labels,

    /// Author
    #[arg(short, long)]
    author: Option<String>,

    /// Language code
    #[arg(long)]
    language: Option<String>,
}

impl EntryArgs {
    fn into_options(self) -> EntryOptions {
        EntryOptions {
            category: self.labels.category,
            source: self.labels.source,
            author: self.author,
            language: self.language,
        }
    }
}

#[derive(Args, Debug)]
struct TextArgs {
    title: String,
    content: String,

    #[command(flatten)]
    entry: EntryArgs,
}

#[derive(Args, Debug)]
struct QaArgs {
    question: String,
    answer: String,

    #[command(flatten)]
    entry: EntryArgs,
}

#[derive(Args, Debug)]
struct TokenArgs {
    /// Run token printed when the run started
    token: String,
}

#[derive(Args, Debug)]
struct SearchArgs {
    query: String,

    /// Maximum number of results
    #[arg(short, long, default_value = "5")]
    limit: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _telemetry = scribe::telemetry::init_tracing()?;

    match cli.command {
        Commands::Url(args) => url_command(&cli.global, args).await,
        Commands::Site(args) => site_command(&cli.global, args).await,
        Commands::Text(args) => {
            let pipeline = build_pipeline(&cli.global, CrawlerConfig::default()).await?;
            let record = pipeline
                .train_from_text(&args.title, &args.content, &args.entry.into_options())
                .await?;
            print_json(&record)
        }
        Commands::Qa(args) => {
            let pipeline = build_pipeline(&cli.global, CrawlerConfig::default()).await?;
            let record = pipeline
                .train_qa(&args.question, &args.answer, &args.entry.into_options())
                .await?;
            print_json(&record)
        }
        Commands::Progress(args) => {
            let store = run_state(&open_database(&cli.global).await?).await?;
            print_json(&progress::poll_progress(&store, &RunToken::from(args.token.as_str())).await)
        }
        Commands::Stop(args) => {
            let store = run_state(&open_database(&cli.global).await?).await?;
            print_json(&progress::request_stop(&store, &RunToken::from(args.token.as_str())).await)
        }
        Commands::List => {
            let gateway = gateway(&cli.global, None).await?;
            println!("{}", gateway.list_active().await?);
            Ok(())
        }
        Commands::Search(args) => {
            let embedder = GeminiClient::gemini_from_env(&cli.global.model, quota(&cli.global))
                .map(|client| client.into_parts().1);
            let gateway = gateway(&cli.global, embedder).await?;
            print_json(&gateway.search_relevant(&args.query, args.limit).await?)
        }
    }
}

fn quota(global: &GlobalArgs) -> ModelQuota {
    if global.free_tier {
        ModelQuota::FREE
    } else {
        ModelQuota::STANDARD
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn detail_level(level: Option<u8>) -> anyhow::Result<Option<DetailLevel>> {
    level
        .map(DetailLevel::new)
        .transpose()
        .context("Invalid detail level")
}

async fn open_database(global: &GlobalArgs) -> anyhow::Result<Database> {
    Database::new_from_path(&global.database)
        .await
        .with_context(|| format!("Failed to open database {}", global.database))
}

async fn run_state(db: &Database) -> anyhow::Result<SqlRunState> {
    Ok(SqlRunState::new(db.connection().clone()).await?)
}

async fn gateway(
    global: &GlobalArgs,
    embedder: Option<GeminiEmbeddingModel>,
) -> anyhow::Result<KnowledgeGateway<GeminiEmbeddingModel>> {
    Ok(KnowledgeGateway::new(open_database(global).await?, embedder))
}

async fn build_pipeline(global: &GlobalArgs, crawler: CrawlerConfig) -> anyhow::Result<GeminiPipeline> {
    let db = open_database(global).await?;
    let run_state: Arc<dyn RunStateStore> = Arc::new(run_state(&db).await?);

    let (completion, embedder) = match GeminiClient::gemini_from_env(&global.model, quota(global)) {
        Some(client) => {
            let (completion, embedder) = client.into_parts();
            (Some(completion), Some(embedder))
        }
        None => (None, None),
    };

    let config = PipelineConfig::builder()
        .fetch(
            FetchConfig::builder()
                .reader(global.reader_endpoint.clone(), global.reader_api_key.clone())
                .build(),
        )
        .crawler(crawler)
        .processor(ProcessorConfig::builder().llm_model(global.model.clone()).build())
        .build();

    let knowledge = KnowledgeGateway::new(db, embedder);
    Ok(Pipeline::new(config, completion, knowledge, run_state)?)
}

#[instrument(skip(global))]
async fn url_command(global: &GlobalArgs, args: UrlArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(global, CrawlerConfig::default()).await?;

    let mut request = TrainRequest::single(&args.url);
    request.category = args.labels.category;
    request.source = args.labels.source;
    request.detail_level = detail_level(args.detail_level)?;

    let response = pipeline.train(&request).await?;
    print_json(&response)
}

#[instrument(skip(global))]
async fn site_command(global: &GlobalArgs, args: SiteArgs) -> anyhow::Result<()> {
    let crawler = CrawlerConfig::builder().rate_limit_ms(args.rate).build();
    let pipeline = build_pipeline(global, crawler).await?;

    let mut request = TrainRequest::site(&args.url, args.depth);
    request.max_pages = args.max_pages;
    request.category = args.labels.category;
    request.source = args.labels.source;
    request.detail_level = detail_level(args.detail_level)?;

    let handle = pipeline.start_run().await;
    eprintln!("Run token: {}", handle.token());

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}")?
            .progress_chars("=> "),
    );
    bar.set_message(args.url.clone());

    let train = pipeline.train_with_run(&request, &handle);
    tokio::pin!(train);
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut stop_sent = false;

    let result: anyhow::Result<TrainResponse> = loop {
        tokio::select! {
            result = &mut train => break result.map_err(Into::into),
            _ = ticker.tick() => {
                let report = pipeline.progress(handle.token()).await;
                bar.set_position(report.percent as u64);
            }
            _ = tokio::signal::ctrl_c(), if !stop_sent => {
                stop_sent = true;
                bar.set_message("stopping after the current page");
                pipeline.stop(handle.token()).await;
                info!(token = %handle.token(), "Stop requested from terminal");
            }
        }
    };

    bar.finish_and_clear();
    let response = result?;
    eprintln!("Trained {} pages", response.trained_pages);
    print_json(&response)
}
