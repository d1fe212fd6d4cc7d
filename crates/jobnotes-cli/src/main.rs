mod config;
mod schedule;

use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use chrono::Local;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use env_logger::{Env, Target};
use jobnotes_harvest::{
    BatchReport, Coordinator, DedupLedger, DetailFetcher, OnError, PostingId, VocabularyStore,
};
use jobnotes_notes::{render_note, NoteStore};
use jobnotes_site::{DetailClient, SearchListing};

use crate::config::AppConfig;

const DEFAULT_LOG_FILTER: &str =
    "jobnotes_harvest=info,jobnotes_notes=info,jobnotes_site=info,jobnotes=info";

/// 104 job bank harvester writing linked Markdown notes
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
    /// Optional yaml configuration file
    #[arg(env = "JOBNOTES_CONFIG", long, short, global = true)]
    pub config: Option<PathBuf>,
    /// When quiet no logs are outputted
    #[arg(long, short, global = true)]
    pub quiet: bool,
    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    /// Harvest every keyword once
    #[command(name = "run")]
    Run(HarvestArgs),
    /// Harvest every keyword each day at the configured time
    #[command(name = "schedule")]
    Schedule(HarvestArgs),
    /// Fetch a single posting and print its note to stdout
    #[command(name = "fetch")]
    Fetch(FetchArgs),
    /// Link known terms in a text file (or stdin) and print it
    #[command(name = "annotate")]
    Annotate(AnnotateArgs),
    #[command(hide = true)]
    Completion,
}

#[derive(Debug, Default, clap::Args)]
pub struct HarvestArgs {
    /// Override the searched keywords
    #[arg(long = "keyword", short)]
    pub keywords: Vec<String>,
    /// Override the number of postings to collect per keyword
    #[arg(long)]
    pub target: Option<usize>,
    /// Override the maximum number of result pages per keyword
    #[arg(long)]
    pub max_pages: Option<usize>,
    /// Override the notes root directory
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,
    /// Override the maximum concurrent detail fetches
    #[arg(long)]
    pub concurrent_fetches: Option<NonZeroUsize>,
    /// Ignore notes already on disk
    #[arg(long)]
    pub no_dedup: bool,
    /// Override detail fetch error handling strategy
    #[arg(value_enum, long)]
    pub on_fetch_error: Option<OnError>,
    /// Override keyword error handling strategy
    #[arg(value_enum, long)]
    pub on_keyword_error: Option<OnError>,
}

#[derive(Debug, clap::Args)]
pub struct FetchArgs {
    /// Posting id, as found in `https://www.104.com.tw/job/<ID>`
    pub id: String,
}

#[derive(Debug, clap::Args)]
pub struct AnnotateArgs {
    /// Text file to annotate, stdin when missing
    pub file: Option<PathBuf>,
}

impl TryFrom<&Args> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let mut conf = match &args.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        if let SubCommand::Run(overrides) | SubCommand::Schedule(overrides) = &args.cmd {
            if !overrides.keywords.is_empty() {
                conf.keywords = overrides.keywords.clone();
            }
            if let Some(target) = overrides.target {
                conf.harvest.target_per_keyword = target;
            }
            if let Some(max_pages) = overrides.max_pages {
                conf.harvest.max_pages = max_pages;
            }
            if let Some(output_dir) = &overrides.output_dir {
                conf.output_dir = output_dir.clone();
            }
            if let Some(concurrent_fetches) = overrides.concurrent_fetches {
                conf.harvest.concurrent_fetches = concurrent_fetches;
            }
            if overrides.no_dedup {
                conf.harvest.dedup = false;
            }
            if let Some(on_fetch_error) = overrides.on_fetch_error {
                conf.harvest.on_fetch_error = on_fetch_error;
            }
            if let Some(on_keyword_error) = overrides.on_keyword_error {
                conf.harvest.on_keyword_error = on_keyword_error;
            }
        }
        conf.validate()?;
        Ok(conf)
    }
}

fn init_logging(args: &Args) -> anyhow::Result<()> {
    if args.quiet {
        return Ok(());
    }
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_FILTER));
    if let Some(path) = &args.log_file {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.try_init()?;
    Ok(())
}

/// One batch over every configured keyword, notes are written as they come.
pub async fn harvest(conf: &AppConfig) -> anyhow::Result<BatchReport> {
    log::info!("Keywords: {}", conf.keywords.join(", "));
    log::info!(
        "Target per keyword: {}, deduplication: {}",
        conf.harvest.target_per_keyword,
        if conf.harvest.dedup { "on" } else { "off" }
    );

    let mut store = NoteStore::open(conf.output_dir.clone());
    let ledger = if conf.harvest.dedup {
        let known = store.seed_ids();
        log::info!("{} postings already in {}", known.len(), store.root().display());
        DedupLedger::seeded(known)
    } else {
        DedupLedger::new()
    };
    let vocab = VocabularyStore::load(conf.vocabulary_paths());
    let listing = SearchListing::new(conf.site.clone())?;
    let fetcher = DetailClient::new(conf.site.clone())?;

    let mut coordinator =
        Coordinator::new(conf.harvest.clone(), listing, fetcher, ledger, vocab)?;
    let report = coordinator.harvest_all(&conf.keywords, &mut store).await?;
    log::info!("Batch done, {} new postings", report.total_records());
    Ok(report)
}

fn print_report(report: &BatchReport) {
    for keyword in &report.keywords {
        println!("{keyword}");
    }
    println!("Total: {} new postings", report.total_records());
}

pub async fn fetch(conf: &AppConfig, args: FetchArgs) -> anyhow::Result<()> {
    let id = PostingId::new(args.id.trim());
    let fetcher = DetailClient::new(conf.site.clone())?;
    let mut record = fetcher.fetch(&id).await?;
    let mut vocab = VocabularyStore::load(conf.vocabulary_paths());
    vocab.process(&mut record);
    print!("{}", render_note(&record, Local::now())?);
    Ok(())
}

pub fn annotate(conf: &AppConfig, args: AnnotateArgs) -> anyhow::Result<()> {
    let text = match &args.file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let vocab = VocabularyStore::load(conf.vocabulary_paths());
    print!("{}", vocab.annotate(&text));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if matches!(args.cmd, SubCommand::Completion) {
        generate(Shell::Bash, &mut Args::command(), "jobnotes", &mut io::stdout());
        return Ok(());
    }

    init_logging(&args)?;
    let conf = AppConfig::try_from(&args)?;

    match args.cmd {
        SubCommand::Run(_) => {
            let report = harvest(&conf).await?;
            print_report(&report);
            Ok(())
        }
        SubCommand::Schedule(_) => {
            let at = conf.schedule_time()?;
            let conf = &conf;
            schedule::run_daily(at, move || async move {
                let report = harvest(conf).await?;
                print_report(&report);
                Ok(())
            })
            .await
        }
        SubCommand::Fetch(fetch_args) => fetch(&conf, fetch_args).await,
        SubCommand::Annotate(annotate_args) => annotate(&conf, annotate_args),
        SubCommand::Completion => Ok(()),
    }
}
