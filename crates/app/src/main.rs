use std::fmt;

use progress_core::codec::PROGRESS_STORAGE_KEY;
use progress_core::model::{LearningPath, Milestone};
use services::{AppServices, Clock, ProgressService};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidMinutes { raw: String },
    InvalidDbUrl { raw: String },
    InvalidKey { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidMinutes { raw } => write!(f, "invalid minutes value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidKey { raw } => write!(f, "invalid --key value: {raw:?}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [command] [--db <sqlite_url>] [--key <slot>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status                          show totals, streak and achievements (default)");
    eprintln!("  complete-topic <id>             mark a topic complete");
    eprintln!("  complete-case-study <id>        mark a case study complete");
    eprintln!("  add-time <minutes>              add study time");
    eprintln!("  achievements                    list the most recent achievements");
    eprintln!("  path <name> [--topics a,b] [--case-studies c,d]");
    eprintln!("                                  progress through a learning path");
    eprintln!("  export                          print the stored progress as JSON");
    eprintln!("  import <file>                   replace stored progress with an export");
    eprintln!("  reset                           delete all progress");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://progress.sqlite3   (use :memory: for a throwaway store)");
    eprintln!("  --key {PROGRESS_STORAGE_KEY}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PROGRESS_DB_URL, PROGRESS_STORAGE_KEY, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status,
    CompleteTopic(String),
    CompleteCaseStudy(String),
    AddTime(u32),
    Achievements,
    Path {
        name: String,
        topics: Vec<String>,
        case_studies: Vec<String>,
    },
    Export,
    Import(String),
    Reset,
}

#[derive(Debug)]
struct Args {
    db_url: String,
    key: String,
    command: Command,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = std::env::var("PROGRESS_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://progress.sqlite3".into(), normalize_sqlite_url);
        let mut key =
            std::env::var("PROGRESS_STORAGE_KEY").unwrap_or_else(|_| PROGRESS_STORAGE_KEY.into());

        let mut positional = Vec::new();
        let mut topics = Vec::new();
        let mut case_studies = Vec::new();
        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--key" => {
                    let value = require_value(&mut args, "--key")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidKey { raw: value });
                    }
                    key = value;
                }
                "--topics" => topics.extend(split_ids(&require_value(&mut args, "--topics")?)),
                "--case-studies" => {
                    case_studies.extend(split_ids(&require_value(&mut args, "--case-studies")?));
                }
                "--help" | "-h" => return Ok(None),
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match positional.next().as_deref() {
            None | Some("status") => Command::Status,
            Some("complete-topic") => Command::CompleteTopic(
                positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { what: "topic id" })?,
            ),
            Some("complete-case-study") => Command::CompleteCaseStudy(
                positional
                    .next()
                    .ok_or(ArgsError::MissingArgument {
                        what: "case study id",
                    })?,
            ),
            Some("add-time") => {
                let raw = positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { what: "minutes" })?;
                let minutes = raw
                    .parse()
                    .map_err(|_| ArgsError::InvalidMinutes { raw: raw.clone() })?;
                Command::AddTime(minutes)
            }
            Some("achievements") => Command::Achievements,
            Some("path") => Command::Path {
                name: positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { what: "path name" })?,
                topics,
                case_studies,
            },
            Some("export") => Command::Export,
            Some("import") => Command::Import(
                positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { what: "file" })?,
            ),
            Some("reset") => Command::Reset,
            Some(other) => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };
        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Some(Self {
            db_url,
            key,
            command,
        }))
    }
}

fn split_ids(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim().to_string();
    if trimmed == ":memory:" || trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed;
    }

    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn print_status(progress: &ProgressService) {
    let record = progress.get_progress().await;
    let summary = progress.summary(&record);
    println!(
        "completed: {} ({} topics, {} case studies)",
        summary.total_completed, summary.topics_completed, summary.case_studies_completed
    );
    println!("time spent: {}h {}m", summary.hours, summary.minutes);
    println!("current streak: {} day(s)", summary.current_streak);
    println!("learning for {} day(s)", summary.days_since_start);
    for entry in &summary.achievements {
        println!("  * {entry}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    init_tracing();

    let clock = Clock::default_clock();
    let app = if matches!(args.db_url.as_str(), ":memory:" | "sqlite::memory:") {
        tracing::info!("using a throwaway in-memory store");
        AppServices::in_memory(&args.key, clock, None)
    } else {
        prepare_sqlite_file(&args.db_url)?;
        AppServices::new_sqlite(&args.db_url, &args.key, clock, None).await?
    };
    let progress = app.progress();

    match args.command {
        Command::Status => print_status(&progress).await,
        Command::CompleteTopic(id) => {
            progress.mark_topic_completed(&id).await;
            print_status(&progress).await;
        }
        Command::CompleteCaseStudy(id) => {
            progress.mark_case_study_completed(&id).await;
            print_status(&progress).await;
        }
        Command::AddTime(minutes) => {
            progress.add_time_spent(minutes).await;
            print_status(&progress).await;
        }
        Command::Achievements => {
            let record = progress.get_progress().await;
            for entry in progress.achievements(&record) {
                println!("{entry}");
            }
            println!();
            for milestone in Milestone::ALL {
                let mark = if milestone.is_reached(&record) { "x" } else { " " };
                println!("[{mark}] {:<18} {}", milestone.id(), milestone.message());
            }
        }
        Command::Path {
            name,
            topics,
            case_studies,
        } => {
            let path = LearningPath::new(name, topics, case_studies)
                .map_err(progress_core::error::Error::from)?;
            let view = app.bind().await;
            let result = view.path_progress(&path);
            println!(
                "{}: {}/{} ({}%)",
                path.name(),
                result.completed,
                result.total,
                result.percent
            );
        }
        Command::Export => println!("{}", progress.export().await?),
        Command::Import(file) => {
            let raw = std::fs::read_to_string(&file)?;
            let record = progress.import(&raw).await?;
            tracing::info!(
                file = %file,
                completed = record.total_completed(),
                "imported progress"
            );
        }
        Command::Reset => {
            progress.reset_progress().await;
            println!("progress reset");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
