use std::fmt;
use std::path::PathBuf;

use dex_core::model::{ProgressStats, UserRef};
use services::{AppServices, Clock, DexConfig, QuizSession, SyncAction};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidRounds { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidRounds { raw } => write!(f, "invalid --rounds value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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
    eprintln!("  cargo run -p app -- quiz   [options] [--rounds <n>]");
    eprintln!("  cargo run -p app -- status [options]");
    eprintln!("  cargo run -p app -- sync   [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         Local progress cache (default: sqlite://doggydex.sqlite3)");
    eprintln!("  --catalog <path>          Breed catalog JSON (default: built-in catalog)");
    eprintln!("  --remote <url>            Progress document service base URL");
    eprintln!("  --token <token>           Bearer token for the document service");
    eprintln!("  --user <id>               Signed-in user id (omit to stay local-only)");
    eprintln!("  --email <email>           Signed-in user email, used when no id is given");
    eprintln!("  --rounds <n>              Questions per quiz (default: 5)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DOGGYDEX_DB_URL, DOGGYDEX_CATALOG, DOGGYDEX_REMOTE_URL, DOGGYDEX_REMOTE_TOKEN");
    eprintln!("  RUST_LOG (default: info)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Status,
    Sync,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "status" => Some(Self::Status),
            "sync" => Some(Self::Sync),
            _ => None,
        }
    }
}

struct Args {
    config: DexConfig,
    user: Option<UserRef>,
    rounds: u32,
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = DexConfig::from_env()?;
        config.db_url = normalize_sqlite_url(config.db_url);
        let mut uid: Option<String> = None;
        let mut email: Option<String> = None;
        let mut remote_url: Option<String> = None;
        let mut token: Option<String> = None;
        let mut rounds = 5;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value }.into());
                    }
                    config.db_url = normalize_sqlite_url(value);
                }
                "--catalog" => {
                    config.catalog_path = Some(PathBuf::from(require_value(args, "--catalog")?));
                }
                "--remote" => remote_url = Some(require_value(args, "--remote")?),
                "--token" => token = Some(require_value(args, "--token")?),
                "--user" => uid = Some(require_value(args, "--user")?),
                "--email" => email = Some(require_value(args, "--email")?),
                "--rounds" => {
                    let value = require_value(args, "--rounds")?;
                    rounds = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidRounds { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg).into()),
            }
        }

        if let Some(url) = remote_url {
            let token = token.or_else(|| config.remote.as_ref().and_then(|r| r.token.clone()));
            config.set_remote(&url, token)?;
        } else if let (Some(token), Some(remote)) = (token, config.remote.as_mut()) {
            remote.token = Some(token);
        }

        let user = (uid.is_some() || email.is_some()).then(|| UserRef {
            uid,
            id: None,
            email,
        });

        Ok(Self {
            config,
            user,
            rounds,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
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
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

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

fn print_stats(stats: &ProgressStats) {
    println!(
        "DoggyDex: {}/{} coats, {}/{} breed badges",
        stats.coats_unlocked, stats.total_coats, stats.badges_earned, stats.total_breeds
    );
    if stats.is_complete() {
        println!("Every coat collected!");
    }
}

async fn run_quiz(
    services: &AppServices,
    rounds: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let quiz = services.quiz();
    let mut session = quiz.start()?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    for round in 0..rounds {
        if round > 0 {
            quiz.advance(&mut session)?;
        }
        if !ask(&quiz, &mut session, &mut input).await? {
            break;
        }
    }

    println!();
    println!("Score: {}/{}", session.score(), session.answered());
    print_stats(&services.collection().stats());
    Ok(())
}

/// Show the current question and read picks until one counts. Returns
/// `false` when stdin is closed.
async fn ask(
    quiz: &services::QuizService,
    session: &mut QuizSession,
    input: &mut Lines<BufReader<Stdin>>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let question = session.question();
    let len = question.candidates().len();
    println!();
    println!(
        "Question {}: which photo shows a {}?",
        session.question_index() + 1,
        question.prompt_breed()
    );
    for (i, candidate) in question.candidates().iter().enumerate() {
        println!("  {}) {}", i + 1, candidate.image());
    }

    loop {
        let Some(line) = input.next_line().await? else {
            return Ok(false);
        };
        let Some(index) = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|choice| choice.checked_sub(1))
        else {
            println!("Enter a number between 1 and {len}.");
            continue;
        };

        let feedback = match quiz.pick(session, index).await {
            Ok(Some(feedback)) => feedback,
            Ok(None) => return Ok(true),
            Err(services::QuizError::InvalidChoice { len, .. }) => {
                println!("Enter a number between 1 and {len}.");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        if feedback.is_correct() {
            println!("Correct!");
        } else {
            println!("Wrong: it was {}", feedback.target.breed());
        }
        if let dex_core::collection::UnlockResult::Unlocked(variant) = &feedback.outcome.unlock {
            println!("New coat unlocked: {} ({})", variant.breed(), variant.coat());
        }
        if let dex_core::collection::BadgeResult::Earned(breed) = &feedback.outcome.badge {
            println!("Breed badge earned: {breed}");
        }
        return Ok(true);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: start a quiz when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Quiz,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Quiz,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.config.db_url)?;
    let services = AppServices::from_config(&parsed.config, Clock::system()).await?;
    let sync = services.sync();

    let report = sync.reconcile(parsed.user.as_ref()).await;
    info!(action = ?report.action, "progress loaded");
    if let Some(notice) = &report.notice {
        eprintln!("{notice}");
    }

    match cmd {
        Command::Quiz => run_quiz(&services, parsed.rounds.max(1)).await,
        Command::Status => {
            print_stats(&services.collection().stats());
            let snapshot = sync.current();
            for breed in snapshot.progress.badges.iter() {
                println!("  badge: {breed}");
            }
            match snapshot.last_synced_at {
                Some(at) => println!("Last synced: {}", at.to_rfc3339()),
                None => println!("Not synced"),
            }
            Ok(())
        }
        Command::Sync => {
            let message = match report.action {
                SyncAction::RemoteAdopted => "adopted cloud progress",
                SyncAction::LocalPushed => "uploaded device progress",
                SyncAction::Unchanged => "already in sync",
                SyncAction::LocalOnly | SyncAction::Superseded => "not synced",
            };
            println!("{message}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
