use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use dialoguer::Input;

use services::{AuthFlowService, CommandOutcome, Pacing, UploadSource};
use transport::{ClientConfig, VerificationApi, VerificationClient};
use veriq_core::model::{AuthStatus, Phase, Session, SessionId, Speaker};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTimeout { raw: String },
    ConflictingSources,
    MissingSessionId,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTimeout { raw } => {
                write!(f, "invalid --timeout-secs value: {raw}")
            }
            ArgsError::ConflictingSources => {
                write!(f, "--csv and --sample are mutually exclusive")
            }
            ArgsError::MissingSessionId => write!(f, "status requires --session-id <id>"),
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
    eprintln!("  cargo run -p app -- chat   [--csv <path> | --sample] [--api-base <url>] [--fast]");
    eprintln!("  cargo run -p app -- health [--api-base <url>]");
    eprintln!("  cargo run -p app -- status --session-id <id> [--api-base <url>]");
    eprintln!();
    eprintln!("Defaults for chat:");
    eprintln!("  --sample (the bundled 44-transaction dataset)");
    eprintln!();
    eprintln!("In the chat: /retry, /status, /reset, /quit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VERIQ_API_BASE_URL, VERIQ_API_TIMEOUT_SECS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Chat,
    Health,
    Status,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "chat" => Some(Self::Chat),
            "health" => Some(Self::Health),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

struct Args {
    config: ClientConfig,
    csv: Option<PathBuf>,
    fast: bool,
    session_id: Option<SessionId>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut config = ClientConfig::from_env();
        let mut csv: Option<PathBuf> = None;
        let mut sample = false;
        let mut fast = false;
        let mut session_id = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api-base" => {
                    config.base_url = require_value(args, "--api-base")?;
                }
                "--timeout-secs" => {
                    let value = require_value(args, "--timeout-secs")?;
                    let secs: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTimeout { raw: value.clone() })?;
                    config.timeout = Duration::from_secs(secs);
                }
                "--csv" => {
                    csv = Some(PathBuf::from(require_value(args, "--csv")?));
                }
                "--sample" => sample = true,
                "--fast" => fast = true,
                "--session-id" => {
                    session_id = Some(SessionId::new(require_value(args, "--session-id")?));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if csv.is_some() && sample {
            return Err(ArgsError::ConflictingSources);
        }

        Ok(Self {
            config,
            csv,
            fast,
            session_id,
        })
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: the chat when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Chat,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Chat,
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
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Resolve the dataset up front so a bad path fails before any chat output.
    let source = match &args.csv {
        Some(path) => UploadSource::from_path(path)?,
        None => UploadSource::Sample,
    };

    let client = VerificationClient::new(args.config.clone())?;

    match cmd {
        Command::Chat => {
            let pacing = if args.fast {
                Pacing::Immediate
            } else {
                Pacing::Conversational
            };
            let flow = AuthFlowService::new(Arc::new(client)).with_pacing(pacing);
            chat(flow, source).await
        }
        Command::Health => {
            match client.health().await {
                Ok(()) => println!("{} verification service is reachable", "ok".green().bold()),
                Err(err) => {
                    println!("{} {err}", "unreachable".red().bold());
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Command::Status => {
            let session_id = args.session_id.ok_or(ArgsError::MissingSessionId)?;
            let report = client.session_status(&session_id).await?;
            println!(
                "session {session_id}: {}/{} correct, status {}",
                report.questions_correct, report.questions_asked, report.status
            );
            Ok(())
        }
    }
}

/// Prints transcript entries appended since `from`, returning the new
/// high-water mark. User entries are skipped (the prompt already echoed
/// them) and placeholders never reach the terminal.
fn render_from(session: &Session, from: usize) -> usize {
    for message in &session.transcript()[from..] {
        if message.is_placeholder() || message.speaker() == Speaker::User {
            continue;
        }
        if let Some(meta) = message.meta() {
            if let (Some(n), Some(total)) = (meta.question_number, meta.total_questions) {
                println!("{}", format!("[question {n}/{total}]").dimmed());
            }
        }
        println!("{} {}", "bot>".cyan().bold(), message.text());
    }
    session.transcript().len()
}

fn print_verdict(session: &Session) {
    if let Some(verdict) = session.verdict() {
        let label = match verdict.status {
            AuthStatus::Success => "VERIFIED".green().bold(),
            _ => "NOT VERIFIED".red().bold(),
        };
        println!("{label} (score {:.0}%)", verdict.final_score);
    }
}

async fn chat(
    mut flow: AuthFlowService,
    source: UploadSource,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut printed = render_from(flow.session(), 0);
    let mut verdict_shown = false;

    flow.submit_data(source.clone()).await;
    printed = render_from(flow.session(), printed);
    if flow.session().phase() == Phase::Uploading {
        println!("{}", "upload failed; /retry to try again or /quit".dimmed());
    }

    loop {
        let line: String = Input::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()?;
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/q" => return Ok(()),
            "/reset" => {
                flow.reset();
                verdict_shown = false;
                printed = render_from(flow.session(), 0);
                continue;
            }
            "/retry" => {
                if flow.submit_data(source.clone()).await == CommandOutcome::Ignored {
                    println!("{}", "nothing to retry right now".dimmed());
                    continue;
                }
            }
            "/status" => {
                match flow.session_report().await {
                    Some(Ok(report)) => println!(
                        "{} {}/{} correct, status {}",
                        "status:".dimmed(),
                        report.questions_correct,
                        report.questions_asked,
                        report.status
                    ),
                    Some(Err(err)) => println!("{} {err}", "status:".dimmed()),
                    None => println!("{}", "status: no session yet".dimmed()),
                }
                continue;
            }
            answer => {
                if flow.submit_answer(answer).await == CommandOutcome::Ignored {
                    let hint = if flow.session().phase() == Phase::Result {
                        "verification is finished; /reset to start over or /quit"
                    } else {
                        "no question is waiting for an answer right now"
                    };
                    println!("{}", hint.dimmed());
                    continue;
                }
            }
        }

        printed = render_from(flow.session(), printed);
        if flow.session().phase() == Phase::Result && !verdict_shown {
            print_verdict(flow.session());
            verdict_shown = true;
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
