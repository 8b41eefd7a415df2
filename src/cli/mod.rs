//! # CLI Module
//!
//! Command-line front-end for the card ingest engine.
//!
//! ## Usage
//! ```bash
//! # Copy one card
//! card-ingest card --source /media/CARD --archive /mnt/archive --proxy /mnt/ssd \
//!     --client Iriya --project "Yom HaAtsmaut" --card 2
//!
//! # Walk through a three-card job, prompting for each card
//! card-ingest session --cards 3 --client Iriya --project "Yom HaAtsmaut"
//!
//! # Browse the ledger
//! card-ingest ledger --filter iriya --output json
//!
//! # Record a job that was copied by hand
//! card-ingest ledger add --client Bakery --project Launch --at "2026-01-12 16:30" --cards 2
//! ```

use card_ingest::config::{AppPaths, AppSettings};
use card_ingest::core::copier::{CopierKind, CopyOptions};
use card_ingest::core::drives::{list_drives, list_removable_drives, DriveInfo};
use card_ingest::core::ingest::{CardIngest, IngestRequest, IngestResult, IngestWorker};
use card_ingest::core::job::{safe_project_folder, JobConfig, JobMode};
use card_ingest::core::layout::normalize_root;
use card_ingest::core::ledger::{
    append_manual_row, filter_entries, parse_manual_timestamp, read_ledger, LedgerEntry,
    LEDGER_HEADERS,
};
use card_ingest::core::registry::{
    existing_project, load_recent_projects, record_project, ProjectSummary,
};
use card_ingest::core::session::{IngestSession, SessionPhase};
use card_ingest::core::space::format_gb;
use card_ingest::error::{IngestError, LayoutError, Result};
use card_ingest::events::{Event, EventChannel, IngestEvent, SessionEvent};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Card Ingest - copy camera cards to archive and proxy drives at once
#[derive(Parser, Debug)]
#[command(name = "card-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ledger CSV path
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Settings JSON path
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Recent projects JSON path
    #[arg(long, global = true)]
    projects: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy one card to both destinations
    Card {
        /// Card root, e.g. G:\ or /media/SONY_CARD
        #[arg(short, long)]
        source: PathBuf,

        /// Card number (1 for SD1)
        #[arg(long, default_value = "1")]
        card: u32,

        #[command(flatten)]
        target: TargetArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Run a multi-card job interactively and record it in the ledger
    Session {
        /// Number of cards in the job
        #[arg(long, default_value = "1")]
        cards: u32,

        /// Add cards to an existing project
        #[arg(long)]
        existing: bool,

        /// Record that originals are NOT kept on the proxy drive
        #[arg(long)]
        no_keep_originals: bool,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// List mounted drives
    Drives {
        /// Only card readers and other removable volumes
        #[arg(long)]
        removable: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Show past sessions
    Ledger {
        #[command(subcommand)]
        action: Option<LedgerAction>,

        /// Case-insensitive text to match in any column
        #[arg(short, long)]
        filter: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// List recent projects
    Projects {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
enum LedgerAction {
    /// Record a job that was copied outside this tool
    Add {
        /// Client name
        #[arg(long)]
        client: String,

        /// Project name
        #[arg(long)]
        project: String,

        /// When the job ran, "YYYY-MM-DD HH:MM" or "DD/MM/YY HH:MM" (defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Archive drive as it should read in the ledger
        #[arg(long, default_value = "")]
        archive: String,

        /// Proxy SSD as it should read in the ledger
        #[arg(long, default_value = "")]
        ssd: String,

        /// Number of cards in the job
        #[arg(long, default_value = "1")]
        cards: u32,
    },
}

/// Where a card goes and under which names
#[derive(Args, Debug)]
struct TargetArgs {
    /// Archive drive root (defaults to the last one used)
    #[arg(short, long)]
    archive: Option<PathBuf>,

    /// Proxy SSD root (defaults to the last one used)
    #[arg(short, long)]
    proxy: Option<PathBuf>,

    /// Client name
    #[arg(long)]
    client: String,

    /// Project name
    #[arg(long)]
    project: String,

    /// Studio folder at the top of both drives
    #[arg(long)]
    base: Option<String>,

    /// Date folder, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    date: Option<String>,

    /// Copy backend
    #[arg(long)]
    copier: Option<CopierArg>,

    /// Retries for a locked or failing file
    #[arg(long)]
    retries: Option<u32>,

    /// Parallel file copies per destination
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CopierArg {
    /// robocopy.exe (Windows)
    Robocopy,
    /// Built-in parallel copier
    Native,
}

impl From<CopierArg> for CopierKind {
    fn from(arg: CopierArg) -> Self {
        match arg {
            CopierArg::Robocopy => CopierKind::Robocopy,
            CopierArg::Native => CopierKind::Native,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Destinations and names after falling back to saved settings
struct Target {
    archive: PathBuf,
    proxy: PathBuf,
    client: String,
    project: String,
    base: String,
    date: String,
    copier: CopierKind,
    options: CopyOptions,
}

impl Target {
    fn resolve(args: TargetArgs, settings: &AppSettings) -> Result<Self> {
        let remembered = |value: &str| (!value.is_empty()).then(|| PathBuf::from(value));

        let archive = args
            .archive
            .or_else(|| remembered(&settings.last_archive_root))
            .ok_or_else(|| IngestError::Config("no archive drive given (use --archive)".to_string()))?;
        let proxy = args
            .proxy
            .or_else(|| remembered(&settings.last_proxy_root))
            .ok_or_else(|| IngestError::Config("no proxy drive given (use --proxy)".to_string()))?;

        if normalize_root(&archive) == normalize_root(&proxy) {
            return Err(LayoutError::SameDestination {
                path: normalize_root(&archive),
            }
            .into());
        }

        let mut options = CopyOptions::default();
        if let Some(retries) = args.retries {
            options.retries = retries;
        }
        if let Some(threads) = args.threads {
            if threads == 0 {
                return Err(IngestError::Config("--threads must be at least 1".to_string()));
            }
            options.threads = threads;
        }

        let date = match args.date {
            Some(date) => {
                chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
                    IngestError::Config(format!("date must be YYYY-MM-DD, got {}", date))
                })?;
                date
            }
            None => chrono::Local::now().format("%Y-%m-%d").to_string(),
        };

        Ok(Self {
            archive,
            proxy,
            client: args.client,
            project: args.project,
            base: args.base.unwrap_or_else(|| settings.base_folder_name.clone()),
            date,
            copier: args
                .copier
                .map(CopierKind::from)
                .unwrap_or_else(CopierKind::platform_default),
            options,
        })
    }

    fn ingest(&self) -> Arc<CardIngest> {
        Arc::new(
            CardIngest::builder()
                .copier(self.copier.build())
                .copy_options(self.options.clone())
                .build(),
        )
    }

    fn remember(&self, settings: &mut AppSettings) {
        settings.last_archive_root = self.archive.display().to_string();
        settings.last_proxy_root = self.proxy.display().to_string();
        settings.base_folder_name = self.base.clone();
    }
}

/// Run the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let paths = AppPaths::resolve().with_overrides(cli.settings, cli.ledger, cli.projects);
    tracing::debug!(?paths, "resolved app paths");

    match cli.command {
        Commands::Card {
            source,
            card,
            target,
            output,
        } => run_card(&paths, source, card, target, output),
        Commands::Session {
            cards,
            existing,
            no_keep_originals,
            target,
        } => run_session(&paths, cards, existing, !no_keep_originals, target),
        Commands::Drives { removable, output } => run_drives(removable, output),
        Commands::Ledger {
            action: Some(LedgerAction::Add {
                client,
                project,
                at,
                archive,
                ssd,
                cards,
            }),
            ..
        } => run_ledger_add(&paths, client, project, at, archive, ssd, cards),
        Commands::Ledger {
            action: None,
            filter,
            output,
        } => run_ledger(&paths, filter, output),
        Commands::Projects { output } => run_projects(&paths, output),
    }
}

fn run_card(
    paths: &AppPaths,
    source: PathBuf,
    card: u32,
    target: TargetArgs,
    output: OutputFormat,
) -> Result<ExitCode> {
    let term = Term::stderr();
    let mut settings = AppSettings::load(&paths.settings);
    let target = Target::resolve(target, &settings)?;

    if matches!(output, OutputFormat::Pretty) {
        print_header(&term);
    }

    let request = IngestRequest {
        source_root: source,
        archive_root: target.archive.clone(),
        proxy_root: target.proxy.clone(),
        base_folder_name: target.base.clone(),
        client_project: safe_project_folder(&target.client, &target.project),
        ingest_date: target.date.clone(),
        card_index: card,
    };

    let outcome = copy_card(target.ingest(), request, matches!(output, OutputFormat::Pretty));

    target.remember(&mut settings);
    if let Err(e) = settings.save(&paths.settings) {
        tracing::warn!(error = %e, "could not save settings");
    }

    match outcome {
        CardOutcome::Finished(result) => {
            match output {
                OutputFormat::Pretty => print_result(&term, &result),
                OutputFormat::Json => print_json(&result)?,
            }
            Ok(if result.ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        CardOutcome::Crashed(message) => Err(IngestError::Interrupted(message)),
    }
}

/// How a background card copy ended
enum CardOutcome {
    Finished(IngestResult),
    Crashed(String),
}

/// Copy one card on a worker thread, showing a spinner while it runs
fn copy_card(ingest: Arc<CardIngest>, request: IngestRequest, show_progress: bool) -> CardOutcome {
    let (sender, receiver) = EventChannel::new();

    let spinner = show_progress.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {elapsed_precise} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    });

    let card_index = request.card_index;
    let worker = IngestWorker::spawn(ingest, request, sender);

    let mut outcome = None;
    for event in receiver.iter() {
        let Event::Ingest(event) = event else {
            continue;
        };
        match event {
            IngestEvent::Started { source, .. } => {
                if let Some(ref pb) = spinner {
                    pb.set_message(format!("SD{}: checking space for {}", card_index, source.display()));
                }
            }
            IngestEvent::SpaceChecked(space) => {
                if let Some(ref pb) = spinner {
                    pb.set_message(format!(
                        "SD{}: {} on card, need {}",
                        card_index,
                        format_gb(space.source_used_bytes),
                        format_gb(space.required_bytes)
                    ));
                }
            }
            IngestEvent::CopyStarted { destination, target, .. } => {
                if let Some(ref pb) = spinner {
                    pb.set_message(format!("SD{}: copying to {} and more", card_index, destination));
                    pb.println(format!(
                        "  {} {} {}",
                        style("→").cyan(),
                        destination,
                        style(target.display()).dim()
                    ));
                }
            }
            IngestEvent::CopyFinished {
                destination,
                exit_code,
            } => {
                if let Some(ref pb) = spinner {
                    let code = exit_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "not started".to_string());
                    pb.println(format!("  {} {} exit={}", style("■").dim(), destination, code));
                }
            }
            IngestEvent::Finished { result } => outcome = Some(CardOutcome::Finished(result)),
            IngestEvent::Crashed { message } => outcome = Some(CardOutcome::Crashed(message)),
        }
    }

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    if worker.join().is_err() {
        return CardOutcome::Crashed(format!("ingest worker for SD{} died", card_index));
    }

    outcome.unwrap_or_else(|| CardOutcome::Crashed(format!("no result for SD{}", card_index)))
}

fn run_session(
    paths: &AppPaths,
    cards: u32,
    existing: bool,
    keep_originals: bool,
    target: TargetArgs,
) -> Result<ExitCode> {
    let term = Term::stderr();
    let mut settings = AppSettings::load(&paths.settings);
    let target = Target::resolve(target, &settings)?;
    print_header(&term);

    let (client_name, project_name) = if existing {
        let known = existing_project(&paths.projects, &target.client, &target.project)?;
        (known.client, known.project)
    } else {
        (target.client.clone(), target.project.clone())
    };

    let job = JobConfig {
        client_name,
        project_name,
        num_cards: cards,
        archive_drive_display: drive_label_for(&target.archive),
        proxy_drive_display: drive_label_for(&target.proxy),
        archive_path: target.archive.clone(),
        proxy_path: target.proxy.clone(),
        keep_originals_on_proxy: keep_originals,
        mode: if existing { JobMode::Existing } else { JobMode::New },
    };

    let (sender, receiver) = EventChannel::new();
    let mut session = IngestSession::new(job, paths.ledger.clone())?
        .with_events(sender)
        .with_base_folder(target.base.clone())
        .with_ingest_date(target.date.clone());
    let ingest = target.ingest();

    target.remember(&mut settings);
    if let Err(e) = settings.save(&paths.settings) {
        tracing::warn!(error = %e, "could not save settings");
    }

    session.start()?;
    term.write_line(&format!(
        "  {} {} / {}, {} card(s), session {}",
        style("Job:").bold(),
        session.job().client_name,
        session.job().project_name,
        cards,
        style(session.id()).dim()
    ))
    .ok();

    loop {
        match session.phase() {
            SessionPhase::WaitingForCard => {
                let index = session.card_index();
                let Some(source) = prompt_source(&term, index, cards)? else {
                    session.cancel()?;
                    term.write_line(&format!("{} Session canceled", style("✗").yellow().bold())).ok();
                    break;
                };

                let request = session.request_for(source)?;
                session.begin_copy()?;
                match copy_card(Arc::clone(&ingest), request, true) {
                    CardOutcome::Finished(result) => {
                        print_result(&term, &result);
                        session.record_result(&result)?;
                    }
                    CardOutcome::Crashed(message) => {
                        term.write_line(&format!("{} {}", style("✗").red().bold(), message)).ok();
                        session.record_crash(&message)?;
                    }
                }
            }
            SessionPhase::Failed => {
                if prompt_retry(&term, session.card_index())? {
                    session.retry()?;
                } else {
                    session.abandon()?;
                    term.write_line(&format!("{} Session abandoned", style("✗").red().bold())).ok();
                    break;
                }
            }
            SessionPhase::Finalizing => {
                session.finalize()?;
                let summary = ProjectSummary::new(
                    session.job().client_name.clone(),
                    session.job().project_name.clone(),
                    target.date.clone(),
                );
                if let Err(e) = record_project(&paths.projects, summary) {
                    tracing::warn!(error = %e, "could not update project registry");
                }
                term.write_line(&format!(
                    "{} All {} card(s) copied to both drives",
                    style("✓").green().bold(),
                    cards
                ))
                .ok();
            }
            SessionPhase::Done | SessionPhase::Idle | SessionPhase::Copying => break,
        }
    }

    let done = session.phase() == SessionPhase::Done;
    drop(session);
    for event in receiver.iter() {
        if let Event::Session(SessionEvent::LedgerWritten { status, path }) = event {
            term.write_line(&format!(
                "  {} {} row written to {}",
                style("Ledger:").dim(),
                status,
                path.display()
            ))
            .ok();
        }
    }

    Ok(if done {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Ask for the next card's path. `None` means the operator wants to stop.
fn prompt_source(term: &Term, index: u32, total: u32) -> Result<Option<PathBuf>> {
    let removable = list_removable_drives();
    if !removable.is_empty() {
        term.write_line(&format!("  {}", style("Removable drives:").dim())).ok();
        for drive in &removable {
            term.write_line(&format!("    {}", drive.display())).ok();
        }
    }

    term.write_str(&format!(
        "{} Insert card SD{} of {} and enter its path (blank to cancel): ",
        style("?").cyan().bold(),
        index,
        total
    ))
    .ok();
    let line = term
        .read_line()
        .map_err(|e| IngestError::Config(format!("cannot read from terminal: {}", e)))?;
    let line = line.trim();

    Ok((!line.is_empty()).then(|| PathBuf::from(line)))
}

fn prompt_retry(term: &Term, index: u32) -> Result<bool> {
    loop {
        term.write_str(&format!(
            "{} SD{} failed. [r]etry or [a]bandon? ",
            style("?").cyan().bold(),
            index
        ))
        .ok();
        let line = term
            .read_line()
            .map_err(|e| IngestError::Config(format!("cannot read from terminal: {}", e)))?;
        match line.trim().to_lowercase().as_str() {
            "r" | "retry" => return Ok(true),
            "a" | "abandon" => return Ok(false),
            _ => continue,
        }
    }
}

/// Label of the mounted drive at `root`, or empty if it is not a drive root
fn drive_label_for(root: &Path) -> String {
    let root = normalize_root(root);
    list_drives()
        .into_iter()
        .find(|drive| normalize_root(&drive.root) == root)
        .map(|drive| drive.display())
        .unwrap_or_default()
}

fn run_drives(removable: bool, output: OutputFormat) -> Result<ExitCode> {
    let drives = if removable {
        list_removable_drives()
    } else {
        list_drives()
    };

    match output {
        OutputFormat::Json => print_json(&drives)?,
        OutputFormat::Pretty => print_drives(&Term::stdout(), &drives),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_drives(term: &Term, drives: &[DriveInfo]) {
    if drives.is_empty() {
        term.write_line(&format!("  {}", style("No drives found").dim())).ok();
        return;
    }
    for drive in drives {
        let kind = if drive.removable {
            style("removable").yellow()
        } else {
            style("fixed").dim()
        };
        term.write_line(&format!(
            "  {}  {} free of {}  {}",
            style(drive.display()).bold(),
            style(format_gb(drive.free_bytes)).cyan(),
            format_gb(drive.total_bytes),
            kind
        ))
        .ok();
    }
}

fn run_ledger(paths: &AppPaths, filter: Option<String>, output: OutputFormat) -> Result<ExitCode> {
    let entries = read_ledger(&paths.ledger)?;
    let shown = filter_entries(&entries, filter.as_deref().unwrap_or(""));

    match output {
        OutputFormat::Json => print_json(&shown)?,
        OutputFormat::Pretty => print_ledger(&Term::stdout(), &paths.ledger, &shown),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_ledger_add(
    paths: &AppPaths,
    client: String,
    project: String,
    at: Option<String>,
    archive: String,
    ssd: String,
    cards: u32,
) -> Result<ExitCode> {
    let at = match at {
        Some(text) => parse_manual_timestamp(&text).ok_or_else(|| {
            IngestError::Config(format!(
                "date/time must be YYYY-MM-DD HH:MM or DD/MM/YY HH:MM, got {}",
                text
            ))
        })?,
        None => chrono::Local::now().naive_local(),
    };

    let job = JobConfig {
        client_name: client.trim().to_string(),
        project_name: project.trim().to_string(),
        num_cards: cards,
        archive_drive_display: archive.trim().to_string(),
        proxy_drive_display: ssd.trim().to_string(),
        ..JobConfig::default()
    };
    append_manual_row(&paths.ledger, at, &job)?;

    Term::stderr()
        .write_line(&format!(
            "{} OK row for {} / {} written to {}",
            style("✓").green().bold(),
            job.client_name,
            job.project_name,
            paths.ledger.display()
        ))
        .ok();
    Ok(ExitCode::SUCCESS)
}

fn print_ledger(term: &Term, path: &Path, entries: &[&LedgerEntry]) {
    term.write_line(&format!("{} {}", style("Ledger").bold(), style(path.display()).dim()))
        .ok();
    if entries.is_empty() {
        term.write_line(&format!("  {}", style("No sessions recorded").dim())).ok();
        return;
    }

    term.write_line(&format!("  {}", style(LEDGER_HEADERS[..7].join(" | ")).underlined()))
        .ok();
    for entry in entries {
        let status = match entry.status.as_str() {
            "OK" => style(entry.status.clone()).green(),
            "FAILED" => style(entry.status.clone()).red(),
            _ => style(entry.status.clone()).yellow(),
        };
        term.write_line(&format!(
            "  {} | {} | {} | {} | {} | {} | {}",
            entry.session_started_at,
            entry.session_finished_at,
            status,
            entry.mode,
            entry.client,
            entry.project,
            entry.num_cards
        ))
        .ok();
    }
}

fn run_projects(paths: &AppPaths, output: OutputFormat) -> Result<ExitCode> {
    let projects = load_recent_projects(&paths.projects);

    match output {
        OutputFormat::Json => print_json(&projects)?,
        OutputFormat::Pretty => {
            let term = Term::stdout();
            if projects.is_empty() {
                term.write_line(&format!("  {}", style("No recent projects").dim())).ok();
            }
            for project in &projects {
                term.write_line(&format!(
                    "  {} / {}  {}",
                    style(&project.client).bold(),
                    project.project,
                    style(&project.last_updated).dim()
                ))
                .ok();
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Card Ingest").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn print_result(term: &Term, result: &IngestResult) {
    let mark = if result.ok {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    term.write_line(&format!("{} {}", mark, result.message)).ok();

    if let Some(space) = result.space {
        term.write_line(&format!(
            "  {} used on card, {} required, archive has {}, proxy has {}",
            style(format_gb(space.source_used_bytes)).cyan(),
            format_gb(space.required_bytes),
            format_gb(space.archive_free_bytes),
            format_gb(space.proxy_free_bytes)
        ))
        .ok();
    }
    for log in result.log_paths() {
        term.write_line(&format!("  {} {}", style("log:").dim(), log.display()))
            .ok();
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| IngestError::Config(format!("cannot encode output: {}", e)))?;
    println!("{}", json);
    Ok(())
}
