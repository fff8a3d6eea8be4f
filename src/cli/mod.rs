//! Command-line surface.
//!
//! - `export`: write notes for every merged change in the feed
//! - `ref-updated`: write notes for one reference update

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use git2::Oid;

use crate::config::{self, Config};
use crate::core::{CommitId, ProjectName};
use crate::export::{ExportContext, ExportOutput, default_feed_path, run_export};
use crate::feed::JsonlFeed;
use crate::git::{CommitOutcome, NotesError};
use crate::listener::{RefUpdate, RefUpdateListener, RefUpdatedEvent, create_review_notes};
use crate::{Error, Result};

#[derive(Parser, Debug)]
#[command(
    name = "reviewnotes",
    version,
    about = "Record code review metadata as git notes",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Site configuration file layered over the user config.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export notes for every merged change.
    Export(ExportArgs),

    /// Write notes for commits newly reachable from an updated reference.
    RefUpdated(RefUpdatedArgs),
}

#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Directory holding the project repositories.
    #[arg(long, value_name = "PATH")]
    pub base_path: Option<PathBuf>,

    /// Change feed (JSON Lines).
    #[arg(long, value_name = "PATH")]
    pub changes: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Worker threads (default from config).
    #[arg(long, short = 't', value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: Option<u16>,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct RefUpdatedArgs {
    /// Project whose reference moved.
    #[arg(long)]
    pub project: String,

    /// Full reference name, e.g. refs/heads/main.
    #[arg(long = "ref", value_name = "REF")]
    pub ref_name: String,

    /// Previous commit (all zeros when the reference was created).
    #[arg(long)]
    pub old: String,

    /// New commit (all zeros when the reference was deleted).
    #[arg(long)]
    pub new: String,

    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

/// Layered configuration for this invocation.
///
/// A broken user file falls back to defaults; a broken `--config` is fatal.
pub fn load_config(cli: &Cli) -> Result<Config> {
    match config::load(cli.config.as_deref()) {
        Ok(cfg) => Ok(cfg),
        Err(err) if cli.config.is_none() && std::env::var_os(config::ENV_CONFIG).is_none() => {
            eprintln!("config load failed, using defaults: {err}");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
        Err(err) => Err(err),
    }
}

/// Run the CLI (used by bin).
pub fn run(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Export(args) => {
            apply_source(&mut config, &args.source);
            if let Some(threads) = args.threads {
                config.threads = usize::from(threads);
            }
            export(&config)
        }
        Commands::RefUpdated(args) => {
            apply_source(&mut config, &args.source);
            ref_updated(&config, &args)
        }
    }
}

fn apply_source(config: &mut Config, source: &SourceArgs) {
    if let Some(path) = source.base_path.as_ref() {
        config.base_path = path.clone();
    }
    if let Some(path) = source.changes.as_ref() {
        config.changes = Some(path.clone());
    }
}

fn feed_path(config: &Config) -> PathBuf {
    config
        .changes
        .clone()
        .unwrap_or_else(|| default_feed_path(&config.base_path))
}

fn open_feed(config: &Config) -> Result<JsonlFeed> {
    Ok(JsonlFeed::open(&feed_path(config))?)
}

/// The single line a failed command reports to the user.
pub fn error_message(err: &Error) -> String {
    match err {
        Error::Feed(err) => format!("Cannot read changes from database {err}"),
        err => format!("error: {err}"),
    }
}

fn export(config: &Config) -> Result<()> {
    let feed = open_feed(config)?;
    let ctx = ExportContext::from_config(config);
    let report = run_export(&ctx, &feed, config.threads, ExportOutput::stdio())?;
    tracing::info!(
        changes = report.total,
        projects = report.exported.len(),
        failed = report.failed.len(),
        "review notes export finished"
    );
    Ok(())
}

fn ref_updated(config: &Config, args: &RefUpdatedArgs) -> Result<()> {
    let event = RefUpdatedEvent {
        project: ProjectName::parse(&args.project)?,
        updates: vec![RefUpdate {
            ref_name: args.ref_name.clone(),
            old: parse_oid(&args.old)?,
            new: parse_oid(&args.new)?,
        }],
    };
    let feed = open_feed(config)?;
    let ctx = ExportContext::from_config(config);

    if config.async_updates {
        let listener = RefUpdateListener::with_queue(Arc::new(ctx), Arc::new(feed))
            .map_err(|e| Error::Config {
                reason: format!("cannot start notes queue: {e}"),
            })?;
        listener.on_ref_updated(event);
        listener.shutdown();
        return Ok(());
    }

    let outcome = create_review_notes(&ctx, &feed, &event)?;
    let mut out = std::io::stdout().lock();
    let _ = match outcome {
        CommitOutcome::Committed { commit, .. } => writeln!(out, "{commit}"),
        CommitOutcome::Unchanged { .. } => writeln!(out, "unchanged"),
        CommitOutcome::Empty => writeln!(out, "nothing to do"),
    };
    Ok(())
}

fn parse_oid(raw: &str) -> Result<Oid> {
    let id = CommitId::parse(raw)?;
    Ok(Oid::from_str(id.as_str()).map_err(NotesError::from)?)
}
