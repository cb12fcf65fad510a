use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anotes_core::bridge::Osascript;
use anotes_core::config::{
    AnotesConfig, BridgeOverrides, load_config, parse_timeout, resolve_config_path,
};
use anotes_core::notes::{BodyUpdate, ListNotesOptions, NoteLookup, SearchOptions};
use anotes_core::ops;
use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ANOTES_LOG";

#[derive(Debug, Parser)]
#[command(name = "anotes", version, about = "Apple Notes CLI for AI agents")]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Path to config.toml")]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "MS",
        value_parser = parse_timeout_flag,
        help = "Bridge timeout in milliseconds (default 10000)"
    )]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Note operations")]
    Note(NoteArgs),
    #[command(about = "Folder operations")]
    Folder(FolderArgs),
    #[command(about = "Search notes by title/content")]
    Search(SearchArgs),
}

#[derive(Debug, Args)]
struct NoteArgs {
    #[command(subcommand)]
    command: NoteSubcommand,
}

#[derive(Debug, Subcommand)]
enum NoteSubcommand {
    #[command(about = "List notes")]
    List(FilterArgs),
    #[command(about = "Read a note (body returned as Markdown)")]
    Read(LookupArgs),
    #[command(about = "Create a new note")]
    Create(CreateArgs),
    #[command(about = "Replace note body")]
    Edit(BodyArgs),
    #[command(about = "Append to note body")]
    Append(BodyArgs),
    #[command(about = "Prepend to note body")]
    Prepend(BodyArgs),
    #[command(about = "Delete a note")]
    Delete(LookupArgs),
    #[command(about = "Move note to a different folder")]
    Move(MoveArgs),
    #[command(about = "Rename a note")]
    Rename(RenameArgs),
    #[command(about = "Show note metadata")]
    Info(LookupArgs),
    #[command(about = "Count notes")]
    Count(CountArgs),
}

#[derive(Debug, Args)]
struct FilterArgs {
    #[arg(long, value_name = "NAME", help = "Filter by folder")]
    folder: Option<String>,
    #[arg(long, value_name = "N", value_parser = parse_limit, help = "Limit number of results")]
    limit: Option<usize>,
}

#[derive(Debug, Args)]
struct LookupArgs {
    name: String,
    #[arg(long, value_name = "NAME", help = "Specify folder")]
    folder: Option<String>,
}

impl LookupArgs {
    fn lookup(self) -> NoteLookup {
        NoteLookup::new(self.name, self.folder)
    }
}

#[derive(Debug, Args)]
struct CreateArgs {
    name: String,
    #[arg(long, value_name = "NAME", help = "Target folder")]
    folder: Option<String>,
    #[arg(long, value_name = "MARKDOWN", help = "Note body (Markdown)")]
    body: Option<String>,
}

#[derive(Debug, Args)]
struct BodyArgs {
    #[command(flatten)]
    target: LookupArgs,
    #[arg(long, value_name = "MARKDOWN", help = "Body content (Markdown)")]
    body: String,
}

#[derive(Debug, Args)]
struct MoveArgs {
    #[command(flatten)]
    target: LookupArgs,
    #[arg(long, value_name = "FOLDER", help = "Destination folder")]
    to: String,
}

#[derive(Debug, Args)]
struct RenameArgs {
    #[command(flatten)]
    target: LookupArgs,
    #[arg(long = "name", value_name = "NEW_NAME", help = "New name for the note")]
    new_name: String,
}

#[derive(Debug, Args)]
struct CountArgs {
    #[arg(long, value_name = "NAME", help = "Filter by folder")]
    folder: Option<String>,
}

#[derive(Debug, Args)]
struct FolderArgs {
    #[command(subcommand)]
    command: FolderSubcommand,
}

#[derive(Debug, Subcommand)]
enum FolderSubcommand {
    #[command(about = "List all folders")]
    List,
    #[command(about = "Create a folder")]
    Create { name: String },
    #[command(about = "Delete a folder")]
    Delete { name: String },
    #[command(about = "Show folder metadata")]
    Info { name: String },
}

#[derive(Debug, Args)]
struct SearchArgs {
    query: String,
    #[command(flatten)]
    filter: FilterArgs,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging();

    let mut stdout = io::stdout().lock();
    match Cli::try_parse() {
        Ok(cli) => execute(cli, &mut stdout),
        Err(error) => report_parse_error(error, &mut stdout),
    }
}

/// Run a parsed command and render its result (or failure) as JSON on `out`.
fn execute(cli: Cli, out: &mut dyn Write) -> ExitCode {
    let overrides = BridgeOverrides {
        timeout_ms: cli.timeout_ms,
    };

    let Some(command) = cli.command else {
        let _ = writeln!(out, "{}", Cli::command().render_help());
        return ExitCode::SUCCESS;
    };

    match build_runner(cli.config.as_deref(), &overrides).and_then(|runner| run(&runner, command))
    {
        Ok(value) => print_json(out, &value),
        Err(error) => fail(out, &format!("{error:#}")),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn build_runner(config: Option<&Path>, overrides: &BridgeOverrides) -> Result<Osascript> {
    let config = match resolve_config_path(config) {
        Some(path) => load_config(&path)?,
        None => AnotesConfig::default(),
    };
    config.runner(overrides)
}

fn run(runner: &Osascript, command: Commands) -> Result<Value> {
    match command {
        Commands::Note(NoteArgs { command }) => run_note(runner, command),
        Commands::Folder(FolderArgs { command }) => match command {
            FolderSubcommand::List => to_json(ops::list_folders(runner)?),
            FolderSubcommand::Create { name } => to_json(ops::create_folder(runner, &name)?),
            FolderSubcommand::Delete { name } => to_json(ops::delete_folder(runner, &name)?),
            FolderSubcommand::Info { name } => to_json(ops::folder_info(runner, &name)?),
        },
        Commands::Search(SearchArgs { query, filter }) => to_json(ops::search_notes(
            runner,
            &SearchOptions {
                query,
                folder: filter.folder,
                limit: filter.limit,
            },
        )?),
    }
}

fn run_note(runner: &Osascript, command: NoteSubcommand) -> Result<Value> {
    match command {
        NoteSubcommand::List(FilterArgs { folder, limit }) => to_json(ops::list_notes(
            runner,
            &ListNotesOptions { folder, limit },
        )?),
        NoteSubcommand::Read(args) => to_json(ops::read_note(runner, &args.lookup())?),
        NoteSubcommand::Create(CreateArgs { name, folder, body }) => to_json(
            ops::create_note(runner, &name, folder, body.as_deref())?,
        ),
        NoteSubcommand::Edit(BodyArgs { target, body }) => to_json(ops::update_note_body(
            runner,
            &target.lookup(),
            BodyUpdate::Replace,
            &body,
        )?),
        NoteSubcommand::Append(BodyArgs { target, body }) => to_json(ops::update_note_body(
            runner,
            &target.lookup(),
            BodyUpdate::Append,
            &body,
        )?),
        NoteSubcommand::Prepend(BodyArgs { target, body }) => to_json(ops::update_note_body(
            runner,
            &target.lookup(),
            BodyUpdate::Prepend,
            &body,
        )?),
        NoteSubcommand::Delete(args) => to_json(ops::delete_note(runner, &args.lookup())?),
        NoteSubcommand::Move(MoveArgs { target, to }) => {
            to_json(ops::move_note(runner, &target.lookup(), &to)?)
        }
        NoteSubcommand::Rename(RenameArgs { target, new_name }) => {
            to_json(ops::rename_note(runner, &target.lookup(), &new_name)?)
        }
        NoteSubcommand::Info(args) => to_json(ops::note_info(runner, &args.lookup())?),
        NoteSubcommand::Count(CountArgs { folder }) => {
            to_json(ops::count_notes(runner, folder.as_deref())?)
        }
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn parse_limit(value: &str) -> Result<usize, String> {
    match value.trim().parse::<i64>() {
        Ok(limit) if limit < 0 => Err(format!("\"{value}\" must not be negative")),
        Ok(limit) => usize::try_from(limit).map_err(|_| format!("\"{value}\" is too large")),
        Err(_) => Err(format!("\"{value}\" is not a number")),
    }
}

fn parse_timeout_flag(value: &str) -> Result<u64, String> {
    parse_timeout(value).map_err(|error| format!("{error:#}"))
}

fn report_parse_error(error: clap::Error, out: &mut dyn Write) -> ExitCode {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(out, "{error}");
            ExitCode::SUCCESS
        }
        _ => fail(out, &parse_error_message(&error)),
    }
}

/// Flatten clap's rendered error into one line, dropping usage and hints.
fn parse_error_message(error: &clap::Error) -> String {
    if error.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand {
        return "a subcommand is required (see --help)".to_string();
    }
    let rendered = error.to_string();
    let summary = rendered.split("\n\n").next().unwrap_or_default();
    summary
        .trim_start_matches("error:")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_json(out: &mut dyn Write, value: &Value) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => {
            let _ = writeln!(out, "{rendered}");
            ExitCode::SUCCESS
        }
        Err(error) => fail(out, &format!("failed to render result: {error}")),
    }
}

fn fail(out: &mut dyn Write, message: &str) -> ExitCode {
    let _ = writeln!(out, "{}", json!({ "error": message }));
    ExitCode::FAILURE
}
