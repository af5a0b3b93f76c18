//! `incident-edit`: edit one incident record in the terminal, field by field.
//!
//! The record is a JSON object with an `"id"` property. Every accepted save
//! rewrites the file; the final record is printed to stdout on exit.

mod fields;
mod store;

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use inline_edit::form::{CreateFailure, SaveTrigger};
use inline_edit::{IncidentEditor, UiOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::store::{Faults, JsonFileStore, to_document};

#[derive(Debug, Parser)]
#[command(
    name = "incident-edit",
    version,
    about = "Edit an incident record inline, saving each field optimistically"
)]
struct Cli {
    /// Record file: a JSON object with an "id" property
    #[arg(short = 'r', long = "record", value_name = "FILE")]
    record: PathBuf,

    /// Field declarations (JSON array); defaults to the built-in incident fields
    #[arg(short = 'f', long = "fields", value_name = "FILE")]
    fields: Option<PathBuf>,

    /// Title shown at the top of the UI
    #[arg(long = "title", value_name = "TEXT")]
    title: Option<String>,

    /// What Esc and clicks outside an open editor do: explicit (cancel) or on-close (save)
    #[arg(long = "save-trigger", value_name = "MODE", default_value = "explicit")]
    save_trigger: SaveTrigger,

    /// Clear the typed query when creating a new tag or option fails
    #[arg(long = "clear-query-on-create-failure")]
    clear_query_on_create_failure: bool,

    /// Ask before Esc throws away unsaved edits (press Esc twice)
    #[arg(long = "confirm-discard")]
    confirm_discard: bool,

    /// Quit without confirmation even when edits are unsaved
    #[arg(long = "no-confirm-exit")]
    no_confirm_exit: bool,

    /// Disallow creating new tags and options
    #[arg(long = "no-create")]
    no_create: bool,

    /// Reject every write to this field (repeatable)
    #[arg(long = "fail-field", value_name = "NAME")]
    fail_fields: Vec<String>,

    /// Reject every attempt to create a tag or option
    #[arg(long = "fail-create")]
    fail_create: bool,

    /// Write logs here (filtered by RUST_LOG); the UI owns the terminal
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Emit compact JSON rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if let Some(path) = cli.log_file.as_deref() {
        init_logging(path)?;
    }

    let definitions = match cli.fields.as_deref() {
        Some(path) => fields::load_fields(path)?,
        None => fields::incident_fields(),
    };
    if definitions.is_empty() {
        return Err(eyre!("no fields to edit"));
    }

    let faults = Faults {
        fields: cli.fail_fields.iter().cloned().collect::<BTreeSet<_>>(),
        create: cli.fail_create,
    };
    let store = Rc::new(
        JsonFileStore::open(&cli.record, faults)
            .wrap_err_with(|| format!("failed to open record {}", cli.record.display()))?,
    );
    let record = store.record().clone();
    info!(%record, path = %cli.record.display(), "editing record");

    let options = build_options(&cli);
    let mut editor = IncidentEditor::new(record.clone(), definitions, store.clone(), store.clone())
        .with_options(options)
        .with_creator(store.clone());
    if let Some(title) = cli.title.as_deref() {
        editor = editor.with_title(title);
    }

    let final_fields = editor.run().map_err(|err| eyre!("{err:#}"))?;
    let document = to_document(&record, &final_fields);
    let rendered = if cli.no_pretty {
        serde_json::to_string(&document)?
    } else {
        serde_json::to_string_pretty(&document)?
    };
    println!("{rendered}");
    Ok(())
}

fn build_options(cli: &Cli) -> UiOptions {
    let create_failure = if cli.clear_query_on_create_failure {
        CreateFailure::ClearQuery
    } else {
        CreateFailure::KeepQuery
    };
    UiOptions::default()
        .with_save_trigger(cli.save_trigger)
        .with_create_failure(create_failure)
        .with_confirm_discard(cli.confirm_discard)
        .with_confirm_exit(!cli.no_confirm_exit)
        .with_create(!cli.no_create)
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| eyre!("failed to install logger: {err}"))
}
