use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde_json::Value;

use repeatui::{
    DocumentFormat, OutputDestination, OutputOptions, RepeatUI, emit, parse_document_str,
};

#[derive(Debug, Parser)]
#[command(
    name = "repeatui",
    version,
    about = "Edit repeatable record lists as an interactive TUI"
)]
struct Cli {
    /// Field schema document: file path or "-" for stdin
    #[arg(short = 's', long = "schema", value_name = "PATH")]
    schema: String,

    /// Initial value document: file path or "-" for stdin
    #[arg(short = 'c', long = "value", alias = "data", value_name = "PATH")]
    value: Option<String>,

    /// Title shown at the top of the UI
    #[arg(long = "title", value_name = "TEXT")]
    title: Option<String>,

    /// Output destinations ("-" writes to stdout). Accepts multiple values per flag use.
    #[arg(short = 'o', long = "output", value_name = "DEST", num_args = 1.., action = ArgAction::Append)]
    outputs: Vec<String>,

    /// Emit compact JSON rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if cli.schema == "-" && cli.value.as_deref() == Some("-") {
        return Err(eyre!(
            "cannot read schema and value from stdin simultaneously"
        ));
    }

    let schema = load_document(&cli.schema).wrap_err("failed to load schema document")?;
    let value = cli
        .value
        .as_deref()
        .map(|spec| load_document(spec).wrap_err("failed to load value document"))
        .transpose()?;

    let mut editor = RepeatUI::new(schema);
    if let Some(value) = value {
        editor = editor.with_value(value);
    }
    if let Some(title) = cli.title {
        editor = editor.with_title(title);
    }

    let result = editor
        .run()
        .map_err(|err| eyre!(err))
        .wrap_err("editor session failed")?;

    let destinations = output_destinations(&cli.outputs);
    let options = OutputOptions::new(DocumentFormat::Json)
        .with_pretty(!cli.no_pretty)
        .with_destinations(destinations);
    emit(&result, &options)
        .map_err(|err| eyre!(err))
        .wrap_err("failed to write result")?;
    Ok(())
}

fn load_document(spec: &str) -> Result<Value> {
    let (contents, format) = if spec == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .wrap_err("failed to read stdin")?;
        (raw, DocumentFormat::Json)
    } else {
        let path = PathBuf::from(spec);
        let raw = fs::read_to_string(&path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let format = DocumentFormat::from_path(&path).unwrap_or(DocumentFormat::Json);
        (raw, format)
    };
    parse_document_str(&contents, format).map_err(|err| eyre!(err))
}

fn output_destinations(outputs: &[String]) -> Vec<OutputDestination> {
    if outputs.is_empty() {
        return vec![OutputDestination::Stdout];
    }
    outputs
        .iter()
        .map(|spec| {
            if spec == "-" {
                OutputDestination::Stdout
            } else {
                OutputDestination::file(spec)
            }
        })
        .collect()
}
