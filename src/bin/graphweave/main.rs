//! Binary entry point for the graphweave CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use graphweave::{
    codec::encode_path,
    decode_graph, decode_with, decorate_query, encode_query,
    graph::Resolved,
    logging::init_logging,
    Query, Snapshot,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

mod config;
mod ui;

use config::CliConfig;
use ui::{Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "graphweave",
    version,
    about = "Decode graph query results against provider snapshots",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        help = "Output format for structured responses [default: text]"
    )]
    format: Option<OutputFormat>,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "GRAPHWEAVE_CONFIG",
        help = "CLI config file (TOML)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "FILTER",
        help = "Tracing filter, e.g. debug or graphweave=trace [default: warn]"
    )]
    log_level: Option<String>,

    #[arg(long, global = true, value_enum, help = "Color theme for text output")]
    theme: Option<ThemeArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Decode a query against a snapshot")]
    Decode {
        #[arg(long, value_name = "JSON", help = "Snapshot: a file, '-' for stdin, or inline JSON")]
        snapshot: String,
        #[arg(long, value_name = "JSON", help = "Query: a file, '-' for stdin, or inline JSON")]
        query: String,
    },

    #[command(about = "Print the provider-facing shape of a query")]
    Shape {
        #[arg(long, value_name = "JSON", help = "Query: a file, '-' for stdin, or inline JSON")]
        query: String,
    },

    #[command(about = "Resolve a path inside a snapshot")]
    Lookup {
        #[arg(long, value_name = "JSON", help = "Snapshot: a file, '-' for stdin, or inline JSON")]
        snapshot: String,
        #[arg(long, value_name = "REF", help = "Dotted path or JSON array of keys")]
        path: String,
    },

    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ThemeArg {
    Auto,
    Light,
    Dark,
    Plain,
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Auto => Theme::Auto,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Plain => Theme::Plain,
        }
    }
}

#[derive(Serialize)]
struct DecodeReport {
    known: bool,
    result: Value,
}

#[derive(Serialize)]
struct LookupReport {
    path: Value,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.clone())?;
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level().map(str::to_owned))
        .unwrap_or_else(|| "warn".to_owned());
    init_logging(&level)?;
    debug!(config = ?config.path(), "loaded CLI config");

    let format = cli.format.or(config.format()).unwrap_or(OutputFormat::Text);
    let ui = Ui::new(cli.theme.or(config.theme()).unwrap_or(ThemeArg::Auto).into());
    let decode_config = config.decode();

    match cli.command {
        Command::Decode { snapshot, query } => {
            let snapshot = Snapshot::from_porcelain(&read_json(&snapshot)?)?;
            let query = Query::parse(&read_json(&query)?)?;
            let tree = decode_with(&snapshot, &query, &decode_config)?;
            let report = DecodeReport {
                known: tree.is_some(),
                result: tree.as_ref().map_or(Value::Null, |tree| tree.to_json()),
            };
            emit(&format, &report, |_| match &tree {
                Some(tree) => ui.json("Result", &tree.to_json()),
                None => ui.warn("result is unknown to this snapshot"),
            })?;
        }
        Command::Shape { query } => {
            let query = Query::parse(&read_json(&query)?)?;
            let shape = decorate_query(&encode_query(&query)?)?;
            emit(&format, &shape, |_| ui.json("Provider query", &shape))?;
        }
        Command::Lookup { snapshot, path } => {
            let snapshot = Snapshot::from_porcelain(&read_json(&snapshot)?)?;
            let reference = parse_ref(&path)?;
            let encoded = encode_path(&reference)?;
            let resolved = snapshot.lookup(&encoded, decode_config.max_reference_hops)?;
            let (status, value) = match resolved {
                Resolved::Absent => ("absent", None),
                Resolved::Unknown => ("unknown", None),
                Resolved::Leaf { value, is_val: true } => ("found", Some(json!({ "$val": value }))),
                Resolved::Leaf { value, .. } => ("found", Some(value.clone())),
                Resolved::Seq(nodes) => ("found", Some(decode_graph(nodes)?)),
            };
            let report = LookupReport {
                path: reference,
                status,
                value,
            };
            emit(&format, &report, |_| {
                ui.section(
                    "Lookup",
                    [("path", report.path.to_string()), ("status", status.to_owned())],
                );
                if let Some(value) = &report.value {
                    ui.json("Value", value);
                }
            })?;
        }
        Command::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "graphweave", &mut io::stdout());
        }
    }
    Ok(())
}

/// Reads JSON from `-` (stdin), inline text starting with `{` or `[`, or a file.
fn read_json(source: &str) -> Result<Value, Box<dyn Error>> {
    let text = match source.trim_start().chars().next() {
        _ if source == "-" => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
        Some('{') | Some('[') => source.to_owned(),
        _ => fs::read_to_string(source).map_err(|err| format!("cannot read {source}: {err}"))?,
    };
    Ok(serde_json::from_str(&text)?)
}

fn parse_ref(path: &str) -> Result<Value, Box<dyn Error>> {
    if path.trim_start().starts_with('[') {
        Ok(serde_json::from_str(path)?)
    } else {
        Ok(Value::String(path.to_owned()))
    }
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: Fn(OutputFormat),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(OutputFormat::Text),
    }
    Ok(())
}
