//! Schema Forge CLI
//!
//! Command-line interface for rendering, listing and validating against a
//! directory of schemas.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use schema_forge::{
    http_source, FileMap, FileMapOptions, LoadError, SchemaSource, SchemaWithUri, ValidateError,
    Validator,
};

#[derive(Parser)]
#[command(name = "schema-forge")]
#[command(about = "Render, index and validate against draft-07 JSON Schema directories")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where schemas come from.
#[derive(Args)]
struct MapArgs {
    /// URI the directory is served under (default: its file:// URI)
    #[arg(long)]
    base_uri: Option<String>,

    /// Suffix carried by every schema URI (e.g. .json)
    #[arg(long, default_value = "")]
    suffix: String,

    /// Read files on every lookup instead of indexing up front
    #[arg(long)]
    live: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a schema as a top-level document with $id and $schema
    Render {
        /// Directory containing schema files
        dir: PathBuf,

        /// Schema URI, relative to the base URI
        uri: String,

        #[command(flatten)]
        map: MapArgs,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the URIs of every schema in a directory
    Index {
        /// Directory containing schema files
        dir: PathBuf,

        #[command(flatten)]
        map: MapArgs,

        /// Output the index as JSON, keyed by URI
        #[arg(long)]
        json: bool,
    },

    /// Validate a JSON payload against a schema from a directory
    Validate {
        /// Payload file to validate
        payload: PathBuf,

        /// Directory containing schema files
        #[arg(long)]
        dir: PathBuf,

        /// Schema URI, relative to the base URI
        #[arg(long)]
        schema: String,

        #[command(flatten)]
        map: MapArgs,

        /// Fetch references outside the directory over HTTP(S)
        #[arg(long)]
        remote: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            dir,
            uri,
            map,
            output,
            pretty,
        } => run_render(&dir, &uri, &map, output, pretty),

        Commands::Index { dir, map, json } => run_index(&dir, &map, json),

        Commands::Validate {
            payload,
            dir,
            schema,
            map,
            remote,
            json,
        } => run_validate(&payload, &dir, &schema, &map, remote, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn open_map(dir: &Path, args: &MapArgs) -> Result<FileMap, LoadError> {
    let options = FileMapOptions::new()
        .live(args.live)
        .suffix(args.suffix.as_str());
    FileMap::new(dir, args.base_uri.as_deref(), options)
}

fn find_schema(map: &FileMap, uri: &str) -> Result<SchemaWithUri, (String, u8)> {
    match map.resolve(uri) {
        Ok(Some(found)) => Ok(found),
        Ok(None) => Err((format!("no schema found at {}", uri), 3)),
        Err(e) => Err((e.to_string(), e.exit_code() as u8)),
    }
}

fn run_render(
    dir: &Path,
    uri: &str,
    args: &MapArgs,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let map = open_map(dir, args).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    let schema = find_schema(&map, uri).map_err(|(message, code)| {
        eprintln!("Error: {}", message);
        code
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&schema)
    } else {
        serde_json::to_string(&schema)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_index(dir: &Path, args: &MapArgs, json_output: bool) -> Result<(), u8> {
    let map = open_map(dir, args).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    let index = map.index().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if json_output {
        let documents: serde_json::Map<String, Value> = index
            .iter()
            .map(|entry| (entry.uri().to_string(), entry.as_json()))
            .collect();
        println!("{}", Value::Object(documents));
    } else {
        for uri in index.uris() {
            println!("{}", uri);
        }
    }
    Ok(())
}

fn run_validate(
    payload_path: &Path,
    dir: &Path,
    schema_uri: &str,
    args: &MapArgs,
    remote: bool,
    json_output: bool,
) -> Result<(), u8> {
    let payload = load_payload(payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;

    let map = open_map(dir, args).map_err(|e| {
        report_error(json_output, &format!("loading schemas: {}", e));
        e.exit_code() as u8
    })?;
    let schema = find_schema(&map, schema_uri).map_err(|(message, code)| {
        report_error(json_output, &message);
        code
    })?;

    let mut sources: Vec<Arc<dyn SchemaSource>> = vec![Arc::new(map)];
    if remote {
        let http = http_source().map_err(|e| {
            report_error(json_output, &e.to_string());
            e.exit_code() as u8
        })?;
        sources.push(http);
    }

    let result = Validator::for_schema(&schema, sources).and_then(|v| v.validate(&payload));
    match result {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

fn load_payload(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({"valid": false, "error": msg}));
    } else {
        eprintln!("Error: {}", msg);
    }
}
