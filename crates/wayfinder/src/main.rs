//! Wayfinder CLI.
//!
//! Loads the API config, builds the in-memory catalog, and exposes
//! listing, search, and invocation subcommands.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use wayfinder_lib::executor::{CallRequest, Executor};
use wayfinder_lib::guardrails::Guardrails;
use wayfinder_lib::telemetry::{init_logging, LogFormat};
use wayfinder_registry::ApiRegistry;
use wayfinder_search::{matcher_for, Matcher as _, Strategy};

#[derive(Parser, Debug)]
#[command(name = "wayfinder", about = "OpenAPI operation catalog and search", version)]
struct Cli {
    /// Path to the APIs config file.
    #[arg(long, default_value = "config/apis.json", env = "WAYFINDER_CONFIG")]
    config: PathBuf,

    /// Log output format (json or pretty).
    #[arg(long, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered APIs.
    Apis,

    /// List every operation of one API.
    Endpoints {
        /// API name from the config file.
        #[arg(long)]
        api: String,
    },

    /// Rank an API's operations against a free-text query.
    Search {
        #[arg(long)]
        api: String,

        /// What you are looking for, in plain words.
        query: String,

        /// Maximum number of results.
        #[arg(long, default_value_t = 5)]
        limit: usize,

        /// Scoring strategy (lexical or semantic).
        #[arg(long, default_value = "lexical")]
        strategy: String,

        /// Scores below this are flagged low-confidence.
        #[arg(long, default_value_t = wayfinder_search::DEFAULT_CONFIDENCE_THRESHOLD)]
        threshold: f64,
    },

    /// Invoke one operation against the live API.
    Call {
        #[arg(long)]
        api: String,

        #[arg(long)]
        method: String,

        /// Path template (e.g. "/pets/{petId}").
        #[arg(long)]
        path: String,

        /// Path or query parameter as name=value; repeatable.
        #[arg(long = "param")]
        params: Vec<String>,

        /// JSON request body.
        #[arg(long)]
        body: Option<String>,

        /// Truncate list responses to this many items.
        #[arg(long)]
        limit: Option<usize>,

        /// Pagination offset.
        #[arg(long)]
        offset: Option<usize>,

        /// Confirm a destructive operation (DELETE, PUT, PATCH).
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format: LogFormat = match cli.log_format.parse() {
        Ok(format) => format,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(format, "info") {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!(error = %message, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let mut registry = ApiRegistry::new();
    registry
        .load_config(&cli.config)
        .await
        .map_err(|e| e.to_string())?;

    match cli.command {
        Commands::Apis => print_json(&registry.list_apis()),

        Commands::Endpoints { api } => {
            let spec = registry
                .get_spec(&api)
                .ok_or_else(|| unknown_api(&registry, &api))?;
            print_json(&spec.endpoints)
        }

        Commands::Search {
            api,
            query,
            limit,
            strategy,
            threshold,
        } => {
            let spec = registry
                .get_spec(&api)
                .ok_or_else(|| unknown_api(&registry, &api))?;
            let strategy: Strategy = strategy.parse()?;
            let matcher = matcher_for(strategy, threshold);
            let results = matcher
                .search(&query, &spec.endpoints, limit)
                .map_err(|e| e.to_string())?;
            print_json(&results)
        }

        Commands::Call {
            api,
            method,
            path,
            params,
            body,
            limit,
            offset,
            confirm,
        } => {
            let config = registry
                .get_api(&api)
                .ok_or_else(|| unknown_api(&registry, &api))?
                .clone();

            // An API may opt out of confirmation entirely.
            let confirmed = confirm || !config.settings.confirm_destructive;
            let verdict = Guardrails::new().check_operation(&method, &path, confirmed);
            if !verdict.allowed {
                print_json(&verdict)?;
                return Err("destructive operation not confirmed".to_string());
            }

            let executor = Executor::new(config).map_err(|e| e.to_string())?;
            let request = CallRequest {
                path,
                method,
                params: parse_params(&params)?,
                body: parse_body(body.as_deref())?,
                headers: BTreeMap::new(),
                limit,
                offset,
            };
            let result = executor.execute(&request).await;
            print_json(&result)
        }
    }
}

fn unknown_api(registry: &ApiRegistry, name: &str) -> String {
    format!(
        "API '{}' not found (available: {})",
        name,
        registry.api_names().join(", ")
    )
}

fn parse_params(pairs: &[String]) -> Result<BTreeMap<String, Value>, String> {
    pairs
        .iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("invalid --param '{pair}' (expected name=value)"))?;
            Ok((name.to_string(), Value::String(value.to_string())))
        })
        .collect()
}

fn parse_body(body: Option<&str>) -> Result<Option<Value>, String> {
    body.map(|text| serde_json::from_str(text).map_err(|e| format!("invalid --body JSON: {e}")))
        .transpose()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}
