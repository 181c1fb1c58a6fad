mod args;

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use sql_operations::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, RunConfig, log_filter, parse_params};

const INIT_OPERATION: &str = "__sqlop_init";

#[derive(Debug, Serialize)]
struct Listing {
    name: String,
    category: StatementCategory,
    params: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(args.verbose)));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("sqlop: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), SqlOpError> {
    let config = RunConfig::from_args(args);
    let config_json = serde_json::to_string(&config).unwrap_or_else(|_| "{}".to_string());
    tracing::debug!("config: {}", config_json);

    let backend = SqliteBackend::builder(args.db.as_str()).build()?;
    let mut builder = DataAccess::builder(backend)
        .dialect(args.dialect)
        .lazy(args.lazy);
    if let Some(include_dir) = &args.include_dir {
        builder = builder.include_dir(include_dir);
    }
    if let Some(sql_dir) = &args.sql_dir {
        builder = builder.sql_dir(sql_dir);
    }
    let db = builder.build()?;

    if let Some(init) = &args.init {
        let name = db.register_file(init, Some(INIT_OPERATION), false)?;
        db.call(&name, ())?;
        db.registry().remove(&name);
    }

    if args.list {
        let listing = db
            .registry()
            .names()
            .into_iter()
            .map(|name| {
                let operation = db.operation(&name)?;
                Ok(Listing {
                    category: operation.category(),
                    params: operation
                        .param_names()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    name,
                })
            })
            .collect::<Result<Vec<_>, SqlOpError>>()?;
        return print_json(&listing);
    }

    let operation = args
        .operation
        .as_deref()
        .ok_or_else(|| SqlOpError::ConfigError("no operation given (try --list)".into()))?;
    let call_args = parse_params(args.params.as_deref())?;
    let output = db.call(operation, call_args)?;
    print_json(&output.to_json())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), SqlOpError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| SqlOpError::ExecutionError(format!("failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}
