use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sql_operations::args::InvocationArgs;
use sql_operations::{ParamMap, SqlDialect, SqlOpError};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Register a directory of SQL files and run one operation"
)]
pub(crate) struct Args {
    /// Database file, or `:memory:`
    #[arg(long, default_value = ":memory:")]
    pub(crate) db: String,
    /// Directory of `.sql` files; each file stem becomes an operation name
    #[arg(long)]
    pub(crate) sql_dir: Option<PathBuf>,
    /// Base directory for INCLUDE paths
    #[arg(long)]
    pub(crate) include_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "sqlite")]
    pub(crate) dialect: SqlDialect,
    /// Compile operations on first use instead of at registration
    #[arg(long)]
    pub(crate) lazy: bool,
    /// SQL file run once before the operation (schema setup)
    #[arg(long)]
    pub(crate) init: Option<PathBuf>,
    /// JSON object for one call, or an array of objects for a batch
    #[arg(long)]
    pub(crate) params: Option<String>,
    /// Print registered operations and their categories, then exit
    #[arg(long)]
    pub(crate) list: bool,
    /// Repeat for more log output on stderr
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,
    /// Operation to invoke
    pub(crate) operation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunConfig {
    pub(crate) db: String,
    pub(crate) sql_dir: Option<PathBuf>,
    pub(crate) include_dir: Option<PathBuf>,
    pub(crate) dialect: SqlDialect,
    pub(crate) lazy: bool,
    pub(crate) init: Option<PathBuf>,
    pub(crate) operation: Option<String>,
}

impl RunConfig {
    pub(crate) fn from_args(args: &Args) -> Self {
        RunConfig {
            db: args.db.clone(),
            sql_dir: args.sql_dir.clone(),
            include_dir: args.include_dir.clone(),
            dialect: args.dialect,
            lazy: args.lazy,
            init: args.init.clone(),
            operation: args.operation.clone(),
        }
    }
}

pub(crate) fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Turn `--params` JSON into call arguments: an object is one mapping, an array of
/// objects is a batch.
pub(crate) fn parse_params(json: Option<&str>) -> Result<InvocationArgs, SqlOpError> {
    let Some(json) = json else {
        return Ok(InvocationArgs::default());
    };
    let value: JsonValue = serde_json::from_str(json)
        .map_err(|e| SqlOpError::ConfigError(format!("invalid --params JSON: {e}")))?;

    match &value {
        JsonValue::Object(_) => ParamMap::from_json(&value)
            .map(InvocationArgs::Single)
            .ok_or_else(|| SqlOpError::ConfigError("--params must be an object".into())),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                ParamMap::from_json(item).ok_or_else(|| {
                    SqlOpError::ConfigError("--params batch entries must be objects".into())
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(InvocationArgs::Batch),
        _ => Err(SqlOpError::ConfigError(
            "--params must be a JSON object or an array of objects".into(),
        )),
    }
}
