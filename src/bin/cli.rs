//! FlatKV CLI
//!
//! Command-line interface for inspecting and editing a FlatKV database.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use flatkv::util::DEFAULT_ID_LEN;
use flatkv::{derive_id, BackendKind, Config, FlatKvError, FlatStore, Result, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// FlatKV CLI
#[derive(Parser, Debug)]
#[command(name = "flatkv")]
#[command(about = "CLI for the FlatKV directory key-value store")]
#[command(version)]
struct Args {
    /// Database directory
    #[arg(short, long, env = "FLATKV_DIR", default_value = "./flatkv_data")]
    db: PathBuf,

    /// Storage backend (auto, symlink, file)
    #[arg(short, long, env = "FLATKV_BACKEND", default_value = "auto")]
    backend: BackendKind,

    /// Create the database directory if it does not exist
    #[arg(long)]
    create: bool,

    /// Operate on the per-user store of this user id inside the database
    /// directory
    #[arg(short, long)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,

        /// Printed when the key is not set
        #[arg(long)]
        default: Option<String>,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// How to interpret the value
        #[arg(short = 't', long = "type", value_enum, default_value_t = ValueType::Auto)]
        value_type: ValueType,

        /// Leave an existing value alone
        #[arg(long)]
        no_force: bool,
    },

    /// Delete a key and everything below it
    Del {
        /// The key to delete
        key: String,
    },

    /// List keys
    Keys {
        /// Shell-style pattern the keys must match
        pattern: Option<String>,
    },

    /// Dump key/value pairs as JSON
    Dump {
        /// Patterns selecting keys (and their sub-trees)
        patterns: Vec<String>,

        /// Nest dotted keys into objects
        #[arg(long)]
        nested: bool,
    },

    /// Print the short identifier derived from some input
    Id {
        /// Seed data
        input: String,

        /// Identifier length
        #[arg(short, long, default_value_t = DEFAULT_ID_LEN)]
        length: usize,
    },

    /// Remove temporaries left behind by interrupted writes
    Reap {
        /// Minimum age of a temporary before it is removed
        #[arg(long, default_value = "3600")]
        older_than_secs: u64,
    },
}

/// Interpretation of a value given on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ValueType {
    /// JSON scalar if it parses as one, string otherwise (`null` included)
    Auto,
    Str,
    Int,
    Real,
    Bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("flatkv: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let Args {
        db,
        backend,
        create,
        user,
        command,
    } = args;
    let open = || open_store(db.clone(), backend, create, user.as_deref());

    match command {
        Commands::Id { input, length } => println!("{}", derive_id(&input, length)),

        Commands::Get { key, default } => match open()?.get(&key)? {
            Some(value) => println!("{}", value),
            None => match default {
                Some(default) => println!("{}", default),
                None => return Ok(ExitCode::FAILURE),
            },
        },

        Commands::Set {
            key,
            value,
            value_type,
            no_force,
        } => {
            let value = parse_value(&value, value_type)?;
            if !open()?.set(&key, Some(value), !no_force)? {
                eprintln!("{}: already set", key);
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Del { key } => open()?.delete(&key)?,

        Commands::Keys { pattern } => {
            let mut keys = open()?.keys(pattern.as_deref())?;
            keys.sort();
            for key in keys {
                println!("{}", key);
            }
        }

        Commands::Dump { patterns, nested } => {
            let store = open()?;
            let json = if nested {
                serde_json::to_string_pretty(&store.to_nested(&patterns)?)
            } else {
                let flat = store
                    .get_as_slist(&patterns)?
                    .into_iter()
                    .map(|(key, value)| -> Result<(String, serde_json::Value)> {
                        Ok((key, to_json(&value)?))
                    })
                    .collect::<Result<serde_json::Map<_, _>>>()?;
                serde_json::to_string_pretty(&flat)
            };
            let json = json.map_err(|e| FlatKvError::Serialization(e.to_string()))?;
            println!("{}", json);
        }

        Commands::Reap { older_than_secs } => {
            let reaped = open()?.reap_temporaries(Duration::from_secs(older_than_secs))?;
            println!("{}", reaped);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open_store(db: PathBuf, backend: BackendKind, create: bool, user: Option<&str>) -> Result<FlatStore> {
    if let Some(user) = user {
        return FlatStore::open_user_with(&db, user, create, backend);
    }

    let config = Config::builder()
        .db_dir(db)
        .backend(backend)
        .create_if_missing(create)
        .build();
    FlatStore::open(config)
}

fn to_json(value: &Value) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| FlatKvError::Serialization(e.to_string()))
}

/// Turn command line text into a value
///
/// Removal is `del`, never a value spelled on the command line.
fn parse_value(text: &str, value_type: ValueType) -> Result<Value> {
    let bad = |what: &str| FlatKvError::Config(format!("'{}' is not a valid {}", text, what));

    match value_type {
        ValueType::Str => Ok(Value::from(text)),
        ValueType::Int => text.parse::<i64>().map(Value::Int).map_err(|_| bad("integer")),
        ValueType::Real => text.parse::<f64>().map(Value::Real).map_err(|_| bad("real")),
        ValueType::Bool => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(bad("boolean")),
        },
        ValueType::Auto => match Value::from_json_str(text) {
            Ok(Some(value)) => Ok(value),
            Ok(None) | Err(FlatKvError::Serialization(_)) => Ok(Value::from(text)),
            Err(e) => Err(e),
        },
    }
}
