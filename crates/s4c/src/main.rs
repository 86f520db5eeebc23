//! The S4 dispatch CLI.
//!
//! Provides the `s4c` command with the following subcommands:
//!
//! - `s4c check <schema>` - Load a schema file and report problems
//! - `s4c resolve <schema> <generic> <class>...` - Resolve and run a call
//! - `s4c methods <schema> <generic>` - List a generic's signatures
//! - `s4c ancestors <schema> <class>` - List a class's ancestors
//!
//! Options:
//! - `--json` - Output as JSON (one object per line)
//! - `--no-color` - Disable colorized output
//!
//! Set `S4_LOG` (e.g. `S4_LOG=s4_core=debug`) to log to stderr.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use s4_core::diagnostics::{render_error, render_warning, warning_json};
use s4_core::{classes, render_signature, DiagnosticOptions, DispatchError, Dispatcher};
use s4_schema::{load, Schema, SchemaError};

#[derive(Parser)]
#[command(name = "s4c", version, about = "Inspect and exercise S4 dispatch schemas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON (one object per line) instead of human-readable format
    #[arg(long, global = true)]
    json: bool,

    /// Disable colorized output
    #[arg(long = "no-color", global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a schema file and report any error
    Check {
        /// Path to the schema file (s4.toml)
        schema: PathBuf,
    },
    /// Resolve a call and run the winning method
    Resolve {
        schema: PathBuf,
        /// Generic function to call
        generic: String,
        /// Concrete class of each dispatch argument (`missing` if absent)
        #[arg(required = true)]
        classes: Vec<String>,
    },
    /// List the methods of a generic
    Methods { schema: PathBuf, generic: String },
    /// List the ancestors of a class, nearest first
    Ancestors { schema: PathBuf, class: String },
}

/// A loaded schema file together with its text, for rendering errors.
struct Loaded {
    file: String,
    source: String,
    schema: Schema,
    dispatcher: Dispatcher<String>,
}

/// Why a command failed. Rendering happens in `main`.
enum Failure {
    Schema { file: String, source: String, error: SchemaError },
    Dispatch { file: String, error: DispatchError },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let opts = DiagnosticOptions {
        color: !cli.no_color && !cli.json,
        json: cli.json,
    };

    let result = match &cli.command {
        Commands::Check { schema } => check(schema, &opts),
        Commands::Resolve {
            schema,
            generic,
            classes,
        } => resolve(schema, generic, classes, &opts),
        Commands::Methods { schema, generic } => methods(schema, generic, &opts),
        Commands::Ancestors { schema, class } => ancestors(schema, class, &opts),
    };

    if let Err(failure) = result {
        let rendered = match &failure {
            Failure::Schema {
                file,
                source,
                error,
            } => error.render(source, file, &opts),
            Failure::Dispatch { file, error } => render_error(error, None, "", file, &opts),
        };
        eprint!("{}", rendered);
        process::exit(1);
    }
}

fn init_tracing() {
    if let Ok(filter) = EnvFilter::try_from_env("S4_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }
}

fn open(path: &Path) -> Result<Loaded, Failure> {
    let file = path.display().to_string();
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            return Err(Failure::Schema {
                file: file.clone(),
                source: String::new(),
                error: SchemaError::Io {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                },
            })
        }
    };
    let loaded = Schema::from_str(&source).and_then(|schema| load(&schema).map(|d| (schema, d)));
    match loaded {
        Ok((schema, dispatcher)) => Ok(Loaded {
            file,
            source,
            schema,
            dispatcher,
        }),
        Err(error) => Err(Failure::Schema {
            file,
            source,
            error,
        }),
    }
}

fn check(path: &Path, opts: &DiagnosticOptions) -> Result<(), Failure> {
    let loaded = open(path)?;
    let schema = &loaded.schema;
    if opts.json {
        println!(
            "{}",
            serde_json::json!({
                "file": loaded.file,
                "classes": schema.classes.len(),
                "unions": schema.unions.len(),
                "generics": schema.generics.len(),
                "methods": schema.methods.len(),
            })
        );
    } else {
        println!(
            "{}: ok ({} classes, {} unions, {} generics, {} methods)",
            loaded.file,
            schema.classes.len(),
            schema.unions.len(),
            schema.generics.len(),
            schema.methods.len()
        );
    }
    Ok(())
}

fn resolve(path: &Path, generic: &str, names: &[String], opts: &DiagnosticOptions) -> Result<(), Failure> {
    let loaded = open(path)?;
    let d = &loaded.dispatcher;
    let tuple = classes(names.iter().map(String::as_str));
    let fail = |error| Failure::Dispatch {
        file: loaded.file.clone(),
        error,
    };

    let (resolution, result) = d.dispatch_resolved(generic, &tuple, &[]).map_err(fail)?;
    if let Some(warning) = resolution.ambiguity.as_ref().filter(|_| d.config().warn_ambiguous) {
        if opts.json {
            eprintln!("{}", warning_json(warning, None, &loaded.file));
        } else {
            eprint!("{}", render_warning(warning, None, "", &loaded.file, opts));
        }
    }

    if opts.json {
        println!(
            "{}",
            serde_json::json!({
                "generic": generic,
                "classes": tuple,
                "signature": resolution.signature,
                "distance": resolution.distance,
                "ambiguous": resolution.is_ambiguous(),
                "result": result,
            })
        );
    } else {
        println!(
            "{}({}) -> {} (distance {})",
            generic,
            render_signature(&tuple),
            render_signature(&resolution.signature),
            resolution.distance
        );
        println!("result: {}", result);
    }
    Ok(())
}

fn methods(path: &Path, generic: &str, opts: &DiagnosticOptions) -> Result<(), Failure> {
    let loaded = open(path)?;
    let d = &loaded.dispatcher;
    let fail = |error| Failure::Dispatch {
        file: loaded.file.clone(),
        error,
    };
    let params = d.generic_params(generic).map_err(fail)?;
    let signatures = d.show_methods(generic).map_err(fail)?;

    if opts.json {
        let rendered: Vec<String> = signatures.iter().map(|m| m.render()).collect();
        println!(
            "{}",
            serde_json::json!({
                "generic": generic,
                "params": params,
                "methods": rendered,
            })
        );
    } else {
        println!("{}({})", generic, params.join(", "));
        for signature in &signatures {
            println!("  {}", signature.render());
        }
    }
    Ok(())
}

fn ancestors(path: &Path, class: &str, opts: &DiagnosticOptions) -> Result<(), Failure> {
    let loaded = open(path)?;
    let ancestors = loaded.dispatcher.ancestors(class);

    if opts.json {
        let list: Vec<serde_json::Value> = ancestors
            .iter()
            .map(|(name, distance)| serde_json::json!({ "name": name, "distance": distance }))
            .collect();
        println!("{}", serde_json::json!({ "class": class, "ancestors": list }));
    } else {
        println!("{}", class);
        for (name, distance) in &ancestors {
            println!("  {} {}", distance, name);
        }
    }
    Ok(())
}
