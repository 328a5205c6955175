mod commands;
mod core;

use clap::{Args, Parser, Subcommand};
use crate::core::settings::{Overrides, env_bool};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "isaac",
    version,
    about = "Validate ISAAC records against the schema, the controlled vocabulary and domain invariants"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Store and engine settings shared by every subcommand.
#[derive(Args, Clone, Default)]
struct StoreArgs {
    /// Record schema (JSON Schema, Draft 2020-12) [env: ISAAC_SCHEMA]
    #[arg(long, global = true)]
    schema: Option<PathBuf>,
    /// Vocabulary JSON file [env: ISAAC_VOCAB]
    #[arg(long, global = true)]
    vocab: Option<PathBuf>,
    /// Vocabulary SQLite database, tried before the file [env: ISAAC_VOCAB_DB]
    #[arg(long, global = true)]
    vocab_db: Option<PathBuf>,
    /// Record SQLite database [env: ISAAC_RECORDS_DB]
    #[arg(long, global = true)]
    records_db: Option<PathBuf>,
    /// Report bound fields whose vocabulary category does not exist [env: ISAAC_STRICT_VOCABULARY]
    #[arg(long, global = true)]
    strict_vocabulary: bool,
    /// Vocabulary section governing categorical descriptors [env: ISAAC_DESCRIPTOR_SECTION]
    #[arg(long, global = true)]
    descriptor_section: Option<String>,
}

impl StoreArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            schema: self.schema.clone(),
            vocab: self.vocab.clone(),
            vocab_db: self.vocab_db.clone(),
            records_db: self.records_db.clone(),
            strict_vocabulary: self.strict_vocabulary,
            descriptor_section: self.descriptor_section.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every .json record under a directory (default: records/)
    Validate {
        /// Directory or single record file
        path: Option<PathBuf>,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Validate one record from a file or stdin and print the verdict as JSON
    Check {
        /// Record file; omit or pass '-' to read stdin
        path: Option<PathBuf>,
        /// Save the record to the record database when it is valid
        #[arg(long)]
        persist: bool,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Browse and edit the controlled vocabulary
    Vocab {
        #[command(subcommand)]
        action: VocabAction,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Browse persisted records
    Records {
        #[command(subcommand)]
        action: RecordsAction,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Build records from a JSON array of spreadsheet rows and persist the valid ones
    Import {
        /// JSON file holding an array of row objects (column name -> cell)
        rows: PathBuf,
        /// Validate without writing to the record database
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Serve validation and vocabulary tools as JSON-RPC 2.0 over stdio
    Serve {
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Subcommand)]
enum VocabAction {
    /// Print sections and categories with their allowed terms
    List {
        /// Only this section
        section: Option<String>,
    },
    /// Create an empty category
    AddCategory {
        section: String,
        category: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Append a term to an existing category
    AddTerm {
        section: String,
        category: String,
        term: String,
    },
    /// Copy the vocabulary file into the vocabulary database
    Sync,
}

#[derive(Subcommand)]
enum RecordsAction {
    /// List record metadata, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Print one record by its storage id
    Get { id: String },
}

fn init_tracing() -> Result<(), crate::core::error::ConfigError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());
    if env_bool("ISAAC_LOG_JSON", false)? {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Configuration error: {e}");
        process::exit(commands::EXIT_USAGE);
    }

    let exit_code = match cli.command {
        Some(Commands::Validate { path, store }) => {
            commands::validate::run(path, store.overrides())
        }
        Some(Commands::Check {
            path,
            persist,
            store,
        }) => commands::check::run(path, persist, store.overrides()),
        Some(Commands::Vocab { action, store }) => match action {
            VocabAction::List { section } => commands::vocab::list(section, store.overrides()),
            VocabAction::AddCategory {
                section,
                category,
                description,
            } => {
                commands::vocab::add_category(&section, &category, &description, store.overrides())
            }
            VocabAction::AddTerm {
                section,
                category,
                term,
            } => commands::vocab::add_term(&section, &category, &term, store.overrides()),
            VocabAction::Sync => commands::vocab::sync(store.overrides()),
        },
        Some(Commands::Records { action, store }) => match action {
            RecordsAction::List { limit, offset } => {
                commands::records::list(limit, offset, store.overrides())
            }
            RecordsAction::Get { id } => commands::records::get(&id, store.overrides()),
        },
        Some(Commands::Import {
            rows,
            dry_run,
            store,
        }) => commands::import::run(&rows, dry_run, store.overrides()),
        Some(Commands::Serve { store }) => commands::serve::run(store.overrides()),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            eprintln!();
            1
        }
    };

    process::exit(exit_code);
}
