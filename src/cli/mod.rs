// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bedrock - Versioned Schema Reconciliation CLI
///
/// Converge a live MySQL or PostgreSQL database to a declared, versioned schema.
#[derive(Parser, Debug)]
#[command(name = "bedrock")]
#[command(author = "Bedrock Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Versioned schema reconciliation CLI tool")]
#[command(long_about = "Bedrock - Versioned Schema Reconciliation CLI

Converge a live database to a declared schema.

Bedrock helps you:
  • Declare tables, columns, indices and foreign keys per schema version
  • Apply only the versions newer than the ones recorded in the ledger table
  • Preview every pending DDL statement with a dry run
  • Dump an existing database into a schema declaration

Supported databases: PostgreSQL, MySQL")]
#[command(propagate_version = true)]
#[command(after_help = "GETTING STARTED:
  1. Write .bedrock.yaml with your database environments
  2. Declare your schema:           Edit schema.yaml
  3. Preview pending changes:       bedrock migrate --dry-run
  4. Apply them:                    bedrock migrate
  5. Check ledger versions:         bedrock status

For detailed help on each command, use: bedrock <command> --help")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database if needed and apply pending schema versions
    ///
    /// Runs every framework schema version, then every application schema
    /// version, skipping versions already recorded in the ledger table.
    ///
    /// EXAMPLES:
    ///   # Apply to development environment
    ///   bedrock migrate
    ///
    ///   # Preview the DDL without executing it
    ///   bedrock migrate --dry-run
    ///
    ///   # Apply to production
    ///   bedrock migrate --env production
    Migrate {
        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,

        /// Dry run - show SQL without executing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show ledger versions and pending changes
    ///
    /// EXAMPLES:
    ///   # Show status for development
    ///   bedrock status
    ///
    ///   # Show status for production
    ///   bedrock status --env production
    Status {
        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,
    },

    /// Dump the live database schema as a YAML declaration
    ///
    /// EXAMPLES:
    ///   # Print to stdout
    ///   bedrock dump
    ///
    ///   # Write to a file
    ///   bedrock dump --output schema.yaml
    Dump {
        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
