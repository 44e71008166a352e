use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use scanseed_core::DatabaseType;

#[derive(Parser, Debug)]
#[command(
    name = "scanseed",
    about = "Populate a test database with synthetic rows shaped like a scanned source",
    version,
    after_help = "Examples:\n  scanseed generate --profile scan.json --db postgres://localhost/fake_cdm --rows 1000\n  scanseed generate --profile scan.json          # DB from DATABASE_URL, .env or scanseed.toml\n  scanseed inspect --profile scan.json --format json\n  scanseed preview --profile scan.json --rows 5"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate synthetic tables into a database
    Generate(GenerateArgs),

    /// Show how each field would be generated, without touching a database
    Inspect(InspectArgs),

    /// Print a few generated rows per table without writing anywhere
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Scan profile (JSON)
    #[arg(short, long)]
    pub profile: PathBuf,

    /// Database connection URL (postgres://, mysql://, sqlite://)
    /// Falls back to DATABASE_URL env var, .env file or scanseed.toml
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Row ceiling per table
    #[arg(long)]
    pub rows: Option<usize>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Tables generated at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Only take key values from donors listed in [keys.links]
    #[arg(long)]
    pub qualified_keys: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Scan profile (JSON)
    #[arg(short, long)]
    pub profile: PathBuf,

    /// Row ceiling per table
    #[arg(long)]
    pub rows: Option<usize>,

    /// Only take key values from donors listed in [keys.links]
    #[arg(long)]
    pub qualified_keys: bool,

    /// Column types to show
    #[arg(long, default_value = "postgres")]
    pub dialect: Dialect,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: InspectFormat,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Scan profile (JSON)
    #[arg(short, long)]
    pub profile: PathBuf,

    /// Number of sample rows to preview per table
    #[arg(long, default_value = "5")]
    pub rows: usize,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Only take key values from donors listed in [keys.links]
    #[arg(long)]
    pub qualified_keys: bool,

    /// Column types to show
    #[arg(long, default_value = "postgres")]
    pub dialect: Dialect,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum InspectFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Dialect {
    Postgres,
    Mysql,
    Sqlite,
}

impl From<Dialect> for DatabaseType {
    fn from(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Postgres => DatabaseType::PostgreSQL,
            Dialect::Mysql => DatabaseType::MySQL,
            Dialect::Sqlite => DatabaseType::SQLite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from([
            "scanseed",
            "generate",
            "--profile",
            "scan.json",
            "--db",
            "sqlite://fake.db",
            "--rows",
            "250",
            "--qualified-keys",
        ]);
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.profile, PathBuf::from("scan.json"));
                assert_eq!(args.db.as_deref(), Some("sqlite://fake.db"));
                assert_eq!(args.rows, Some(250));
                assert!(args.qualified_keys);
                assert!(args.seed.is_none());
            }
            other => panic!("expected generate, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inspect_json_verbose() {
        let cli = Cli::parse_from(["scanseed", "inspect", "-p", "scan.json", "--format", "json", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Inspect(InspectArgs {
                format: InspectFormat::Json,
                ..
            })
        ));
    }

    #[test]
    fn test_preview_defaults() {
        let cli = Cli::parse_from(["scanseed", "preview", "--profile", "scan.json"]);
        match cli.command {
            Command::Preview(args) => assert_eq!(args.rows, 5),
            other => panic!("expected preview, got {:?}", other),
        }
    }
}
