use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kvc",
    about = "Key-value connector: browse, test, and run String/HashSet operations",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML connector configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Node list overriding the configured one, e.g. `redis://a:6379;redis://b:6379`
    #[arg(long, global = true)]
    pub hosts: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List browsable object types
    Types,
    /// Show input and output definitions for an operation
    Definitions(DefinitionsArgs),
    /// Test connectivity to the store
    Ping,
    /// Get values by id
    Get(GetArgs),
    /// Write one value
    Upsert(UpsertArgs),
    /// Delete values by id
    Delete(DeleteArgs),
}

#[derive(Args)]
pub struct DefinitionsArgs {
    pub object_type: String,
    pub operation: String,
    #[arg(long)]
    pub custom: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub object_type: String,
    #[arg(required = true)]
    pub ids: Vec<String>,
    /// HashSet field to select
    #[arg(long)]
    pub field: Option<String>,
}

#[derive(Args)]
pub struct UpsertArgs {
    pub object_type: String,
    #[arg(short, long)]
    pub key: String,
    /// Time-to-live in seconds
    #[arg(long)]
    pub ttl: Option<String>,
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub object_type: String,
    #[arg(required = true)]
    pub ids: Vec<String>,
    /// HashSet field to delete instead of the whole key
    #[arg(long)]
    pub field: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_types() {
        let cli = Cli::try_parse_from(["kvc", "types"]).unwrap();
        assert!(matches!(cli.command, Command::Types));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_global_options() {
        let cli =
            Cli::try_parse_from(["kvc", "ping", "--config", "kvc.toml", "--verbose"]).unwrap();
        assert!(matches!(cli.command, Command::Ping));
        assert_eq!(cli.config, Some(PathBuf::from("kvc.toml")));
        assert!(cli.verbose);
    }

    #[test]
    fn parse_definitions() {
        let cli = Cli::try_parse_from(["kvc", "definitions", "HashSet", "upsert"]).unwrap();
        if let Command::Definitions(args) = cli.command {
            assert_eq!(args.object_type, "HashSet");
            assert_eq!(args.operation, "upsert");
            assert!(args.custom.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_get_many() {
        let cli = Cli::try_parse_from(["kvc", "get", "HashSet", "a", "b", "--field", "f"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert_eq!(args.ids, vec!["a", "b"]);
            assert_eq!(args.field, Some("f".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn get_requires_an_id() {
        assert!(Cli::try_parse_from(["kvc", "get", "String"]).is_err());
    }

    #[test]
    fn parse_upsert() {
        let cli = Cli::try_parse_from([
            "kvc", "upsert", "String", "-k", "user:1", "--ttl", "60", "--data", "hello",
        ])
        .unwrap();
        if let Command::Upsert(args) = cli.command {
            assert_eq!(args.key, "user:1");
            assert_eq!(args.ttl, Some("60".into()));
            assert_eq!(args.data, Some("hello".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn upsert_data_and_file_conflict() {
        assert!(Cli::try_parse_from([
            "kvc", "upsert", "String", "-k", "k", "--data", "x", "--file", "f.json",
        ])
        .is_err());
    }

    #[test]
    fn parse_delete_with_hosts() {
        let cli = Cli::try_parse_from([
            "kvc", "--hosts", "redis://a:6379", "delete", "String", "a", "a",
        ])
        .unwrap();
        assert_eq!(cli.hosts.as_deref(), Some("redis://a:6379"));
        assert!(matches!(cli.command, Command::Delete(_)));
    }
}
