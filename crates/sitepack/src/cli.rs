//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use sitepack_profile::journal::DEFAULT_JOURNAL_LIMIT;

/// sitepack - turn a running site into an installation profile
#[derive(Parser, Debug)]
#[command(name = "sitepack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to sitepack.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an installation profile from the running site and switch to it
    #[command(visible_aliases = ["ipg", "install-profile-generate"])]
    Generate(GenerateArgs),

    /// Check whether a profile could be generated, without changing anything
    Check(CheckArgs),

    /// Show recorded migration runs
    Journal(JournalArgs),
}

// Generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Human readable profile name
    #[arg(long)]
    pub name: Option<String>,

    /// Machine name (derived from --name when omitted)
    #[arg(long)]
    pub machine_name: Option<String>,

    /// Profile description
    #[arg(long)]
    pub description: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// Check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Human readable profile name
    #[arg(long)]
    pub name: Option<String>,

    /// Machine name (derived from --name when omitted)
    #[arg(long)]
    pub machine_name: Option<String>,
}

// Journal command
#[derive(Args, Debug)]
pub struct JournalArgs {
    /// Number of most recent entries to show
    #[arg(short = 'n', long, default_value_t = DEFAULT_JOURNAL_LIMIT)]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_alias_and_flags() {
        let cli = Cli::try_parse_from([
            "sitepack",
            "ipg",
            "--name",
            "My Site",
            "--description",
            "Company site",
            "-y",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.name.as_deref(), Some("My Site"));
                assert!(args.machine_name.is_none());
                assert_eq!(args.description.as_deref(), Some("Company site"));
                assert!(args.yes);
            }
            other => panic!("expected generate, got {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sitepack",
            "check",
            "--machine-name",
            "my_site",
            "--config",
            "/srv/site/sitepack.yaml",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.config.as_deref().map(|p| p.as_str()),
            Some("/srv/site/sitepack.yaml")
        );
    }

    #[test]
    fn test_generate_long_alias() {
        let cli =
            Cli::try_parse_from(["sitepack", "install-profile-generate", "--machine-name", "acme"])
                .unwrap();
        match cli.command {
            Commands::Generate(args) => assert_eq!(args.machine_name.as_deref(), Some("acme")),
            other => panic!("expected generate, got {:?}", other),
        }
    }

    #[test]
    fn test_journal_defaults() {
        let cli = Cli::try_parse_from(["sitepack", "journal"]).unwrap();
        match cli.command {
            Commands::Journal(args) => {
                assert_eq!(args.limit, DEFAULT_JOURNAL_LIMIT);
                assert!(!args.json);
            }
            other => panic!("expected journal, got {:?}", other),
        }
    }
}
