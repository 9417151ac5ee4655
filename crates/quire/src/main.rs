//! quire CLI - documentation site builder.
//!
//! Provides commands for:
//! - `build`: Build the site into the output directory
//! - `dev`: Build the site, then rebuild changed pages as sources change

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, DevArgs};
use output::Output;

/// quire - documentation site builder.
#[derive(Parser)]
#[command(name = "quire", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site.
    Build(BuildArgs),
    /// Build the site and rebuild on source changes.
    Dev(DevArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG
    let verbose = match &cli.command {
        Commands::Build(args) => args.site.verbose,
        Commands::Dev(args) => args.site.verbose,
    };
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => args.execute(),
        Commands::Dev(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_flags_parse() {
        let cli = Cli::try_parse_from([
            "quire",
            "build",
            "--config",
            "site/quire.toml",
            "--base",
            "/docs/",
            "--lenient-nav",
            "--keep-going",
            "-v",
        ])
        .unwrap();

        let Commands::Build(args) = cli.command else {
            panic!("expected build command");
        };
        assert!(args.keep_going);
        assert!(args.site.verbose);
        assert!(!args.site.resolver_options().strict);
        assert_eq!(args.site.cli_settings().base_path.as_deref(), Some("/docs/"));
    }

    #[test]
    fn test_dev_rejects_keep_going() {
        assert!(Cli::try_parse_from(["quire", "dev", "--keep-going"]).is_err());
    }
}
