//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod dev;

use std::path::PathBuf;

use clap::Args;
use quire_build::{BuildReport, BuildWarning, PageError};
use quire_config::{CliSettings, SiteConfig};
use quire_site::ResolverOptions;

use crate::error::CliError;
use crate::output::Output;

pub(crate) use build::BuildArgs;
pub(crate) use dev::DevArgs;

/// Options shared by every command that builds the site.
#[derive(Args)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover quire.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markdown source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    dest_dir: Option<PathBuf>,

    /// Base path the site is served under (overrides config).
    #[arg(long, env = "QUIRE_BASE")]
    base: Option<String>,

    /// Skip navigation entries that match no page instead of failing.
    #[arg(long)]
    lenient_nav: bool,

    /// Leave pages that the sidebar does not declare out of the sidebar.
    #[arg(long)]
    exclude_undeclared: bool,

    /// Enable verbose output (show build stages and timing logs).
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl SiteArgs {
    pub(crate) fn cli_settings(&self) -> CliSettings {
        CliSettings {
            source_dir: self.source_dir.clone(),
            dest_dir: self.dest_dir.clone(),
            base_path: self.base.clone(),
        }
    }

    pub(crate) fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            strict: !self.lenient_nav,
            exclude_undeclared: self.exclude_undeclared,
        }
    }

    /// Load the configuration with command-line overrides applied.
    pub(crate) fn load_config(&self, output: &Output) -> Result<SiteConfig, CliError> {
        let config = SiteConfig::load(self.config.as_deref(), Some(&self.cli_settings()))?;
        if let Some(path) = &config.config_path {
            output.detail(&format!("Config: {}", path.display()));
        }
        output.info(&format!("Source: {}", config.source_dir.display()));
        output.info(&format!("Output: {}", config.dest_dir.display()));
        if config.base_path != "/" {
            output.info(&format!("Base path: {}", config.base_path));
        }
        Ok(config)
    }
}

/// Print the warnings and failures of a build.
pub(crate) fn print_report(output: &Output, report: &BuildReport) {
    print_warnings(output, &report.warnings);
    print_failures(output, &report.failures);
}

pub(crate) fn print_warnings(output: &Output, warnings: &[BuildWarning]) {
    for warning in warnings {
        output.warning(&warning.to_string());
    }
}

pub(crate) fn print_failures(output: &Output, failures: &[PageError]) {
    if failures.is_empty() {
        return;
    }
    output.separator();
    output.error(&format!("{} page(s) failed:", failures.len()));
    for failure in failures {
        output.error(&format!("  {failure}"));
    }
    output.separator();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        site: SiteArgs,
    }

    #[test]
    fn test_defaults_are_strict() {
        let args = Harness::try_parse_from(["quire"]).unwrap().site;

        assert_eq!(args.resolver_options(), ResolverOptions::default());
        assert_eq!(args.cli_settings(), CliSettings::default());
    }

    #[test]
    fn test_overrides_map_to_settings() {
        let args = Harness::try_parse_from([
            "quire",
            "-s",
            "site/docs",
            "-d",
            "public",
            "--exclude-undeclared",
        ])
        .unwrap()
        .site;

        let settings = args.cli_settings();
        assert_eq!(settings.source_dir, Some(PathBuf::from("site/docs")));
        assert_eq!(settings.dest_dir, Some(PathBuf::from("public")));
        assert!(args.resolver_options().exclude_undeclared);
        assert!(args.resolver_options().strict);
    }
}
