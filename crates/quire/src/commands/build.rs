//! `quire build` command implementation.

use clap::Args;
use quire_build::{BuildOptions, Builder};

use super::{SiteArgs, print_report};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub(crate) site: SiteArgs,

    /// Write the pages that build and report the ones that fail.
    #[arg(long)]
    pub(crate) keep_going: bool,
}

impl BuildArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.site.load_config(&output)?;
        let dest_dir = config.dest_dir.clone();

        let builder = Builder::new(BuildOptions {
            resolver: self.site.resolver_options(),
            keep_going: self.keep_going,
        });
        let report = builder.build_config(config)?;

        print_report(&output, &report);
        if !report.is_success() {
            return Err(CliError::PageFailures(report.failures.len()));
        }

        output.success(&format!(
            "Built {} pages to {} in {:.2}s",
            report.pages_written,
            dest_dir.display(),
            report.elapsed.as_secs_f64()
        ));
        Ok(())
    }
}
