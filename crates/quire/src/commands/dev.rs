//! `quire dev` command implementation.

use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use clap::Args;
use quire_build::{
    BuildOptions, Builder, DevSession, RebuildHandle, RebuildReport, WatchOptions, watch_sources,
};

use super::{SiteArgs, print_failures, print_report, print_warnings};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the dev command.
#[derive(Args)]
pub(crate) struct DevArgs {
    #[command(flatten)]
    pub(crate) site: SiteArgs,

    /// Quiet period in milliseconds before a burst of changes is rebuilt.
    #[arg(long, default_value_t = 100)]
    debounce_ms: u64,
}

impl DevArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.site.load_config(&output)?;

        let builder = Builder::new(BuildOptions {
            resolver: self.site.resolver_options(),
            keep_going: true,
        });
        let (session, report) = DevSession::start(&builder, config)?;
        print_report(&output, &report);
        output.success(&format!(
            "Built {} pages in {:.2}s",
            report.pages_written,
            report.elapsed.as_secs_f64()
        ));

        let discovery = session.discovery();
        let options = WatchOptions {
            debounce: Duration::from_millis(self.debounce_ms),
            ..WatchOptions::default()
        };
        let (changes, _watch) = watch_sources(&discovery, &options)?;
        output.highlight(&format!(
            "Watching {} for changes (Ctrl+C to stop)",
            discovery.source_dir().display()
        ));

        let mut running: Vec<RebuildHandle> = Vec::new();
        loop {
            match changes.recv_timeout(Duration::from_millis(200)) {
                Ok(batch) => {
                    for change in &batch {
                        tracing::debug!(path = %change.path.display(), kind = ?change.kind, "Source changed");
                    }
                    match session.apply_changes(&batch) {
                        Ok(handle) => running.push(handle),
                        // Keep serving the previous build.
                        Err(e) => output.error(&format!("Rebuild skipped: {e}")),
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let (finished, pending): (Vec<_>, Vec<_>) =
                running.into_iter().partition(RebuildHandle::is_finished);
            running = pending;
            for handle in finished {
                print_rebuild(&output, &handle.wait());
            }
        }
        Ok(())
    }
}

fn print_rebuild(output: &Output, report: &RebuildReport) {
    print_warnings(output, &report.warnings);
    print_failures(output, &report.failures);
    if report.written.is_empty() && report.removed.is_empty() {
        return;
    }
    let mut summary = format!("Rebuilt {} page(s)", report.written.len());
    if !report.removed.is_empty() {
        summary.push_str(&format!(", removed {}", report.removed.len()));
    }
    output.success(&summary);
    for route in &report.written {
        output.detail(&format!("  {route}"));
    }
}
