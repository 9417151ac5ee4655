//! Build stages.

/// Stage of a build.
///
/// A build moves forward through the stages in declaration order and ends
/// in `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildState {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// Reading the configuration.
    Loading,
    /// Walking the source directory.
    Discovering,
    /// Resolving the sidebar and navbar.
    ResolvingNav,
    /// Creating and initializing plugins.
    Composing,
    /// Rendering and writing pages.
    Rendering,
    /// Finished; see the report for page failures.
    Done,
    /// Stopped on a fatal error.
    Failed,
}

impl BuildState {
    /// Check whether the build has stopped.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Discovering => "discovering",
            Self::ResolvingNav => "resolving-nav",
            Self::Composing => "composing",
            Self::Rendering => "rendering",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
