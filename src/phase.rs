//! Run phase classification.
//!
//! A build goes through two processes. The user runs `otel go build`, which
//! is the *preprocess* phase. That process launches the go toolchain with
//! `-toolexec`, so every compiler tool invocation re-enters this binary as
//! `otel remix <tool> [args]`, the *instrument* phase. Informational
//! commands (`version`, `set`) run unphased.

/// Subcommand names recognised by the dispatcher.
pub const SUBCOMMAND_VERSION: &str = "version";
pub const SUBCOMMAND_SET: &str = "set";
pub const SUBCOMMAND_GO: &str = "go";
pub const SUBCOMMAND_REMIX: &str = "remix";

/// Environment variable the preprocess phase sets on the instrumented go
/// build it spawns. Children inherit it, so it is only a cross-check.
pub const PHASE_ENV: &str = "OTEL_RUN_PHASE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Unset,
    Preprocess,
    Instrument,
}

impl RunPhase {
    /// Phases that own a private scratch directory in the workspace.
    pub const SCRATCH: [RunPhase; 2] = [RunPhase::Preprocess, RunPhase::Instrument];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Unset => "",
            RunPhase::Preprocess => "preprocess",
            RunPhase::Instrument => "instrument",
        }
    }

    /// Whether this phase needs the shared configuration loaded.
    pub fn is_build(&self) -> bool {
        !matches!(self, RunPhase::Unset)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunPhase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preprocess" => Ok(RunPhase::Preprocess),
            "instrument" => Ok(RunPhase::Instrument),
            "" | "unset" => Ok(RunPhase::Unset),
            _ => anyhow::bail!(
                "Invalid run phase '{}'. Valid values: preprocess, instrument, unset",
                s
            ),
        }
    }
}

/// Classify an invocation from its arguments (program name excluded).
///
/// Purely syntactic: a first token ending in `go` is the preprocess phase,
/// a first token equal to `remix` is the instrument phase.
pub fn determine_phase<S: AsRef<str>>(args: &[S]) -> RunPhase {
    match args.first().map(|arg| arg.as_ref()) {
        Some(first) if first.ends_with(SUBCOMMAND_GO) => RunPhase::Preprocess,
        Some(SUBCOMMAND_REMIX) => RunPhase::Instrument,
        _ => RunPhase::Unset,
    }
}

/// Classify an invocation, cross-checking an explicit phase signal.
///
/// `signal` is the value of [`PHASE_ENV`] if set. It is inherited by every
/// process below a build, so it only counts when it agrees with the
/// arguments; argv classification always decides.
pub fn resolve_phase<S: AsRef<str>>(args: &[S], signal: Option<&str>) -> RunPhase {
    let phase = determine_phase(args);
    match signal.map(str::parse::<RunPhase>) {
        Some(Ok(signalled)) if signalled != RunPhase::Unset && signalled != phase => {
            tracing::debug!(
                "Ignoring {}={} for a {} invocation",
                PHASE_ENV,
                signalled,
                if phase == RunPhase::Unset { "unphased" } else { phase.as_str() }
            );
        }
        Some(Err(e)) => tracing::warn!("Ignoring {}: {}", PHASE_ENV, e),
        _ => {}
    }
    phase
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_build_is_preprocess() {
        assert_eq!(determine_phase(&["go", "build"]), RunPhase::Preprocess);
    }

    #[test]
    fn remix_is_instrument() {
        assert_eq!(determine_phase(&["remix"]), RunPhase::Instrument);
        assert_eq!(
            determine_phase(&["remix", "/usr/lib/go/pkg/tool/compile", "-V=full"]),
            RunPhase::Instrument
        );
    }

    #[test]
    fn informational_commands_are_unset() {
        assert_eq!(determine_phase(&["version"]), RunPhase::Unset);
        assert_eq!(determine_phase(&["set", "-verbose"]), RunPhase::Unset);
    }

    #[test]
    fn no_arguments_is_unset() {
        let empty: [&str; 0] = [];
        assert_eq!(determine_phase(&empty), RunPhase::Unset);
    }

    #[test]
    fn suffix_match_classifies_lookalike_tokens_as_preprocess() {
        assert_eq!(determine_phase(&["/usr/local/bin/go"]), RunPhase::Preprocess);
        assert_eq!(determine_phase(&["cargo"]), RunPhase::Preprocess);
    }

    #[test]
    fn remix_must_match_exactly() {
        assert_eq!(determine_phase(&["remixed"]), RunPhase::Unset);
        assert_eq!(determine_phase(&["premix"]), RunPhase::Unset);
    }

    #[test]
    fn signal_confirms_remix_as_instrument() {
        assert_eq!(
            resolve_phase(&["remix", "/usr/lib/go/pkg/tool/compile"], Some("instrument")),
            RunPhase::Instrument
        );
    }

    #[test]
    fn inherited_signal_does_not_override_argv() {
        assert_eq!(
            resolve_phase(&["go", "build"], Some("instrument")),
            RunPhase::Preprocess
        );
        assert_eq!(resolve_phase(&["version"], Some("instrument")), RunPhase::Unset);
        assert_eq!(resolve_phase(&["remix", "asm"], Some("preprocess")), RunPhase::Instrument);
    }

    #[test]
    fn invalid_or_empty_signal_falls_back_to_argv() {
        assert_eq!(resolve_phase(&["go", "build"], Some("bogus")), RunPhase::Preprocess);
        assert_eq!(resolve_phase(&["remix"], Some("")), RunPhase::Instrument);
        assert_eq!(resolve_phase(&["version"], None), RunPhase::Unset);
    }

    #[test]
    fn phase_display_names_match_scratch_dirs() {
        assert_eq!(RunPhase::Preprocess.to_string(), "preprocess");
        assert_eq!(RunPhase::Instrument.to_string(), "instrument");
        assert_eq!("Instrument".parse::<RunPhase>().unwrap(), RunPhase::Instrument);
    }
}
