//! Shared temporary workspace used across run phases.
//!
//! ```text
//! .otel-build/
//! ├── conf.toml        # Tool configuration written by `otel set`
//! ├── debug.log        # Log for unphased commands
//! ├── preprocess/      # Scratch space of the preprocess phase
//! │   └── debug.log
//! └── instrument/      # Scratch space shared by all remix children
//!     └── debug.log
//! ```
//!
//! The preprocess invocation owns the tree and resets both scratch
//! directories on every run. Instrument invocations are children of that
//! process and never touch the structure.

use std::io;
use std::path::{Path, PathBuf};

use crate::phase::RunPhase;

/// Default workspace directory name, relative to the working directory.
pub const TEMP_BUILD_DIR: &str = ".otel-build";

/// Environment variable overriding the workspace root.
pub const BUILD_DIR_ENV: &str = "OTEL_BUILD_DIR";

pub const CONFIG_FILE: &str = "conf.toml";
pub const LOG_FILE: &str = "debug.log";

/// All phases write into the workspace.
#[cfg(unix)]
const DIR_MODE: u32 = 0o777;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempWorkspace {
    root: PathBuf,
}

impl TempWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locate the workspace from `OTEL_BUILD_DIR`, falling back to
    /// `.otel-build` under `cwd`. Relative paths are resolved against
    /// `cwd`, since remix children run in package directories.
    pub fn locate(cwd: &Path) -> Self {
        let dir = std::env::var_os(BUILD_DIR_ENV).filter(|dir| !dir.is_empty());
        Self::resolve(cwd, dir.as_deref().map(Path::new))
    }

    fn resolve(cwd: &Path, configured: Option<&Path>) -> Self {
        match configured {
            Some(dir) => Self::new(cwd.join(dir)),
            None => Self::new(cwd.join(TEMP_BUILD_DIR)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch directory of a phase. Unset maps to the root itself.
    pub fn dir_for(&self, phase: RunPhase) -> PathBuf {
        match phase {
            RunPhase::Unset => self.root.clone(),
            _ => self.root.join(phase.as_str()),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn log_path(&self, phase: RunPhase) -> PathBuf {
        self.dir_for(phase).join(LOG_FILE)
    }

    /// Prepare the workspace for `phase`.
    ///
    /// Instrument performs no filesystem access: its parent already built
    /// the tree and resetting it here would race with sibling children.
    /// Any other phase creates the root if missing, then empties and
    /// recreates both scratch directories.
    pub fn ensure(&self, phase: RunPhase) -> io::Result<()> {
        if phase == RunPhase::Instrument {
            return Ok(());
        }

        if !self.root.exists() {
            create_dir_all_shared(&self.root)?;
        }

        for scratch in RunPhase::SCRATCH {
            let dir = self.dir_for(scratch);
            // A missing directory is the normal first-run case
            let _ = std::fs::remove_dir_all(&dir);
            if let Err(e) = create_dir_all_shared(&dir) {
                tracing::debug!("Failed to recreate {}: {}", dir.display(), e);
            }
        }

        tracing::debug!("Prepared workspace at {}", self.root.display());
        Ok(())
    }
}

#[cfg(unix)]
fn create_dir_all_shared(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(path)?;
    // The process umask narrows the mode given to mkdir
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(DIR_MODE))
}

#[cfg(not(unix))]
fn create_dir_all_shared(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}
