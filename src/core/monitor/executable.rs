use std::path::{Path, PathBuf};

use crate::error::{MonitorError, Result};

/// Program looked up on the search path when no explicit probe is configured
pub const DEFAULT_PROBE: &str = "ffmpeg";

/// Resolve the probe executable.
///
/// An explicit path must point at an existing file; it never falls back to the
/// search path, so a typo is reported instead of silently running another
/// binary. Without an explicit path, `program` is looked up on `PATH`.
pub fn resolve_executable(explicit: Option<&Path>, program: &str) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(MonitorError::executable_not_found(format!(
            "provided path not found: {}",
            path.display()
        )));
    }

    which::which(program).map_err(|e| {
        MonitorError::executable_not_found(format!(
            "{} is not in PATH ({}). Install it or specify its full path.",
            program, e
        ))
    })
}
