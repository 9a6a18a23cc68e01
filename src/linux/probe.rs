//! Display liveness probe

use crate::config::Tools;
use std::process::{Command, Stdio};
use tracing::debug;

/// X11 display string for a display index
pub fn display_name(display: u32) -> String {
    format!(":{display}")
}

/// Check whether an X server is already answering on `:display`.
///
/// Runs the probe tool once with its output discarded. Exit status 0 means
/// the display is taken; any other status, or a probe that cannot be
/// started at all, counts as free.
pub fn display_in_use(tools: &Tools, display: u32) -> bool {
    let name = display_name(display);
    let status = Command::new(&tools.probe)
        .args(["-display", &name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) => status.success(),
        Err(e) => {
            debug!(probe = %tools.probe, error = %e, "display probe could not run");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools_with_probe(probe: &str) -> Tools {
        Tools {
            probe: probe.to_string(),
            ..Tools::default()
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(0), ":0");
        assert_eq!(display_name(99), ":99");
    }

    #[test]
    fn test_exit_status_decides() {
        assert!(display_in_use(&tools_with_probe("true"), 5));
        assert!(!display_in_use(&tools_with_probe("false"), 5));
    }

    #[test]
    fn test_missing_probe_means_free() {
        assert!(!display_in_use(&tools_with_probe("/nonexistent/xdpyinfo"), 5));
    }
}
