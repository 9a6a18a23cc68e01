//! Xvfb process control

use crate::config::SessionConfig;
use crate::error::LaunchError;
use crate::linux::probe::display_name;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use tracing::debug;

/// Build the server command line: `Xvfb :N -screen S WxHxD`
pub fn server_command(config: &SessionConfig) -> Command {
    let mut cmd = Command::new(&config.tools.xvfb);
    cmd.arg(display_name(config.display))
        .arg("-screen")
        .arg(config.screen.to_string())
        .arg(config.geometry())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // Own process group, so a Ctrl+C in the controlling terminal reaches us
    // and not the server. The server is only ever stopped through `off`.
    cmd.process_group(0);
    cmd
}

pub fn spawn_server(config: &SessionConfig) -> Result<Child, LaunchError> {
    let mut cmd = server_command(config);
    debug!(command = ?cmd, "spawning display server");
    cmd.spawn().map_err(|e| LaunchError::Spawn {
        program: config.tools.xvfb.clone(),
        source: Arc::new(e),
    })
}

/// Classify how the server exited.
///
/// A clean exit and death by SIGKILL (what `off` sends) are both expected;
/// anything else is reported as a failure.
pub fn exit_error(status: ExitStatus) -> Option<LaunchError> {
    if status.success() || status.signal() == Some(Signal::SIGKILL as i32) {
        None
    } else {
        Some(LaunchError::Exited { status })
    }
}

/// Send SIGKILL to the server process.
pub fn kill_server(pid: u32) -> nix::Result<()> {
    kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_arguments() {
        let mut config = SessionConfig::new(640, 480, 42);
        config.screen = 1;
        let cmd = server_command(&config);
        assert_eq!(cmd.get_program(), "Xvfb");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(args, [":42", "-screen", "1", "640x480x24"]);
    }

    #[test]
    fn test_exit_classification() {
        assert!(exit_error(ExitStatus::from_raw(0)).is_none());
        // Raw wait status for "terminated by signal 9"
        assert!(exit_error(ExitStatus::from_raw(Signal::SIGKILL as i32)).is_none());

        let failed = exit_error(ExitStatus::from_raw(1 << 8)).unwrap();
        assert!(matches!(failed, LaunchError::Exited { status } if status.code() == Some(1)));

        assert!(exit_error(ExitStatus::from_raw(Signal::SIGTERM as i32)).is_some());
    }

    #[test]
    fn test_missing_server_binary() {
        let mut config = SessionConfig::new(64, 64, 42);
        config.tools.xvfb = "/nonexistent/Xvfb".to_string();
        let err = spawn_server(&config).unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { ref program, .. } if program == "/nonexistent/Xvfb"));
    }

    #[test]
    fn test_kill_server_stops_process() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        kill_server(child.id()).unwrap();
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(Signal::SIGKILL as i32));
        assert!(exit_error(status).is_none());
    }
}
