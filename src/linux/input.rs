//! Pointer input through xdotool

use crate::config::Tools;
use crate::error::{Result, SessionError};
use crate::linux::probe::display_name;
use std::process::{Command, Stdio};
use tracing::debug;

pub fn click_command(tools: &Tools, display: u32, x: i32, y: i32) -> Command {
    let mut cmd = Command::new(&tools.input);
    cmd.env("DISPLAY", display_name(display))
        .args(["mousemove", &x.to_string(), &y.to_string()])
        .args(["click", "1", "sleep", "0.01", "mousemove", "restore"])
        .stdin(Stdio::null());
    cmd
}

/// Left-click at (x, y) and put the pointer back where it was.
///
/// Only a failure to start the tool is reported; its exit status is not.
pub fn click(tools: &Tools, display: u32, x: i32, y: i32) -> Result<()> {
    let status = click_command(tools, display, x, y)
        .status()
        .map_err(|e| SessionError::io(format!("Failed to run {}", tools.input), e))?;
    debug!(x, y, %status, "click sent");
    Ok(())
}
