//! Linux X11 frame capture through xwd and ImageMagick

use crate::config::Tools;
use crate::error::{Result, SessionError};
use crate::frame::Frame;
use crate::linux::probe::display_name;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Shell pipeline that dumps the root window and converts it to raw RGB.
pub fn capture_pipeline(tools: &Tools) -> String {
    format!(
        "{} -root -silent | {} xwd:- -depth 8 rgb:-",
        shell_quote(&tools.dump),
        shell_quote(&tools.convert)
    )
}

/// Grab the current contents of `:display` as a (height, width, 3) frame.
///
/// The whole pipeline output is read before it is checked against the
/// expected size; there is no timeout on the read.
pub fn capture_frame(tools: &Tools, display: u32, width: u32, height: u32) -> Result<Frame> {
    let pipeline = capture_pipeline(tools);
    let target = display_name(display);
    debug!(%pipeline, display = %target, "capturing frame");

    let mut child = Command::new(&tools.shell)
        .arg("-c")
        .arg(&pipeline)
        .env("DISPLAY", &target)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| SessionError::io("Failed to start capture pipeline", e))?;

    let mut data = Vec::with_capacity(Frame::byte_len(width, height));
    if let Some(stdout) = child.stdout.take() {
        read_output(&mut child, stdout, &mut data)?;
    }

    let status = child
        .wait()
        .map_err(|e| SessionError::io("Failed to wait for capture pipeline", e))?;
    if !status.success() {
        warn!(%status, bytes = data.len(), "capture pipeline exited with error");
    }

    Frame::from_raw(width, height, data)
}

/// Drain the pipeline's stdout. On a read error the child is killed and
/// reaped before returning.
fn read_output(child: &mut Child, mut stdout: impl Read, data: &mut Vec<u8>) -> Result<()> {
    if let Err(e) = stdout.read_to_end(data) {
        let _ = child.kill();
        let _ = child.wait();
        return Err(SessionError::io("Failed to read capture output", e));
    }
    Ok(())
}
