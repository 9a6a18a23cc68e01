//! Screen geometry of a running X server

use crate::error::{Result, SessionError};
use crate::linux::probe::display_name;
use x11rb::connection::Connection;
use x11rb::rust_connection::RustConnection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenInfo {
    /// X11 display string (e.g., ":99")
    pub display_string: String,
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    /// Number of screens the server exposes
    pub screens: usize,
}

/// X11 listens on TCP port 6000 + display; higher indices have no valid port.
pub const MAX_DISPLAY: u32 = u16::MAX as u32 - 6000;

/// Connect to `:display` and read the default screen's root geometry.
pub fn query_screen(display: u32) -> Result<ScreenInfo> {
    if display > MAX_DISPLAY {
        return Err(SessionError::X11(format!(
            "Display :{display} is out of range (max :{MAX_DISPLAY})"
        )));
    }
    let display_string = display_name(display);
    let (conn, screen_num) = RustConnection::connect(Some(display_string.as_str())).map_err(|e| {
        SessionError::X11(format!("Failed to connect to {display_string}: {e}"))
    })?;

    let setup = conn.setup();
    let screen = setup.roots.get(screen_num).ok_or_else(|| {
        SessionError::X11(format!(
            "{display_string} has no screen {screen_num} ({} available)",
            setup.roots.len()
        ))
    })?;

    Ok(ScreenInfo {
        display_string,
        width: screen.width_in_pixels as u32,
        height: screen.height_in_pixels as u32,
        depth: screen.root_depth,
        screens: setup.roots.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_display_is_an_error() {
        let err = query_screen(4099).unwrap_err();
        assert!(matches!(err, SessionError::X11(_)));
        assert!(err.to_string().contains(":4099"));
    }

    #[test]
    fn test_display_beyond_tcp_range_is_rejected() {
        let err = query_screen(MAX_DISPLAY + 1).unwrap_err();
        assert!(matches!(err, SessionError::X11(_)));
        assert!(err.to_string().contains("out of range"));

        assert!(matches!(query_screen(u32::MAX), Err(SessionError::X11(_))));
    }
}
