//! Linux X11 support module
//!
//! Wraps the external X11 tools a session drives: the Xvfb server itself,
//! the xdpyinfo liveness probe, the xwd/convert capture pipeline and
//! xdotool for input. Screen geometry is read back over x11rb.

pub mod capture;
pub mod display;
pub mod input;
pub mod probe;
pub mod server;

// Re-export commonly used types
pub use capture::capture_frame;
pub use display::{query_screen, ScreenInfo};
pub use input::click;
pub use probe::{display_in_use, display_name};
pub use server::{exit_error, kill_server, spawn_server};
