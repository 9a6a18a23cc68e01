//! Headless X11 displays for off-screen rendering
//!
//! A [`Session`] starts an Xvfb server on a chosen display index, hands back
//! frames captured from it and can inject mouse clicks. Simulators launched
//! through [`Session::command`] render into the virtual display with the
//! configured OpenGL backend.

pub mod config;
pub mod error;
pub mod frame;
pub mod handoff;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "linux")]
mod session;

pub use config::{GlBackend, SessionConfig, Tools};
pub use error::{LaunchError, Result, SessionError};
pub use frame::Frame;
pub use handoff::Handoff;

#[cfg(target_os = "linux")]
pub use session::{ActiveSession, Session};
