use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Environment variable MuJoCo reads to pick its OpenGL platform.
pub const GL_BACKEND_VAR: &str = "MUJOCO_GL";

/// OpenGL platform handed to simulators launched against the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlBackend {
    /// Hardware-accelerated off-screen rendering on an NVIDIA GPU
    #[default]
    Egl,
    Osmesa,
    Glfw,
    /// Leave the child's environment alone
    None,
}

impl GlBackend {
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            GlBackend::Egl => Some("egl"),
            GlBackend::Osmesa => Some("osmesa"),
            GlBackend::Glfw => Some("glfw"),
            GlBackend::None => None,
        }
    }

    /// Set the backend variable on a child command. The current process
    /// environment is never touched.
    pub fn apply(&self, cmd: &mut Command) {
        if let Some(value) = self.as_str() {
            cmd.env(GL_BACKEND_VAR, value);
        }
    }
}

/// External programs the session shells out to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub xvfb: String,
    pub probe: String,
    pub dump: String,
    pub convert: String,
    pub input: String,
    pub shell: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            xvfb: "Xvfb".to_string(),
            probe: "xdpyinfo".to_string(),
            dump: "xwd".to_string(),
            convert: "convert".to_string(),
            input: "xdotool".to_string(),
            shell: "sh".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Display index, as in `:N`
    pub display: u32,
    pub width: u32,
    pub height: u32,
    /// Colour depth passed to the server
    pub depth: u8,
    pub screen: u32,
    /// How often activation re-probes the display while waiting for it
    pub poll_interval_ms: u64,
    pub gl_backend: GlBackend,
    pub tools: Tools,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display: 0,
            width: 1280,
            height: 720,
            depth: 24,
            screen: 0,
            poll_interval_ms: 200,
            gl_backend: GlBackend::default(),
            tools: Tools::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(width: u32, height: u32, display: u32) -> Self {
        Self {
            display,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            SessionError::io(format!("Failed to read config from {:?}", path), e)
        })?;
        serde_json::from_str(&json).map_err(|source| SessionError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Screen geometry argument for Xvfb, e.g. `640x480x24`
    pub fn geometry(&self) -> String {
        format!("{}x{}x{}", self.width, self.height, self.depth)
    }
}
