use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use xvfb_session::{GlBackend, SessionConfig};

#[derive(Parser)]
#[command(name = "xvfb-session")]
#[command(about = "Headless X11 displays for off-screen rendering")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a virtual display and keep it up until Ctrl+C
    Up {
        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Report whether an X server answers on a display
    Probe {
        /// Display index to check
        #[arg(short, long)]
        display: u32,
    },

    /// Start a display, grab one frame and save it as an image
    Capture {
        #[command(flatten)]
        display: DisplayArgs,

        /// Output image path (format from extension)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Start a display and click at the given coordinates
    Click {
        #[command(flatten)]
        display: DisplayArgs,

        x: i32,
        y: i32,
    },

    /// Start a display and print the geometry its server reports
    Info {
        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Run a program against a fresh display, stopping it when the program exits
    Run {
        #[command(flatten)]
        display: DisplayArgs,

        /// Program and arguments
        #[arg(trailing_var_arg = true, required = true)]
        program: Vec<String>,
    },
}

#[derive(Args, Clone)]
pub struct DisplayArgs {
    /// Display index (`:N`)
    #[arg(short, long)]
    pub display: Option<u32>,

    /// Screen width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Screen height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// OpenGL backend exported to programs started with `run`
    #[arg(long, value_enum)]
    pub gl: Option<GlArg>,

    /// JSON session config; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl DisplayArgs {
    pub fn resolve(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("Failed to load session config {:?}", path))?,
            None => SessionConfig::default(),
        };
        if let Some(display) = self.display {
            config.display = display;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(gl) = self.gl {
            config.gl_backend = gl.into();
        }
        Ok(config)
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GlArg {
    Egl,
    Osmesa,
    Glfw,
    /// Do not set MUJOCO_GL
    None,
}

impl From<GlArg> for GlBackend {
    fn from(arg: GlArg) -> Self {
        match arg {
            GlArg::Egl => GlBackend::Egl,
            GlArg::Osmesa => GlBackend::Osmesa,
            GlArg::Glfw => GlBackend::Glfw,
            GlArg::None => GlBackend::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "xvfb-session", "capture", "-d", "9", "--width", "64", "--gl", "osmesa", "-o", "f.png",
        ]);
        let Commands::Capture { display, output } = cli.command else {
            panic!("expected capture");
        };
        let config = display.resolve().unwrap();
        assert_eq!(config.display, 9);
        assert_eq!(config.width, 64);
        assert_eq!(config.height, SessionConfig::default().height);
        assert_eq!(config.gl_backend, GlBackend::Osmesa);
        assert_eq!(output, PathBuf::from("f.png"));
    }

    #[test]
    fn test_run_takes_trailing_args() {
        let cli = Cli::parse_from(["xvfb-session", "run", "-d", "3", "python", "sim.py", "--steps", "10"]);
        let Commands::Run { program, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(program, ["python", "sim.py", "--steps", "10"]);
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"display": 5, "width": 100, "height": 50}"#).unwrap();

        let args = DisplayArgs {
            display: None,
            width: None,
            height: Some(80),
            gl: None,
            config: Some(path),
        };
        let config = args.resolve().unwrap();
        assert_eq!((config.display, config.width, config.height), (5, 100, 80));
    }
}
