mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    commands::run(cli.command)
}

#[cfg(not(target_os = "linux"))]
mod commands {
    use crate::cli::Commands;
    use anyhow::Result;

    pub fn run(_command: Commands) -> Result<()> {
        anyhow::bail!("xvfb-session needs Xvfb and only runs on Linux")
    }
}

#[cfg(target_os = "linux")]
mod commands {
    use crate::cli::Commands;
    use anyhow::{Context, Result};
    use indicatif::{ProgressBar, ProgressStyle};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use xvfb_session::{Session, SessionConfig};

    pub fn run(command: Commands) -> Result<()> {
        match command {
            Commands::Up { display } => up(display.resolve()?),
            Commands::Probe { display } => {
                let session = Session::with_config(SessionConfig {
                    display,
                    ..SessionConfig::default()
                });
                if session.is_display_in_use() {
                    println!("{} is in use", session.display_name());
                } else {
                    println!("{} is free", session.display_name());
                }
                Ok(())
            }
            Commands::Capture { display, output } => {
                let mut session = Session::with_config(display.resolve()?);
                let session = session.activate()?;
                let frame = session.render().context("Failed to capture frame")?;
                frame.save(&output)?;
                println!(
                    "Saved {}x{} frame from {} to {}",
                    frame.width(),
                    frame.height(),
                    session.display_name(),
                    output.display()
                );
                Ok(())
            }
            Commands::Click { display, x, y } => {
                let mut session = Session::with_config(display.resolve()?);
                let session = session.activate()?;
                session.click(x, y)?;
                Ok(())
            }
            Commands::Info { display } => {
                let mut session = Session::with_config(display.resolve()?);
                let session = session.activate()?;
                let screen = session.screen_size()?;
                println!("Display {}:", screen.display_string);
                println!("  pid:     {}", session.pid().unwrap_or_default());
                println!("  size:    {}x{}", screen.width, screen.height);
                println!("  depth:   {}", screen.depth);
                println!("  screens: {}", screen.screens);
                if (screen.width, screen.height) != (session.width(), session.height()) {
                    println!(
                        "  warning: frames will be reshaped to {}x{}",
                        session.width(),
                        session.height()
                    );
                }
                Ok(())
            }
            Commands::Run { display, program } => {
                let mut session = Session::with_config(display.resolve()?);
                let session = session.activate()?;
                let (name, args) = program
                    .split_first()
                    .context("No program given")?;
                let status = session
                    .command(name)
                    .args(args)
                    .status()
                    .with_context(|| format!("Failed to run {}", name))?;
                if !status.success() {
                    anyhow::bail!("{} exited with {}", name, status);
                }
                Ok(())
            }
        }
    }

    fn up(config: SessionConfig) -> Result<()> {
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();

        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .context("Failed to set Ctrl+C handler")?;

        let mut session = Session::with_config(config);
        let session = session.activate()?;

        println!(
            "Display {} up ({}x{}, pid {})",
            session.display_name(),
            session.width(),
            session.height(),
            session.pid().unwrap_or_default()
        );
        println!("Press Ctrl+C to stop...\n");

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} Serving... {elapsed_precise}")
                .context("Invalid progress template")?,
        );

        while running.load(Ordering::SeqCst) && session.is_active() {
            pb.tick();
            std::thread::sleep(Duration::from_millis(100));
        }
        pb.finish_and_clear();

        serve_outcome(
            running.load(Ordering::SeqCst),
            session.is_active(),
            &session.display_name(),
        )?;
        println!("Stopping {}", session.display_name());
        Ok(())
    }

    /// How the `up` loop ended: after Ctrl+C the server is fine whatever
    /// state it is in; otherwise the loop only stops because it died.
    fn serve_outcome(running: bool, active: bool, display_name: &str) -> Result<()> {
        if running && !active {
            anyhow::bail!("Display server {} exited unexpectedly", display_name);
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_interrupt_is_a_clean_stop() {
            assert!(serve_outcome(false, true, ":1").is_ok());
            assert!(serve_outcome(false, false, ":1").is_ok());
        }

        #[test]
        fn test_server_death_is_an_error() {
            let err = serve_outcome(true, false, ":1").unwrap_err();
            assert_eq!(err.to_string(), "Display server :1 exited unexpectedly");
        }
    }
}
