//! Virtual display session lifecycle
//!
//! A [`Session`] owns at most one Xvfb process. The process lives on a
//! dedicated worker thread that blocks on its exit; the PID is handed back
//! to the activating caller through a [`Handoff`]. The worker clears the
//! session's tracking slot when the server goes away, and `off` kills the
//! server and joins the worker.

use crate::config::SessionConfig;
use crate::error::{LaunchError, Result, SessionError};
use crate::frame::Frame;
use crate::handoff::Handoff;
use crate::linux::{self, ScreenInfo};
use std::ffi::OsStr;
use std::ops::{Deref, DerefMut};
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

type LaunchResult = std::result::Result<u32, LaunchError>;
type WorkerHandle = JoinHandle<std::result::Result<(), LaunchError>>;

/// What the session knows about its current activation.
struct Tracked {
    generation: u64,
    pid: Option<u32>,
    worker: Option<WorkerHandle>,
}

type Slot = Arc<Mutex<Option<Tracked>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Tracked>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The tracked entry, if it still belongs to activation `generation`.
fn owned<'a>(
    slot: &'a mut MutexGuard<'_, Option<Tracked>>,
    generation: u64,
) -> Option<&'a mut Tracked> {
    slot.as_mut().filter(|t| t.generation == generation)
}

fn take_owned(slot: &Slot, generation: u64) -> Option<Tracked> {
    let mut slot = lock(slot);
    if slot.as_ref().is_some_and(|t| t.generation == generation) {
        slot.take()
    } else {
        None
    }
}

/// A headless X11 display backed by an Xvfb process.
///
/// `on`/`off` are idempotent. Dropping the session turns it off; prefer
/// [`Session::activate`] for scoped use.
pub struct Session {
    config: SessionConfig,
    slot: Slot,
    generation: u64,
}

impl Session {
    pub fn new(width: u32, height: u32, display: u32) -> Self {
        Self::with_config(SessionConfig::new(width, height, display))
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            slot: Arc::new(Mutex::new(None)),
            generation: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn display(&self) -> u32 {
        self.config.display
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// X11 display string, e.g. `:99`
    pub fn display_name(&self) -> String {
        linux::display_name(self.config.display)
    }

    /// Whether a worker is tracked. The server itself is not re-checked.
    pub fn is_active(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// PID of the backing server, once the handoff has completed.
    pub fn pid(&self) -> Option<u32> {
        lock(&self.slot).as_ref().and_then(|t| t.pid)
    }

    /// Whether any X server currently answers on this session's display.
    pub fn is_display_in_use(&self) -> bool {
        linux::display_in_use(&self.config.tools, self.config.display)
    }

    /// Start the display server and wait until it answers.
    pub fn on(&mut self) -> Result<()> {
        self.on_with(true)
    }

    /// Start the display server. Does nothing if one is already tracked.
    ///
    /// With `wait`, the display is polled until it responds or the worker
    /// has already given up, before blocking on the launch handoff.
    pub fn on_with(&mut self, wait: bool) -> Result<()> {
        if self.is_active() {
            debug!(display = self.config.display, "session already active");
            return Ok(());
        }

        self.generation += 1;
        let generation = self.generation;
        let handoff: Arc<Handoff<LaunchResult>> = Arc::new(Handoff::new());

        *lock(&self.slot) = Some(Tracked {
            generation,
            pid: None,
            worker: None,
        });

        let spawned = thread::Builder::new()
            .name(format!("xvfb{}", self.display_name()))
            .spawn({
                let config = self.config.clone();
                let slot = Arc::clone(&self.slot);
                let handoff = Arc::clone(&handoff);
                move || run_worker(&config, generation, &slot, &handoff)
            });
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                lock(&self.slot).take();
                return Err(SessionError::io("Failed to spawn display worker thread", e));
            }
        };

        if let Some(tracked) = owned(&mut lock(&self.slot), generation) {
            tracked.worker = Some(worker);
        }

        if wait {
            let interval = self.config.poll_interval();
            while !self.is_display_in_use() && !self.worker_finished(generation) {
                thread::sleep(interval);
            }
        }

        match handoff.receive() {
            Ok(pid) => {
                match owned(&mut lock(&self.slot), generation) {
                    Some(tracked) => tracked.pid = Some(pid),
                    None => warn!(pid, "display server exited right after launch"),
                }
                info!(display = %self.display_name(), pid, "display server started");
                Ok(())
            }
            Err(e) => {
                let tracked = take_owned(&self.slot, generation);
                if let Some(worker) = tracked.and_then(|t| t.worker) {
                    let _ = worker.join();
                }
                Err(SessionError::Launch(e))
            }
        }
    }

    /// Kill the display server and join its worker. Safe to call at any time.
    pub fn off(&mut self) {
        let Some(tracked) = lock(&self.slot).take() else {
            return;
        };

        if let Some(pid) = tracked.pid {
            match linux::kill_server(pid) {
                Ok(()) => debug!(pid, "sent SIGKILL to display server"),
                // Already gone; the worker will have reaped it.
                Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => warn!(pid, error = %e, "failed to kill display server"),
            }
        }

        if let Some(worker) = tracked.worker {
            match worker.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "display worker reported an error"),
                Err(_) => error!("display worker panicked"),
            }
        }
        info!(display = %self.display_name(), "display server stopped");
    }

    /// Turn the session on for the lifetime of the returned guard.
    pub fn activate(&mut self) -> Result<ActiveSession<'_>> {
        self.on()?;
        Ok(ActiveSession { session: self })
    }

    /// Capture the current framebuffer as a (height, width, 3) RGB frame.
    pub fn render(&self) -> Result<Frame> {
        if !self.is_active() {
            return Err(SessionError::NotRunning {
                display: self.config.display,
            });
        }
        linux::capture_frame(
            &self.config.tools,
            self.config.display,
            self.config.width,
            self.config.height,
        )
    }

    /// Left-click at (x, y), restoring the pointer afterwards.
    pub fn click(&self, x: i32, y: i32) -> Result<()> {
        linux::click(&self.config.tools, self.config.display, x, y)
    }

    /// Root window geometry as reported by the running server.
    pub fn screen_size(&self) -> Result<ScreenInfo> {
        linux::query_screen(self.config.display)
    }

    /// A command that renders into this display: `DISPLAY` and the
    /// configured GL backend are set on the child only.
    pub fn command(&self, program: impl AsRef<OsStr>) -> Command {
        let mut cmd = Command::new(program);
        cmd.env("DISPLAY", self.display_name());
        self.config.gl_backend.apply(&mut cmd);
        cmd
    }

    fn worker_finished(&self, generation: u64) -> bool {
        match lock(&self.slot).as_ref() {
            Some(t) if t.generation == generation => {
                t.worker.as_ref().is_some_and(|w| w.is_finished())
            }
            _ => true,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.off();
    }
}

/// Scoped activation: the display is turned off when this guard drops.
pub struct ActiveSession<'a> {
    session: &'a mut Session,
}

impl Deref for ActiveSession<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for ActiveSession<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        self.session.off();
    }
}

fn run_worker(
    config: &SessionConfig,
    generation: u64,
    slot: &Slot,
    handoff: &Handoff<LaunchResult>,
) -> std::result::Result<(), LaunchError> {
    let result = serve_display(config, handoff);
    if let Err(e) = &result {
        error!(display = config.display, error = %e, "display server failed");
    }

    take_owned(slot, generation);
    result
}

fn serve_display(
    config: &SessionConfig,
    handoff: &Handoff<LaunchResult>,
) -> std::result::Result<(), LaunchError> {
    // Checked again here since the caller's probe and the spawn are not atomic.
    if linux::display_in_use(&config.tools, config.display) {
        let err = LaunchError::DisplayInUse {
            display: config.display,
        };
        handoff.send(Err(err.clone()));
        return Err(err);
    }

    let mut child = match linux::spawn_server(config) {
        Ok(child) => child,
        Err(e) => {
            handoff.send(Err(e.clone()));
            return Err(e);
        }
    };
    handoff.send(Ok(child.id()));

    let status = match child.wait() {
        Ok(status) => status,
        Err(e) => {
            let err = LaunchError::Wait {
                source: Arc::new(e),
            };
            handoff.send(Err(err.clone()));
            return Err(err);
        }
    };

    match linux::exit_error(status) {
        // Only reaches the caller if it has not picked up the PID yet.
        Some(err) => {
            handoff.send(Err(err.clone()));
            Err(err)
        }
        None => {
            debug!(display = config.display, %status, "display server exited");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_off_without_on_is_noop() {
        let mut session = Session::new(64, 48, 4090);
        session.off();
        session.off();
        assert!(!session.is_active());
        assert_eq!(session.pid(), None);
    }

    #[test]
    fn test_render_before_on() {
        let session = Session::new(64, 48, 4090);
        match session.render() {
            Err(SessionError::NotRunning { display }) => assert_eq!(display, 4090),
            other => panic!("expected NotRunning, got {:?}", other.map(|f| f.shape())),
        }
    }

    #[test]
    fn test_accessors() {
        let session = Session::new(320, 240, 12);
        assert_eq!(session.display_name(), ":12");
        assert_eq!((session.width(), session.height()), (320, 240));
        assert_eq!(session.config().depth, 24);
    }

    #[test]
    fn test_command_environment() {
        let session = Session::new(320, 240, 12);
        let cmd = session.command("simulate");
        let envs: Vec<_> = cmd
            .get_envs()
            .map(|(k, v)| (k.to_str().unwrap(), v.and_then(|v| v.to_str())))
            .collect();
        assert!(envs.contains(&("DISPLAY", Some(":12"))));
        assert!(envs.contains(&("MUJOCO_GL", Some("egl"))));
    }

    #[test]
    fn test_missing_server_binary_fails_launch() {
        let mut config = SessionConfig::new(64, 48, 4091);
        config.tools.xvfb = "/nonexistent/Xvfb".to_string();
        config.tools.probe = "false".to_string();
        config.poll_interval_ms = 5;

        let mut session = Session::with_config(config);
        let err = session.on().unwrap_err();
        assert!(matches!(err, SessionError::Launch(LaunchError::Spawn { .. })));
        assert!(!session.is_active());
    }
}
