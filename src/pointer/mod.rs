//! Moves the system pointer on behalf of the recording client.

use std::process::Command;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};

/// Something that can warp the OS pointer to absolute screen coordinates.
/// Calls are blocking; the websocket handler runs them on a blocking worker.
pub trait PointerDriver: Send + Sync {
    fn move_to(&self, x: f64, y: f64) -> Result<()>;
}

/// Shells out to the platform's pointer tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPointer;

impl PointerDriver for SystemPointer {
    fn move_to(&self, x: f64, y: f64) -> Result<()> {
        let (x, y) = (x.round() as i64, y.round() as i64);
        let mut command = platform_command(x, y)?;
        let status = command
            .status()
            .with_context(|| format!("failed to spawn pointer command {command:?}"))?;
        if !status.success() {
            bail!("pointer command exited with {status}");
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn platform_command(x: i64, y: i64) -> Result<Command> {
    let mut command = Command::new("xdotool");
    command.args(["mousemove", &x.to_string(), &y.to_string()]);
    Ok(command)
}

#[cfg(target_os = "macos")]
fn platform_command(x: i64, y: i64) -> Result<Command> {
    let mut command = Command::new("cliclick");
    command.arg(format!("m:{x},{y}"));
    Ok(command)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn platform_command(_x: i64, _y: i64) -> Result<Command> {
    bail!("moving the pointer is not supported on this platform")
}

/// Records requested moves instead of performing them. Used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingPointer {
    moves: Mutex<Vec<(f64, f64)>>,
    fail: bool,
}

impl RecordingPointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver whose every move fails.
    pub fn failing() -> Self {
        Self {
            moves: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn moves(&self) -> Vec<(f64, f64)> {
        match self.moves.lock() {
            Ok(moves) => moves.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PointerDriver for RecordingPointer {
    fn move_to(&self, x: f64, y: f64) -> Result<()> {
        if self.fail {
            bail!("pointer unavailable");
        }
        match self.moves.lock() {
            Ok(mut moves) => moves.push((x, y)),
            Err(poisoned) => poisoned.into_inner().push((x, y)),
        }
        Ok(())
    }
}
