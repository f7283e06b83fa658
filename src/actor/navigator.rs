//! Moves the focused space by replaying the system's "previous/next space"
//! shortcut, one step at a time.
//!
//! Mission Control only processes one space switch gesture at a time; bursts
//! of key events get dropped or reordered, so every step is awaited before
//! the next one is sent.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, instrument, trace};

use crate::common::config::NavigationSettings;
use crate::common::error::{Error, Result};

const KEY_CODE_LEFT_ARROW: u16 = 123;
const KEY_CODE_RIGHT_ARROW: u16 = 124;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    /// Arrow key that, with control held, switches one space this way.
    pub fn key_code(self) -> u16 {
        match self {
            Direction::Backward => KEY_CODE_LEFT_ARROW,
            Direction::Forward => KEY_CODE_RIGHT_ARROW,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Backward => f.write_str("backward"),
            Direction::Forward => f.write_str("forward"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationRequest {
    pub current: u32,
    pub desired: u32,
}

impl NavigationRequest {
    pub fn steps(&self) -> usize { self.current.abs_diff(self.desired) as usize }

    pub fn direction(&self) -> Direction {
        if self.current > self.desired { Direction::Backward } else { Direction::Forward }
    }
}

/// Something that can move the focused space by exactly one step.
pub trait SpaceSwitcher {
    fn step(&self, direction: Direction) -> impl Future<Output = anyhow::Result<()>>;
}

/// Sends ctrl+arrow through System Events.
#[derive(Debug, Clone)]
pub struct OsascriptSwitcher {
    program: PathBuf,
}

impl OsascriptSwitcher {
    pub fn new(settings: &NavigationSettings) -> Self {
        Self { program: settings.osascript.clone() }
    }
}

impl SpaceSwitcher for OsascriptSwitcher {
    async fn step(&self, direction: Direction) -> anyhow::Result<()> {
        let script = format!(
            "tell app \"System Events\" to key code {} using control down",
            direction.key_code()
        );
        let output = Command::new(&self.program)
            .arg("-e")
            .arg(&script)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program.display()))?;
        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

pub struct SpaceNavigator<S> {
    switcher: S,
}

impl<S: SpaceSwitcher> SpaceNavigator<S> {
    pub fn new(switcher: S) -> Self { Self { switcher } }

    /// Steps from `current` to `desired`, returning how many steps were
    /// taken. The first failing step aborts the rest.
    ///
    /// Concurrent calls are not serialized; their steps may interleave.
    #[instrument(level = "debug", skip(self))]
    pub async fn navigate(&self, current: u32, desired: u32) -> Result<usize> {
        let request = NavigationRequest { current, desired };
        let steps = request.steps();
        let direction = request.direction();
        if steps == 0 {
            trace!("Already on the desired space");
            return Ok(0);
        }

        debug!(steps, %direction, "Switching space");
        for step in 1..=steps {
            self.switcher.step(direction).await.map_err(|err| {
                Error::NavigationCommandFailure {
                    step,
                    direction,
                    reason: format!("{err:#}"),
                }
            })?;
            trace!(step, "Space step completed");
        }
        Ok(steps)
    }
}
