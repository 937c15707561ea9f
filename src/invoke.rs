use std::{
    path::Path,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use crate::error::{FixtureError, FixtureResult};

/// Launches the external renderer against a generated movie file and waits
/// for it to finish or time out. One invocation per capture attempt; the
/// caller owns retry policy (there is none at this layer).
pub trait RendererInvoker: Send + Sync {
    fn invoke(&self, movie_path: &Path, working_dir: &Path, timeout: Duration) -> FixtureResult<()>;
}

/// Drives the standalone Flash debug player.
///
/// The player exits with code 1 in normal operation, so both 0 and 1 are
/// treated as success. On timeout the child is killed and the invocation
/// reports [`FixtureError::RendererTimeout`].
#[derive(Clone, Debug)]
pub struct FlashPlayerInvoker {
    pub program: String,
}

impl Default for FlashPlayerInvoker {
    fn default() -> Self {
        Self {
            program: "flashplayerdebugger".to_string(),
        }
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(25);

impl RendererInvoker for FlashPlayerInvoker {
    fn invoke(&self, movie_path: &Path, working_dir: &Path, timeout: Duration) -> FixtureResult<()> {
        let mut child = Command::new(&self.program)
            .arg(movie_path)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                FixtureError::renderer(format!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    self.program
                ))
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    // Exit code 1 is the player's benign shutdown status.
                    if status.success() || status.code() == Some(1) {
                        return Ok(());
                    }
                    return Err(FixtureError::renderer(format!(
                        "'{}' exited with unexpected status {status} for '{}'",
                        self.program,
                        movie_path.display()
                    )));
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(FixtureError::RendererTimeout(timeout));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(FixtureError::renderer(format!(
                        "failed to wait for '{}': {e}",
                        self.program
                    )));
                }
            }
        }
    }
}
