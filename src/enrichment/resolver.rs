use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::config::ResolverConfig;

use super::{IdentityResolver, SnapshotImage};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Failed to write snapshot to {dir}: {source}")]
    Snapshot {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Face recognition timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Face recognition exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("Face recognition returned no result")]
    EmptyOutput,
}

/// Runs an external face recognition program on a snapshot file.
///
/// The program gets the configured arguments followed by the path of a
/// temporary image file, and prints the recognized name on its first line.
pub struct CommandIdentityResolver {
    config: ResolverConfig,
}

impl CommandIdentityResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    async fn write_snapshot(&self, image: &SnapshotImage) -> Result<NamedTempFile, ResolveError> {
        let snapshot_error = |source: std::io::Error| ResolveError::Snapshot {
            dir: self.config.snapshot_dir.clone(),
            source,
        };
        let dir = self.config.snapshot_dir.clone();
        let file = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix("snapshot_")
                .suffix(".jpg")
                .tempfile_in(dir)
        })
        .await
        .map_err(std::io::Error::other)
        .and_then(|created| created)
        .map_err(snapshot_error)?;
        tokio::fs::write(file.path(), image.as_bytes())
            .await
            .map_err(snapshot_error)?;
        Ok(file)
    }

    async fn run(&self, snapshot: &Path) -> Result<String, ResolveError> {
        let program = &self.config.program;
        let mut command = Command::new(program);
        command
            .args(&self.config.args)
            .arg(snapshot)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.config.timeout, command.output())
            .await
            .map_err(|_| ResolveError::TimedOut(self.config.timeout))?
            .map_err(|source| ResolveError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ResolveError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        first_line(&output.stdout).ok_or(ResolveError::EmptyOutput)
    }
}

fn first_line(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned)
}

#[async_trait::async_trait]
impl IdentityResolver for CommandIdentityResolver {
    #[instrument(skip_all)]
    async fn resolve(&self, image: SnapshotImage) -> Result<String, ResolveError> {
        let snapshot = self.write_snapshot(&image).await?;
        drop(image);
        debug!(path = %snapshot.path().display(), "Running face recognition");

        let result = self.run(snapshot.path()).await;

        // The file is also removed on drop if this future is cancelled.
        if let Err(error) = snapshot.close() {
            warn!(%error, "Failed to remove snapshot file");
        }
        result
    }
}
