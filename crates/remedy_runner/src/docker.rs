//! Docker implementation of the sandbox.
//!
//! The working tree is streamed into the container as a tar archive before
//! the command starts, instead of being bind-mounted. Shared-mount semantics
//! are unreliable across nested virtualization; a one-shot archive upload is
//! not.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, UploadToContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::StreamExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RunnerError, RunnerResult};
use crate::sandbox::{Sandbox, SandboxResult};

/// Directory inside the container that receives the working tree.
const GUEST_WORKDIR: &str = "/workspace";

/// Docker-based sandbox.
pub struct DockerSandbox {
    client: Docker,
    timeout_secs: u64,
}

impl DockerSandbox {
    /// Connect to the local Docker daemon and verify it responds.
    pub async fn new() -> RunnerResult<Self> {
        let client = Docker::connect_with_local_defaults()?;
        client.ping().await?;

        Ok(Self {
            client,
            timeout_secs: 300,
        })
    }

    /// Override the per-command timeout (0 disables it).
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    async fn ensure_image(&self, image: &str) -> RunnerResult<()> {
        if self.client.inspect_image(image).await.is_ok() {
            return Ok(());
        }

        info!("Pulling image {}", image);
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.client.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            match result {
                Ok(progress) => {
                    if let Some(status) = progress.status {
                        debug!("Pull status: {}", status);
                    }
                }
                Err(e) => return Err(RunnerError::ImagePullFailed(e.to_string())),
            }
        }
        Ok(())
    }

    async fn create_container(&self, image: &str, command: &str) -> RunnerResult<String> {
        let name = format!("remedy-{}", &Uuid::new_v4().to_string()[..8]);

        let config = Config {
            image: Some(image.to_string()),
            cmd: Some(vec![
                "sh".to_string(),
                "-lc".to_string(),
                command.to_string(),
            ]),
            working_dir: Some(GUEST_WORKDIR.to_string()),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: &name,
            platform: None,
        };

        let container = self
            .client
            .create_container(Some(options), config)
            .await?;
        Ok(container.id)
    }

    /// Build a tar archive of `tree` rooted at `workspace/`, off the async
    /// runtime.
    async fn archive_tree(tree: &Path) -> RunnerResult<Vec<u8>> {
        let tree = tree.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut builder = tar::Builder::new(Vec::new());
            builder.follow_symlinks(false);
            builder
                .append_dir_all("workspace", &tree)
                .map_err(|e| RunnerError::ArchiveFailed(e.to_string()))?;
            builder
                .into_inner()
                .map_err(|e| RunnerError::ArchiveFailed(e.to_string()))
        })
        .await
        .map_err(|e| RunnerError::ArchiveFailed(e.to_string()))?
    }

    /// Transfer, start, wait, and capture. Teardown is handled by the caller
    /// so it runs exactly once on every exit path.
    async fn run_to_completion(
        &self,
        container_id: &str,
        tree: &Path,
        started: Instant,
    ) -> RunnerResult<SandboxResult> {
        let archive = Self::archive_tree(tree).await?;
        self.client
            .upload_to_container(
                container_id,
                Some(UploadToContainerOptions {
                    path: "/",
                    ..Default::default()
                }),
                archive.into(),
            )
            .await?;

        self.client
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await?;

        let wait_future = async {
            let mut wait_stream = self
                .client
                .wait_container(container_id, None::<WaitContainerOptions<String>>);

            match wait_stream.next().await {
                Some(Ok(exit)) => Ok(exit.status_code),
                Some(Err(e)) => Err(RunnerError::ExecutionFailed(e.to_string())),
                None => Err(RunnerError::ExecutionFailed(
                    "container wait stream ended unexpectedly".to_string(),
                )),
            }
        };

        let exit_code = if self.timeout_secs > 0 {
            match timeout(Duration::from_secs(self.timeout_secs), wait_future).await {
                Ok(result) => result?,
                Err(_) => {
                    let _ = self.client.stop_container(container_id, None).await;
                    let output = self.collect_output(container_id).await;
                    return Ok(SandboxResult::timeout(
                        self.timeout_secs,
                        output,
                        started.elapsed().as_millis() as u64,
                    ));
                }
            }
        } else {
            wait_future.await?
        };

        let output = self.collect_output(container_id).await;
        Ok(SandboxResult::from_exit(
            exit_code,
            output,
            started.elapsed().as_millis() as u64,
        ))
    }

    /// Stdout and stderr as one interleaved blob.
    async fn collect_output(&self, container_id: &str) -> String {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut output = String::new();
        let mut stream = self.client.logs(container_id, Some(options));
        while let Some(result) = stream.next().await {
            match result {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("log stream error: {}", e);
                    break;
                }
            }
        }
        output
    }

    /// Force-remove the container. Failures here must never mask the real
    /// result nor crash the caller.
    async fn teardown(&self, container_id: &str) {
        let result = self
            .client
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;

        if let Err(e) = result {
            warn!(container_id, "sandbox teardown failed: {}", e);
        }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    async fn is_available(&self) -> bool {
        self.client.ping().await.is_ok()
    }

    async fn execute(&self, tree: &Path, command: &str, image: &str) -> SandboxResult {
        let started = Instant::now();

        if let Err(e) = self.ensure_image(image).await {
            return SandboxResult::infrastructure_failure(format!(
                "image {} unavailable: {}",
                image, e
            ));
        }

        // Created but not started, so the tree transfer can happen first.
        let container_id = match self.create_container(image, command).await {
            Ok(id) => id,
            Err(e) => {
                return SandboxResult::infrastructure_failure(format!(
                    "failed to create sandbox from {}: {}",
                    image, e
                ));
            }
        };

        debug!(container_id, image, command, "sandbox created");

        let outcome = self.run_to_completion(&container_id, tree, started).await;
        self.teardown(&container_id).await;

        match outcome {
            Ok(result) => result,
            Err(e) => {
                SandboxResult::infrastructure_failure(format!("sandbox execution failed: {}", e))
            }
        }
    }
}
