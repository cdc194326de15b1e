pub mod error;

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use anyhow::Context;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::ToolConfig;
pub use error::GenerateError;

/// Payload handed to the external tool: which capability to call and with what.
#[derive(Debug, Serialize)]
pub struct ToolDescriptor<'a> {
    pub server_name: &'a str,
    pub tool_name: &'a str,
    pub arguments: ToolArguments<'a>,
}

#[derive(Debug, Serialize)]
pub struct ToolArguments<'a> {
    pub prompt: &'a str,
}

/// A descriptor written to disk for the lifetime of one invocation.
/// `remove` deletes it once the tool is done; if the request is abandoned
/// first, `Drop` deletes it instead.
struct DescriptorFile {
    path: PathBuf,
    removed: bool,
}

impl DescriptorFile {
    async fn create(dir: &Path, descriptor: &ToolDescriptor<'_>) -> anyhow::Result<Self> {
        let payload = serde_json::to_vec(descriptor).context("Failed to serialize tool descriptor")?;
        let path = dir.join(format!("image-request-{}.json", Uuid::new_v4()));

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to create descriptor {}", path.display()))?;

        // From here on the guard owns the path, so a failed write still cleans up.
        let guard = Self {
            path,
            removed: false,
        };
        file.write_all(&payload)
            .await
            .with_context(|| format!("Failed to write descriptor {}", guard.path.display()))?;
        file.flush().await.context("Failed to flush descriptor")?;

        Ok(guard)
    }

    async fn remove(mut self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove descriptor {}: {}", self.path.display(), e);
            }
        }
        self.removed = true;
    }
}

impl Drop for DescriptorFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        // Blocking, but only reached when the request future is dropped mid-flight.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove descriptor {}: {}", self.path.display(), e);
            }
        }
    }
}

// Relays prompts to the external image tool
pub struct ImageGenerator {
    config: ToolConfig,
}

impl ImageGenerator {
    pub fn new(config: ToolConfig) -> Self {
        info!(
            "Image tool: {} {} (server {}, tool {}, timeout {}s)",
            config.command,
            config.args.join(" "),
            config.server_name,
            config.tool_name,
            config.timeout.as_secs()
        );
        Self { config }
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<String, GenerateError> {
        if prompt.is_empty() {
            return Err(GenerateError::InvalidInput);
        }

        info!("Generating image for prompt ({} characters)", prompt.len());
        debug!("Prompt: {}", prompt);

        let descriptor = ToolDescriptor {
            server_name: &self.config.server_name,
            tool_name: &self.config.tool_name,
            arguments: ToolArguments { prompt },
        };

        let descriptor_file = DescriptorFile::create(&self.config.descriptor_dir, &descriptor).await?;
        debug!("Descriptor written to {}", descriptor_file.path.display());

        let output = self.run_tool(&descriptor_file.path).await;
        descriptor_file.remove().await;
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("Image tool exited with {}", output.status);
            return Err(GenerateError::GenerationFailed {
                code: output.status.code(),
                stderr,
            });
        }

        let url = extract_url(&output.stdout)?;
        info!("Image generated: {}", url);
        Ok(url)
    }

    async fn run_tool(&self, descriptor: &Path) -> Result<Output, GenerateError> {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .arg(descriptor)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to start image tool {}", self.config.command))?;

        // Dropping the child on timeout (or when the request is abandoned) kills it.
        match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(result) => Ok(result.context("Failed to collect image tool output")?),
            Err(_) => {
                warn!(
                    "Image tool did not finish within {}s, killing it",
                    self.config.timeout.as_secs()
                );
                Err(GenerateError::Timeout(self.config.timeout))
            }
        }
    }
}

fn extract_url(stdout: &[u8]) -> Result<String, GenerateError> {
    debug!("Image tool stdout: {}", String::from_utf8_lossy(stdout));

    let response: Value = match serde_json::from_slice(stdout) {
        Ok(value) => value,
        Err(e) => {
            warn!("Image tool output is not JSON: {}", e);
            return Err(GenerateError::MissingResult);
        }
    };

    response
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or(GenerateError::MissingResult)
}
