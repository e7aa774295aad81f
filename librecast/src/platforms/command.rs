//! Publish by delegating to an external posting command.
//!
//! Recast composes with whatever posting CLI the user already has: the
//! configured command is invoked once per publish with the target account as
//! an argument and the post content on stdin. Exit status zero means
//! published; the first line of stdout, when present, is taken as the
//! platform post id.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{PlatformError, Result};
use crate::types::QueuedPost;

use super::Platform;

pub struct CommandPlatform {
    program: String,
    args: Vec<String>,
}

impl CommandPlatform {
    /// Build from a shell-less command line: the first word is the program,
    /// the rest are fixed arguments. The account is appended per call.
    pub fn new(command_line: &str) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next().ok_or_else(|| {
            PlatformError::Posting("publish command is empty".to_string())
        })?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

#[async_trait]
impl Platform for CommandPlatform {
    async fn publish(&self, post: &QueuedPost, account: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--account")
            .arg(account)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PlatformError::Posting(format!("failed to spawn {}: {}", self.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(post.content.as_bytes())
                .await
                .map_err(|e| PlatformError::Network(format!("failed to write post: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PlatformError::Network(format!("publish command failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlatformError::Posting(format!(
                "publish command exited with {}: {}",
                output.status,
                stderr.trim()
            ))
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().to_string())
    }

    fn name(&self) -> &str {
        &self.program
    }
}
