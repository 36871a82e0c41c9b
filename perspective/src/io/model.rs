//! Model backend abstraction.
//!
//! The [`ModelClient`] trait decouples the triggers from the actual language
//! model transport. Tests use scripted clients that return predetermined
//! replies without spawning processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::io::config::ModelConfig;
use crate::io::process::run_with_input;

/// A single synchronous model capability.
pub trait ModelClient {
    /// Ask the model playing `role` to answer `payload`; returns free text.
    fn call(&self, role: &str, payload: &Value, temperature: f32) -> Result<String>;
}

impl<M: ModelClient + ?Sized> ModelClient for &M {
    fn call(&self, role: &str, payload: &Value, temperature: f32) -> Result<String> {
        (**self).call(role, payload, temperature)
    }
}

/// Request written to a [`CommandModel`]'s stdin.
#[derive(Debug, Serialize)]
struct CommandRequest<'a> {
    role: &'a str,
    temperature: f32,
    payload: &'a Value,
}

/// Model client that spawns a configured program per call.
///
/// The program receives `{"role", "temperature", "payload"}` as JSON on stdin
/// and must print the model's reply on stdout.
#[derive(Debug, Clone)]
pub struct CommandModel {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandModel {
    pub fn new(command: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Result<Self> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            bail!("model command must name a program");
        }
        Ok(Self {
            command,
            timeout,
            output_limit_bytes,
        })
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Self::new(
            config.command.clone(),
            Duration::from_secs(config.timeout_secs),
            config.output_limit_bytes,
        )
    }
}

impl ModelClient for CommandModel {
    #[instrument(skip_all, fields(role = %role, temperature = temperature, program = %self.command[0]))]
    fn call(&self, role: &str, payload: &Value, temperature: f32) -> Result<String> {
        info!("calling model command");

        let request = CommandRequest {
            role,
            temperature,
            payload,
        };
        let input = serde_json::to_vec(&request).context("serialize model request")?;

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        let output = run_with_input(cmd, &input, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run model command {}", self.command[0]))?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "model command timed out");
            return Err(anyhow!("model command timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            let stderr = output.stderr_text();
            warn!(exit_code = ?output.status.code(), "model command failed");
            return Err(anyhow!(
                "model command failed with status {:?}: {}",
                output.status.code(),
                stderr.trim()
            ));
        }

        let reply = output.stdout_text();
        debug!(reply_len = reply.len(), "model command replied");
        Ok(reply)
    }
}
