use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use wait_timeout::ChildExt;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_OSASCRIPT: &str = "osascript";

/// Failures of a single bridge call. Everything but `Parse` and `Decode` is an
/// execution failure.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to execute {binary}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Failed(String),
    #[error("{binary} timed out after {timeout_ms}ms")]
    TimedOut { binary: String, timeout_ms: u64 },
    #[error("Failed to parse osascript output: {raw}")]
    Parse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unexpected osascript result shape: {raw}")]
    Decode {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Executes one JXA script and hands back its raw standard output.
pub trait ScriptRunner {
    fn run(&self, script: &str) -> Result<String, BridgeError>;
}

#[derive(Debug, Clone)]
pub struct Osascript {
    pub binary: String,
    pub timeout: Duration,
}

impl Default for Osascript {
    fn default() -> Self {
        Self {
            binary: DEFAULT_OSASCRIPT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl Osascript {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl ScriptRunner for Osascript {
    fn run(&self, script: &str) -> Result<String, BridgeError> {
        tracing::debug!(
            binary = %self.binary,
            timeout_ms = self.timeout.as_millis() as u64,
            script_bytes = script.len(),
            "running jxa script"
        );
        let mut child = Command::new(&self.binary)
            .args(["-l", "JavaScript", "-e", script])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        // Drain both pipes while waiting so a large payload cannot stall the child.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                terminate(&mut child);
                tracing::debug!(binary = %self.binary, "jxa script timed out");
                return Err(BridgeError::TimedOut {
                    binary: self.binary.clone(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            Err(error) => {
                terminate(&mut child);
                return Err(BridgeError::Failed(error.to_string()));
            }
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);
        tracing::debug!(
            status = ?status.code(),
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "jxa script finished"
        );

        if !status.success() {
            let stderr = stderr.trim();
            if !stderr.is_empty() {
                return Err(BridgeError::Failed(stderr.to_string()));
            }
            return Err(BridgeError::Failed(match status.code() {
                Some(code) => format!("{} exited with status {code}", self.binary),
                None => format!("{} was terminated by a signal", self.binary),
            }));
        }
        Ok(stdout)
    }
}

fn drain<R>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Decode bridge output: empty output is an absent result, anything else must be JSON
/// of the requested shape.
pub fn parse_output<T: DeserializeOwned>(stdout: &str) -> Result<Option<T>, BridgeError> {
    let raw = stdout.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(raw).map_err(|source| BridgeError::Parse {
        raw: raw.to_string(),
        source,
    })?;
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| BridgeError::Decode {
            raw: raw.to_string(),
            source,
        })
}

/// Run `script` and decode its JSON result.
pub fn run_jxa<T: DeserializeOwned>(
    runner: &dyn ScriptRunner,
    script: &str,
) -> Result<Option<T>, BridgeError> {
    let stdout = runner.run(script)?;
    parse_output(&stdout)
}
