//! # Script Host
//!
//! The last step of every `x-$` directive: the expanded value is handed to
//! a [`ScriptHost`] together with the directive key and its breadcrumb,
//! and the host's reply replaces it in the document. Hosts share no state
//! with the pipeline.
//!
//! ## Process Protocol
//!
//! [`ProcessHost`] runs an external command once per directive. The
//! request is written to stdin as one JSON object:
//!
//! ```json
//! {"key": "x-$path", "value": {...}, "path": ["paths", "/pet", "get"]}
//! ```
//!
//! The reply is read from stdout as JSON. An empty or `null` reply is
//! treated as `{}`, which removes the directive. The command is killed if
//! it does not finish within the configured timeout.

use std::process::Stdio;
use std::time::Duration;

use docapi_core::{Node, OrderedMap};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::HostError;

/// Filters the value of a host directive.
pub trait ScriptHost: Send + Sync {
    fn filter(&self, key: &str, value: Node, breadcrumb: &[String]) -> Result<Node, HostError>;
}

/// Host used when no script is configured: returns the value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHost;

impl ScriptHost for IdentityHost {
    fn filter(&self, _key: &str, value: Node, _breadcrumb: &[String]) -> Result<Node, HostError> {
        Ok(value)
    }
}

/// Default time a host process may take per directive.
pub const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Host backed by an external command speaking JSON over stdio.
#[derive(Debug)]
pub struct ProcessHost {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    runtime: tokio::runtime::Runtime,
}

impl ProcessHost {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, HostError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            program: program.into(),
            args,
            timeout,
            runtime,
        })
    }

    /// Build a host from a whitespace-separated command line such as
    /// `node filter.js`.
    pub fn from_command_line(command: &str, timeout: Duration) -> Result<Self, HostError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| HostError::Spawn {
            command: command.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;
        Self::new(program, parts.collect(), timeout)
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run(&self, request: Vec<u8>) -> Result<Vec<u8>, HostError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HostError::Spawn {
                command: self.command_line(),
                source,
            })?;

        // The request is written while stdout is drained; a host that echoes
        // as it reads would otherwise fill its stdout pipe and stall.
        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(&request).await {
                    // A host that exits without reading its input is judged
                    // by its exit status below.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
                // Dropping stdin closes the pipe so the host sees EOF.
                drop(stdin);
            }
            Ok::<(), std::io::Error>(())
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        written?;
        let output = output?;
        if !output.status.success() {
            return Err(HostError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl ScriptHost for ProcessHost {
    fn filter(&self, key: &str, value: Node, breadcrumb: &[String]) -> Result<Node, HostError> {
        let mut request = OrderedMap::new();
        request.push("key", Node::from(key));
        request.push("value", value);
        request.push(
            "path",
            Node::List(breadcrumb.iter().map(|s| Node::from(s.as_str())).collect()),
        );
        let request = Node::Map(request).to_json_compact()?.into_bytes();

        // The timer must be created inside the runtime.
        let outcome = self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, self.run(request)).await });
        let stdout = match outcome {
            Ok(result) => result?,
            Err(_) => {
                return Err(HostError::Timeout {
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        };

        let reply = String::from_utf8_lossy(&stdout);
        let reply = reply.trim();
        debug!(key = %key, bytes = reply.len(), "script host replied");
        if reply.is_empty() || reply == "null" {
            return Ok(Node::Map(OrderedMap::new()));
        }
        Ok(Node::from_json_str(reply)?)
    }
}
