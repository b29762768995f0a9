//! Python kernel: a persistent interpreter process
//!
//! The kernel starts one `python3` child running a small driver and talks to
//! it with newline-delimited JSON. Every cell on a page shares the child's
//! global namespace, like the single interpreter instance a page would
//! embed. Per request the driver redirects stdout into a buffer owned by that
//! request, so output never bleeds between sessions.
//!
//! Wire format (one JSON object per line):
//!
//! ```text
//! -> {"op": "load", "imports": [..], "installs": [..], "bootstrap": ".."}
//! -> {"op": "exec", "code": ".."}
//! <- {"event": "ready", "version": "3.12.1"}        (once, at startup)
//! <- {"event": "draw", "payload": ".."}             (zero or more)
//! <- {"event": "debug", "text": ".."}               (zero or more)
//! <- {"event": "result", "ok": true, "value": "..", "stdout": ".."}
//! <- {"event": "result", "ok": false, "error": "..", "stdout": ".."}
//! ```
//!
//! Requests are serialized: the process is locked for the whole exchange.

use crate::abi::{ExecutionFailure, KernelError};
use crate::context::ExecutionContext;
use crate::interpreter::{Interpreter, Preload};
use parking_lot::Mutex;
use runcell_types::DrawPayload;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

const DRIVER: &str = include_str!("driver.py");

/// How to launch the interpreter process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default = "default_program")]
    pub program: String,

    /// Extra interpreter arguments, placed before the driver
    #[serde(default)]
    pub args: Vec<String>,

    /// Directory the interpreter starts in
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

fn default_program() -> String {
    String::from("python3")
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            working_dir: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum KernelRequest<'a> {
    Exec {
        code: &'a str,
    },
    Load {
        imports: &'a [String],
        installs: &'a [String],
        bootstrap: &'a str,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum KernelEvent {
    Ready {
        version: String,
    },
    Draw {
        payload: String,
    },
    Debug {
        text: String,
    },
    Result {
        ok: bool,
        #[serde(default)]
        value: String,
        #[serde(default)]
        error: String,
        #[serde(default)]
        stdout: String,
    },
}

/// Final reply to one request
#[derive(Debug)]
struct Reply {
    ok: bool,
    value: String,
    error: String,
    stdout: String,
}

struct KernelIo {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl KernelIo {
    fn send(&mut self, request: &KernelRequest<'_>) -> Result<(), KernelError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| KernelError::Protocol(e.to_string()))?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.flush()?;
        Ok(())
    }

    fn next_event(&mut self) -> Result<KernelEvent, KernelError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(KernelError::Exited);
            }
            if !line.trim().is_empty() {
                break;
            }
        }
        serde_json::from_str(line.trim())
            .map_err(|e| KernelError::Protocol(format!("{}: {}", e, line.trim())))
    }
}

pub struct PythonKernel {
    io: Mutex<KernelIo>,
    child: Mutex<Child>,
    version: String,
}

impl PythonKernel {
    /// Start the interpreter and wait for the driver's ready message
    pub fn spawn(config: &KernelConfig) -> Result<Self, KernelError> {
        tracing::info!(program = %config.program, "Starting Python kernel");

        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .arg("-u")
            .arg("-c")
            .arg(DRIVER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|source| KernelError::Spawn {
                program: config.program.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| KernelError::Protocol("no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| KernelError::Protocol("no stdout".to_string()))?;

        let mut io = KernelIo {
            stdin,
            stdout: BufReader::new(stdout),
        };

        let version = match io.next_event() {
            Ok(KernelEvent::Ready { version }) => version,
            Ok(other) => {
                let _ = child.kill();
                return Err(KernelError::Protocol(format!(
                    "expected ready message, got {:?}",
                    other
                )));
            }
            Err(e) => {
                let _ = child.kill();
                return Err(e);
            }
        };

        tracing::info!(version = %version, pid = child.id(), "Python kernel ready");

        Ok(Self {
            io: Mutex::new(io),
            child: Mutex::new(child),
            version,
        })
    }

    /// Python version reported by the driver
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Send one request and pump events until its result arrives.
    ///
    /// Draw and debug events go to `ctx` when present.
    fn roundtrip(
        &self,
        request: &KernelRequest<'_>,
        mut ctx: Option<&mut ExecutionContext>,
    ) -> Result<Reply, KernelError> {
        let mut io = self.io.lock();
        io.send(request)?;

        loop {
            match io.next_event()? {
                KernelEvent::Draw { payload } => match ctx.as_deref_mut() {
                    Some(ctx) => {
                        ctx.draw(&DrawPayload::new(payload));
                    }
                    None => tracing::warn!("Draw call outside of a session run"),
                },
                KernelEvent::Debug { text } => match ctx.as_deref() {
                    Some(ctx) => ctx.debug(&text),
                    None => tracing::debug!("{}", text),
                },
                KernelEvent::Result {
                    ok,
                    value,
                    error,
                    stdout,
                } => {
                    return Ok(Reply {
                        ok,
                        value,
                        error,
                        stdout,
                    })
                }
                KernelEvent::Ready { .. } => {
                    return Err(KernelError::Protocol(
                        "unexpected ready message".to_string(),
                    ))
                }
            }
        }
    }
}

impl Interpreter for PythonKernel {
    fn load(&self, preload: &Preload) -> Result<(), KernelError> {
        tracing::info!(
            imports = preload.imports.len(),
            installs = preload.installs.len(),
            "Preloading interpreter"
        );

        let reply = self.roundtrip(
            &KernelRequest::Load {
                imports: &preload.imports,
                installs: &preload.installs,
                bootstrap: &preload.bootstrap,
            },
            None,
        )?;

        if !reply.stdout.is_empty() {
            tracing::debug!(output = %reply.stdout, "Preload output");
        }

        if reply.ok {
            Ok(())
        } else {
            Err(KernelError::Load(reply.error))
        }
    }

    fn execute(&self, code: &str, ctx: &mut ExecutionContext) -> Result<String, ExecutionFailure> {
        let reply = self
            .roundtrip(&KernelRequest::Exec { code }, Some(ctx))
            .map_err(|e| ExecutionFailure::new(e.to_string()))?;

        ctx.write_stdout(&reply.stdout);
        if reply.ok {
            Ok(reply.value)
        } else {
            Err(ExecutionFailure::new(reply.error))
        }
    }
}

impl Drop for PythonKernel {
    fn drop(&mut self) {
        let mut child = self.child.lock();
        if let Err(e) = child.kill() {
            tracing::debug!(error = %e, "Kernel already stopped");
        }
        let _ = child.wait();
    }
}
