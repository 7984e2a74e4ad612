//! Shared test doubles for hosts, command execution, and HTTP.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Mutex;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use rsprovision::RsprovisionError;
use rsprovision::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use rsprovision::fetch::HttpFetch;
use rsprovision::host::{Host, RemoteCommand};

/// Something a [`MockHost`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum HostEvent {
    Probe(String),
    Install { package: String, flags: Vec<String> },
    Exec(String),
    Scp { local: Utf8PathBuf, remote: String },
}

/// Host that records every call instead of touching a machine.
#[allow(dead_code)]
pub struct MockHost {
    pub name: String,
    pub platform: String,
    /// Probe names reported as already installed.
    pub present: HashSet<String>,
    /// Package whose installation fails.
    pub fail_install: Option<String>,
    /// Remote commands starting with this program fail.
    pub fail_program: Option<String>,
    pub events: RefCell<Vec<HostEvent>>,
}

#[allow(dead_code)]
impl MockHost {
    pub fn new(name: &str, platform: &str) -> Self {
        Self {
            name: name.to_string(),
            platform: platform.to_string(),
            present: HashSet::new(),
            fail_install: None,
            fail_program: None,
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn with_present(mut self, probe: &str) -> Self {
        self.present.insert(probe.to_string());
        self
    }

    pub fn failing_install(mut self, package: &str) -> Self {
        self.fail_install = Some(package.to_string());
        self
    }

    pub fn failing_program(mut self, program: &str) -> Self {
        self.fail_program = Some(program.to_string());
        self
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.borrow().clone()
    }

    pub fn installs(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Install { package, .. } => Some(package.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn execs(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Exec(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Host for MockHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &str {
        &self.platform
    }

    fn check_for_package(&self, name: &str) -> Result<bool> {
        self.events.borrow_mut().push(HostEvent::Probe(name.to_string()));
        Ok(self.present.contains(name))
    }

    fn install_package(&self, name: &str, extra_flags: &[String]) -> Result<()> {
        self.events.borrow_mut().push(HostEvent::Install {
            package: name.to_string(),
            flags: extra_flags.to_vec(),
        });
        if self.fail_install.as_deref() == Some(name) {
            anyhow::bail!("simulated install failure for {}", name);
        }
        Ok(())
    }

    fn exec(&self, command: &RemoteCommand) -> Result<()> {
        self.events.borrow_mut().push(HostEvent::Exec(command.to_string()));
        if self.fail_program.as_deref() == Some(command.program.as_str()) {
            anyhow::bail!("simulated failure of {}", command);
        }
        Ok(())
    }

    fn scp_to(&self, local: &Utf8Path, remote_dir: &str) -> Result<()> {
        self.events.borrow_mut().push(HostEvent::Scp {
            local: local.to_owned(),
            remote: remote_dir.to_string(),
        });
        Ok(())
    }
}

/// Records executed commands, optionally with a real exit code for one program.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingExecutor {
    pub calls: Mutex<Vec<CommandSpec>>,
    pub exit: Option<(String, i32)>,
}

#[allow(dead_code)]
impl RecordingExecutor {
    pub fn failing(command: &str, code: i32) -> Self {
        Self::exiting(command, code)
    }

    /// Reports exit `code` for `command` instead of a dry-run result.
    pub fn exiting(command: &str, code: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit: Some((command.to_string(), code)),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        self.calls.lock().unwrap().push(spec.clone());
        match &self.exit {
            Some((command, code)) if *command == spec.command => Ok(ExecutionResult {
                status: Some(ExitStatus::from_raw(code << 8)),
            }),
            _ => Ok(ExecutionResult { status: None }),
        }
    }
}

/// In-memory HTTP server with transfer and probe counters.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockFetcher {
    files: HashMap<String, Vec<u8>>,
    truncated: HashMap<String, Vec<u8>>,
    reachable: HashSet<String>,
    pub opened: Mutex<Vec<String>>,
    pub probed: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, url: &str, body: &[u8]) -> Self {
        self.files.insert(url.to_string(), body.to_vec());
        self
    }

    /// Serves `body` for `url`, then fails the read as if the connection dropped.
    pub fn with_truncated_file(mut self, url: &str, body: &[u8]) -> Self {
        self.truncated.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn with_reachable(mut self, url: &str) -> Self {
        self.reachable.insert(url.to_string());
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

impl HttpFetch for MockFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read>, RsprovisionError> {
        self.opened.lock().unwrap().push(url.to_string());
        if let Some(body) = self.truncated.get(url) {
            return Ok(Box::new(TruncatedReader {
                body: Cursor::new(body.clone()),
            }));
        }
        match self.files.get(url) {
            Some(body) => Ok(Box::new(Cursor::new(body.clone()))),
            None => Err(RsprovisionError::Fetch {
                url: url.to_string(),
                message: "HTTP status 404 Not Found".to_string(),
            }),
        }
    }

    fn exists(&self, url: &str) -> Result<bool, RsprovisionError> {
        self.probed.lock().unwrap().push(url.to_string());
        Ok(self.reachable.contains(url))
    }
}

/// Yields its body, then a connection reset instead of EOF.
struct TruncatedReader {
    body: Cursor<Vec<u8>>,
}

impl Read for TruncatedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.body.read(buf)? {
            0 => Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
            n => Ok(n),
        }
    }
}

/// Converts a temp dir path into a UTF-8 path.
#[allow(dead_code)]
pub fn utf8(path: &std::path::Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("path should be valid UTF-8")
}

/// Writes `yaml` as `profile.yaml` inside `dir` and returns its path.
#[allow(dead_code)]
pub fn write_profile(dir: &std::path::Path, yaml: &str) -> Utf8PathBuf {
    let path = utf8(dir).join("profile.yaml");
    std::fs::write(&path, yaml).expect("failed to write profile");
    path
}
