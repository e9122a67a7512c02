//! In-memory remote session used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use crate::config::AuthConfig;
use crate::error::DeployError;
use crate::session::{Connector, RemoteFs, RemoteSession, SessionFuture};
use crate::types::OutputChunk;

/// Every remote interaction, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Connect,
    DirExists(String),
    Mkdir(String),
    Upload(PathBuf, String),
    Exec(String),
    Close,
}

/// Scripted result of one command.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub chunks: Vec<OutputChunk>,
    pub exit_status: Option<i32>,
}

impl Script {
    pub fn stdout(text: &str) -> Self {
        Self {
            chunks: vec![OutputChunk::Stdout(text.as_bytes().to_vec())],
            exit_status: Some(0),
        }
    }

    pub fn stderr(text: &str) -> Self {
        Self {
            chunks: vec![OutputChunk::Stderr(text.as_bytes().to_vec())],
            exit_status: Some(0),
        }
    }

    pub fn exit(mut self, status: i32) -> Self {
        self.exit_status = Some(status);
        self
    }
}

#[derive(Default)]
struct State {
    dirs: HashSet<String>,
    calls: Vec<RemoteCall>,
    created: Vec<String>,
    uploaded: HashMap<String, Vec<u8>>,
    scripts: HashMap<String, Script>,
    fail_dir_check: HashSet<String>,
    fail_mkdir: HashSet<String>,
    fail_upload: HashSet<String>,
}

/// Shared-state mock; clones observe the same remote host.
#[derive(Clone, Default)]
pub struct MockSession {
    state: Arc<Mutex<State>>,
}

impl MockSession {
    pub fn with_dirs(dirs: &[&str]) -> Self {
        let session = Self::default();
        session
            .state
            .lock()
            .unwrap()
            .dirs
            .extend(dirs.iter().map(|d| d.to_string()));
        session
    }

    pub fn script(&self, command: &str, script: Script) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(command.to_string(), script);
    }

    pub fn fail_dir_check(&self, path: &str) {
        self.state.lock().unwrap().fail_dir_check.insert(path.into());
    }

    pub fn fail_mkdir(&self, path: &str) {
        self.state.lock().unwrap().fail_mkdir.insert(path.into());
    }

    pub fn fail_upload(&self, remote: &str) {
        self.state.lock().unwrap().fail_upload.insert(remote.into());
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Directories actually created, in order.
    pub fn mkdirs(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn uploaded(&self, remote: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().uploaded.get(remote).cloned()
    }

    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RemoteCall::Exec(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RemoteCall::Close))
            .count()
    }

    fn record(&self, call: RemoteCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn injected(what: &str) -> DeployError {
    DeployError::transport(format!("injected failure: {what}"))
}

impl RemoteFs for MockSession {
    fn dir_exists<'a>(&'a self, path: &'a str) -> SessionFuture<'a, bool> {
        Box::pin(async move {
            self.record(RemoteCall::DirExists(path.to_string()));
            let state = self.state.lock().unwrap();
            if state.fail_dir_check.contains(path) {
                return Err(injected(path));
            }
            Ok(state.dirs.contains(path))
        })
    }

    fn mkdir<'a>(&'a self, path: &'a str) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.record(RemoteCall::Mkdir(path.to_string()));
            let mut state = self.state.lock().unwrap();
            if state.fail_mkdir.contains(path) {
                return Err(injected(path));
            }
            state.dirs.insert(path.to_string());
            state.created.push(path.to_string());
            Ok(())
        })
    }
}

impl RemoteSession for MockSession {
    fn upload<'a>(&'a self, local: &'a Path, remote: &'a str) -> SessionFuture<'a, u64> {
        Box::pin(async move {
            self.record(RemoteCall::Upload(local.to_path_buf(), remote.to_string()));
            if self.state.lock().unwrap().fail_upload.contains(remote) {
                return Err(injected(remote));
            }
            let data = std::fs::read(local)?;
            let len = data.len() as u64;
            self.state
                .lock()
                .unwrap()
                .uploaded
                .insert(remote.to_string(), data);
            Ok(len)
        })
    }

    fn exec<'a>(
        &'a self,
        command: &'a str,
        output: UnboundedSender<OutputChunk>,
    ) -> SessionFuture<'a, Option<i32>> {
        Box::pin(async move {
            self.record(RemoteCall::Exec(command.to_string()));
            let script = self
                .state
                .lock()
                .unwrap()
                .scripts
                .get(command)
                .cloned()
                .unwrap_or_default();
            for chunk in script.chunks {
                let _ = output.send(chunk);
                tokio::task::yield_now().await;
            }
            Ok(script.exit_status)
        })
    }

    fn close(&self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            self.record(RemoteCall::Close);
            Ok(())
        })
    }
}

/// Connector handing out clones of one [`MockSession`].
#[derive(Clone, Default)]
pub struct MockConnector {
    pub session: MockSession,
    pub refuse: bool,
}

impl MockConnector {
    pub fn new(session: MockSession) -> Self {
        Self {
            session,
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            session: MockSession::default(),
            refuse: true,
        }
    }
}

impl Connector for MockConnector {
    fn connect<'a>(&'a self, _auth: &'a AuthConfig) -> SessionFuture<'a, Box<dyn RemoteSession>> {
        Box::pin(async move {
            self.session.record(RemoteCall::Connect);
            if self.refuse {
                return Err(DeployError::transport("connection refused"));
            }
            Ok(Box::new(self.session.clone()) as Box<dyn RemoteSession>)
        })
    }
}
