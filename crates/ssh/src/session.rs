//! libssh2-backed [`RemoteSession`].
//!
//! libssh2 calls block, so each operation runs on `spawn_blocking` with
//! a clone of the session handle.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use ssh2::{ErrorCode, Session, Sftp};
use sshdeploy_core::{DeployError, OutputChunk, RemoteFs, RemoteSession, SessionFuture};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::SshError;
use crate::{COPY_BUFFER_SIZE, DIR_MODE, EXEC_POLL_INTERVAL};

/// An authenticated SSH session with its SFTP channel.
pub struct SshSession {
    session: Session,
    sftp: Arc<Mutex<Option<Sftp>>>,
}

impl SshSession {
    pub(crate) fn new(session: Session, sftp: Sftp) -> Self {
        Self {
            session,
            sftp: Arc::new(Mutex::new(Some(sftp))),
        }
    }

    /// Runs `op` against the SFTP channel on a blocking thread.
    async fn with_sftp<T, F>(&self, op: F) -> Result<T, SshError>
    where
        T: Send + 'static,
        F: FnOnce(&Sftp) -> Result<T, SshError> + Send + 'static,
    {
        let sftp = Arc::clone(&self.sftp);
        tokio::task::spawn_blocking(move || {
            let guard = sftp.lock().map_err(|_| SshError::Closed)?;
            let sftp = guard.as_ref().ok_or(SshError::Closed)?;
            op(sftp)
        })
        .await?
    }
}

impl RemoteFs for SshSession {
    fn dir_exists<'a>(&'a self, path: &'a str) -> SessionFuture<'a, bool> {
        let owned = path.to_string();
        Box::pin(async move {
            let exists = self
                .with_sftp(move |sftp| match sftp.opendir(Path::new(&owned)) {
                    Ok(_) => Ok(true),
                    Err(e) if is_sftp_status(&e) => Ok(false),
                    Err(e) => Err(SshError::from(e)),
                })
                .await?;
            Ok(exists)
        })
    }

    fn mkdir<'a>(&'a self, path: &'a str) -> SessionFuture<'a, ()> {
        let owned = path.to_string();
        Box::pin(async move {
            self.with_sftp(move |sftp| Ok(sftp.mkdir(Path::new(&owned), DIR_MODE)?))
                .await?;
            Ok(())
        })
    }
}

impl RemoteSession for SshSession {
    fn upload<'a>(&'a self, local: &'a Path, remote: &'a str) -> SessionFuture<'a, u64> {
        let remote = remote.to_string();
        Box::pin(async move {
            // Local failures are I/O errors, not transport errors.
            let file = File::open(local).map_err(DeployError::Io)?;
            let bytes = self
                .with_sftp(move |sftp| {
                    let mut reader = io::BufReader::with_capacity(COPY_BUFFER_SIZE, file);
                    let mut target = sftp.create(Path::new(&remote))?;
                    copy_then_close(&mut reader, &mut target, ssh2::File::close)
                })
                .await?;
            Ok(bytes)
        })
    }

    fn exec<'a>(
        &'a self,
        command: &'a str,
        output: UnboundedSender<OutputChunk>,
    ) -> SessionFuture<'a, Option<i32>> {
        let session = self.session.clone();
        let command = command.to_string();
        Box::pin(async move {
            let status =
                tokio::task::spawn_blocking(move || exec_blocking(&session, &command, output))
                    .await
                    .map_err(SshError::from)??;
            Ok(status)
        })
    }

    fn close(&self) -> SessionFuture<'_, ()> {
        let session = self.session.clone();
        let sftp = Arc::clone(&self.sftp);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || -> Result<(), SshError> {
                // Drop the SFTP channel before the session goes away.
                if let Ok(mut guard) = sftp.lock() {
                    guard.take();
                }
                session.disconnect(None, "deployment finished", None)?;
                Ok(())
            })
            .await
            .map_err(SshError::from)??;
            debug!("ssh session closed");
            Ok(())
        })
    }
}

/// Copies everything, then closes `target` so errors reported on close
/// fail the upload.
fn copy_then_close<W: Write>(
    reader: &mut impl Read,
    target: &mut W,
    close: impl FnOnce(&mut W) -> Result<(), ssh2::Error>,
) -> Result<u64, SshError> {
    let bytes = io::copy(reader, target)?;
    target.flush()?;
    close(target)?;
    Ok(bytes)
}

/// SFTP status replies (no such file, not a directory, permission
/// denied, ...) mean "not there"; anything else is a transport failure.
fn is_sftp_status(err: &ssh2::Error) -> bool {
    matches!(err.code(), ErrorCode::SFTP(_))
}

/// Restores blocking mode when dropped.
struct NonBlocking<'s>(&'s Session);

impl<'s> NonBlocking<'s> {
    fn enter(session: &'s Session) -> Self {
        session.set_blocking(false);
        Self(session)
    }
}

impl Drop for NonBlocking<'_> {
    fn drop(&mut self) {
        self.0.set_blocking(true);
    }
}

/// Runs one command, forwarding output until the remote side closes.
///
/// Both streams are polled without blocking so a chatty stderr can never
/// stall stdout (or the reverse).
fn exec_blocking(
    session: &Session,
    command: &str,
    output: UnboundedSender<OutputChunk>,
) -> Result<Option<i32>, SshError> {
    let mut channel = session.channel_session()?;
    channel.exec(command)?;

    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    {
        let _mode = NonBlocking::enter(session);
        loop {
            let mut progressed = false;

            if let Some(n) = read_available(&mut channel, &mut buf)? {
                let _ = output.send(OutputChunk::Stdout(buf[..n].to_vec()));
                progressed = true;
            }
            if let Some(n) = read_available(&mut channel.stderr(), &mut buf)? {
                let _ = output.send(OutputChunk::Stderr(buf[..n].to_vec()));
                progressed = true;
            }

            if !progressed {
                if channel.eof() {
                    break;
                }
                std::thread::sleep(EXEC_POLL_INTERVAL);
            }
        }
    }

    // Anything that raced in with EOF.
    let mut rest = Vec::new();
    channel.read_to_end(&mut rest)?;
    if !rest.is_empty() {
        let _ = output.send(OutputChunk::Stdout(rest));
    }
    let mut rest = Vec::new();
    channel.stderr().read_to_end(&mut rest)?;
    if !rest.is_empty() {
        let _ = output.send(OutputChunk::Stderr(rest));
    }

    channel.wait_close()?;
    match channel.exit_status() {
        Ok(status) => Ok(Some(status)),
        Err(e) => {
            warn!(error = %e, "no exit status reported");
            Ok(None)
        }
    }
}

/// One non-blocking read; `None` when nothing is available right now.
fn read_available(stream: &mut impl Read, buf: &mut [u8]) -> Result<Option<usize>, SshError> {
    match stream.read(buf) {
        Ok(0) => Ok(None),
        Ok(n) => Ok(Some(n)),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(SshError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sftp_status_means_absent() {
        let missing = ssh2::Error::new(ErrorCode::SFTP(2), "no such file");
        assert!(is_sftp_status(&missing));

        let dropped = ssh2::Error::new(ErrorCode::Session(-7), "socket send failed");
        assert!(!is_sftp_status(&dropped));
    }

    #[test]
    fn would_block_reads_as_nothing_available() {
        struct Pending;
        impl Read for Pending {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::ErrorKind::WouldBlock.into())
            }
        }
        let mut buf = [0u8; 8];
        assert!(matches!(read_available(&mut Pending, &mut buf), Ok(None)));
        assert!(matches!(read_available(&mut &b"abc"[..], &mut buf), Ok(Some(3))));
        assert!(matches!(read_available(&mut &b""[..], &mut buf), Ok(None)));
    }

    #[test]
    fn upload_closes_after_copying() {
        let mut target = Vec::new();
        let bytes = copy_then_close(&mut &b"payload"[..], &mut target, |t| {
            assert_eq!(t.as_slice(), b"payload");
            Ok(())
        })
        .unwrap();
        assert_eq!(bytes, 7);
    }

    #[test]
    fn close_failure_fails_the_upload() {
        let mut target = Vec::new();
        let result = copy_then_close(&mut &b"payload"[..], &mut target, |_| {
            Err(ssh2::Error::new(ErrorCode::SFTP(4), "failure on close"))
        });
        let err = DeployError::from(result.unwrap_err());
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn transport_errors_convert_to_deploy_errors() {
        let err: DeployError = SshError::Closed.into();
        assert_eq!(err.kind(), "transport");
    }
}
