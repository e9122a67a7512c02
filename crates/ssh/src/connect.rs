//! Connection setup and authentication.
//!
//! Opens the TCP stream, performs the SSH handshake, authenticates and
//! opens the SFTP subsystem. Runs on a blocking thread.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use ssh2::{KeyboardInteractivePrompt, Prompt, Session};
use sshdeploy_core::{AuthConfig, Connector, RemoteSession, SessionFuture};
use tracing::{debug, info};

use crate::DEFAULT_READY_TIMEOUT;
use crate::error::SshError;
use crate::session::SshSession;

/// Opens [`SshSession`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    fn connect<'a>(&'a self, auth: &'a AuthConfig) -> SessionFuture<'a, Box<dyn RemoteSession>> {
        let auth = auth.clone();
        Box::pin(async move {
            let session = tokio::task::spawn_blocking(move || open_session(&auth))
                .await
                .map_err(SshError::from)??;
            Ok(Box::new(session) as Box<dyn RemoteSession>)
        })
    }
}

/// Answers every keyboard-interactive prompt round with the password.
struct PasswordPrompt<'p> {
    password: &'p str,
}

impl KeyboardInteractivePrompt for PasswordPrompt<'_> {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[Prompt<'a>],
    ) -> Vec<String> {
        debug!(prompts = prompts.len(), "answering keyboard-interactive challenge");
        vec![self.password.to_string()]
    }
}

fn open_session(auth: &AuthConfig) -> Result<SshSession, SshError> {
    let addr = format!("{}:{}", auth.host, auth.port);
    let timeout = auth
        .ready_timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_READY_TIMEOUT);

    for key in auth.extra.keys() {
        debug!(option = %key, "transport option not used by the ssh transport");
    }

    let socket = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| SshError::Resolve(addr.clone()))?;

    let tcp = TcpStream::connect_timeout(&socket, timeout).map_err(|e| {
        if e.kind() == std::io::ErrorKind::TimedOut {
            SshError::Timeout { addr: addr.clone() }
        } else {
            SshError::Io(e)
        }
    })?;

    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.set_timeout(duration_ms(timeout));
    session.handshake()?;

    let user = username(auth);
    let sftp = disconnect_on_error(
        authenticate(&session, auth, &user).and_then(|()| {
            // No deadline once the session is up; long commands must not time out.
            session.set_timeout(0);
            Ok(session.sftp()?)
        }),
        || session.disconnect(None, "session setup failed", None),
    )?;

    info!(host = %auth.host, port = auth.port, user = %user, "ssh session ready");
    Ok(SshSession::new(session, sftp))
}

/// Runs `disconnect` when setup after the handshake failed. The setup
/// error wins over any disconnect error.
fn disconnect_on_error<T>(
    result: Result<T, SshError>,
    disconnect: impl FnOnce() -> Result<(), ssh2::Error>,
) -> Result<T, SshError> {
    if let Err(e) = &result {
        if let Err(close_err) = disconnect() {
            debug!(error = %close_err, setup_error = %e, "disconnect after failed setup");
        }
    }
    result
}

/// Tries key, agent, password and keyboard-interactive in that order.
fn authenticate(session: &Session, auth: &AuthConfig, user: &str) -> Result<(), SshError> {
    let mut last_error: Option<String> = None;

    if let Some(key) = &auth.private_key {
        debug!(key = %key.display(), "trying public key authentication");
        if let Err(e) = session.userauth_pubkey_file(user, None, key, auth.passphrase.as_deref()) {
            last_error = Some(e.to_string());
        }
    }

    if !session.authenticated() && auth.agent {
        debug!("trying ssh-agent authentication");
        if let Err(e) = session.userauth_agent(user) {
            last_error = Some(e.to_string());
        }
    }

    if !session.authenticated() {
        if let Some(password) = auth.password.as_deref() {
            let methods = session.auth_methods(user)?.to_string();
            let (password_ok, interactive_ok) = offered_methods(&methods);

            if password_ok {
                debug!("trying password authentication");
                if let Err(e) = session.userauth_password(user, password) {
                    last_error = Some(e.to_string());
                }
            }

            if !session.authenticated() && interactive_ok {
                debug!("trying keyboard-interactive authentication");
                let mut prompt = PasswordPrompt { password };
                if let Err(e) = session.userauth_keyboard_interactive(user, &mut prompt) {
                    last_error = Some(e.to_string());
                }
            }
        }
    }

    if session.authenticated() {
        Ok(())
    } else {
        Err(SshError::AuthFailed {
            user: user.to_string(),
            host: auth.host.clone(),
            reason: last_error.unwrap_or_else(|| "no usable credentials".into()),
        })
    }
}

/// Parses the server's comma-separated method list.
fn offered_methods(methods: &str) -> (bool, bool) {
    let mut password = false;
    let mut interactive = false;
    for method in methods.split(',').map(str::trim) {
        match method {
            "password" => password = true,
            "keyboard-interactive" => interactive = true,
            _ => {}
        }
    }
    (password, interactive)
}

/// Configured user, else the local login name.
fn username(auth: &AuthConfig) -> String {
    auth.username
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .unwrap_or_else(|| "root".into())
}

fn duration_ms(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offered_methods_parses_list() {
        assert_eq!(offered_methods("publickey,password"), (true, false));
        assert_eq!(
            offered_methods("publickey, keyboard-interactive"),
            (false, true)
        );
        assert_eq!(offered_methods("publickey"), (false, false));
    }

    #[test]
    fn prompt_answers_with_password_only() {
        let mut prompt = PasswordPrompt { password: "s3cret" };
        let prompts = [
            Prompt {
                text: "Password: ".into(),
                echo: false,
            },
            Prompt {
                text: "OTP: ".into(),
                echo: false,
            },
        ];
        assert_eq!(prompt.prompt("deploy", "", &prompts), vec!["s3cret"]);
    }

    #[test]
    fn configured_username_wins() {
        let mut auth = AuthConfig::new("h");
        auth.username = Some("deploy".into());
        assert_eq!(username(&auth), "deploy");
    }

    #[test]
    fn failed_setup_disconnects_and_keeps_its_error() {
        let mut disconnects = 0;
        let result: Result<(), SshError> = disconnect_on_error(Err(SshError::Closed), || {
            disconnects += 1;
            Err(ssh2::Error::new(ssh2::ErrorCode::Session(-7), "send failed"))
        });
        assert!(matches!(result, Err(SshError::Closed)));
        assert_eq!(disconnects, 1);
    }

    #[test]
    fn successful_setup_stays_connected() {
        let mut disconnects = 0;
        let result = disconnect_on_error(Ok(7), || {
            disconnects += 1;
            Ok(())
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(disconnects, 0);
    }

    #[test]
    fn duration_is_clamped() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(Duration::from_secs(u64::MAX / 1000)), u32::MAX);
    }

    #[tokio::test]
    async fn connect_to_closed_port_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut auth = AuthConfig::new("127.0.0.1");
        auth.port = port;
        auth.ready_timeout_ms = Some(2000);

        let result = SshConnector.connect(&auth).await;
        assert!(matches!(
            result,
            Err(sshdeploy_core::DeployError::Transport(_))
        ));
    }
}
