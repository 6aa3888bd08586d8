//! SFTP transport backed by libssh2.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use ssh2::{Session, Sftp};

use super::remote_fs::{RemoteConnector, RemoteEntry, RemoteFs};
use crate::configuration::RemoteConfig;
use crate::error_handling::types::TransportError;

/// Connects to the recordings host over SSH and opens an SFTP channel.
///
/// Host keys are not verified: the host is operator-configured and trusted.
pub struct SftpConnector {
    host: String,
    port: u16,
    username: String,
    password: Option<String>,
    private_key_path: Option<PathBuf>,
    timeout: Duration,
}

impl SftpConnector {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            private_key_path: config.private_key_path.clone(),
            timeout: Duration::from_secs(config.connect_timeout_secs.max(1)),
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn open_tcp(&self) -> Result<TcpStream, TransportError> {
        let target = self.target();
        let addr = target
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect(target.clone(), e.to_string()))?
            .next()
            .ok_or_else(|| TransportError::Connect(target.clone(), "no address".to_string()))?;

        let tcp = TcpStream::connect_timeout(&addr, self.timeout).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                TransportError::Timeout(target.clone(), self.timeout)
            }
            _ => TransportError::Connect(target.clone(), e.to_string()),
        })?;
        tcp.set_read_timeout(Some(self.timeout))
            .and_then(|_| tcp.set_write_timeout(Some(self.timeout)))
            .map_err(|e| TransportError::Connect(target.clone(), e.to_string()))?;
        Ok(tcp)
    }

    fn authenticate(&self, session: &Session) -> Result<(), TransportError> {
        let auth_err = |e: ssh2::Error| TransportError::Auth(self.username.clone(), e.to_string());

        match (&self.private_key_path, &self.password) {
            (Some(key), passphrase) => {
                debug!("Authenticating as {} with key {}", self.username, key.display());
                session
                    .userauth_pubkey_file(&self.username, None, key, passphrase.as_deref())
                    .map_err(auth_err)?;
            }
            (None, Some(password)) => {
                debug!("Authenticating as {} with password", self.username);
                session
                    .userauth_password(&self.username, password)
                    .map_err(auth_err)?;
            }
            (None, None) => {
                return Err(TransportError::Auth(
                    self.username.clone(),
                    "no credential configured".to_string(),
                ))
            }
        }

        if !session.authenticated() {
            return Err(TransportError::Auth(
                self.username.clone(),
                "server rejected credentials".to_string(),
            ));
        }
        Ok(())
    }
}

impl RemoteConnector for SftpConnector {
    fn connect(&self) -> Result<Box<dyn RemoteFs>, TransportError> {
        let target = self.target();
        let tcp = self.open_tcp()?;

        let mut session =
            Session::new().map_err(|e| TransportError::Connect(target.clone(), e.to_string()))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(self.timeout.as_millis().min(u32::MAX as u128) as u32);
        session
            .handshake()
            .map_err(|e| TransportError::Connect(target.clone(), e.to_string()))?;
        warn!("Accepting host key of {} without verification", target);

        self.authenticate(&session)?;

        let sftp = session
            .sftp()
            .map_err(|e| TransportError::Connect(target.clone(), e.to_string()))?;
        info!("SFTP session established with {}", target);

        Ok(Box::new(SftpFs {
            sftp,
            _session: session,
        }))
    }

    fn describe(&self) -> String {
        format!("sftp://{}@{}", self.username, self.target())
    }
}

// Field order matters: the SFTP channel is dropped before its session.
struct SftpFs {
    sftp: Sftp,
    _session: Session,
}

impl RemoteFs for SftpFs {
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        let entries = self
            .sftp
            .readdir(Path::new(path))
            .map_err(|e| TransportError::List(path.to_string(), e.to_string()))?;

        Ok(entries
            .into_iter()
            .filter_map(|(entry_path, stat)| {
                let name = entry_path.file_name()?.to_string_lossy().into_owned();
                if name == "." || name == ".." {
                    return None;
                }
                Some(RemoteEntry {
                    name,
                    is_dir: stat.is_dir(),
                    size: stat.size.unwrap_or(0),
                })
            })
            .collect())
    }

    fn fetch(&mut self, remote: &str, local: &Path) -> Result<u64, TransportError> {
        let fetch_err = |e: String| TransportError::Fetch(remote.to_string(), e);

        let mut source = self
            .sftp
            .open(Path::new(remote))
            .map_err(|e| fetch_err(e.to_string()))?;
        let mut target = std::fs::File::create(local).map_err(|e| fetch_err(e.to_string()))?;
        io::copy(&mut source, &mut target).map_err(|e| fetch_err(e.to_string()))
    }
}
