//! Error types for the SSH front end.
//!
//! Only the transport can fail. The TUI core has no error paths.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that keep the server from serving anyone.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("could not load host key {}: {source}", path.display())]
    HostKey {
        path: PathBuf,
        #[source]
        source: russh_keys::Error,
    },

    #[error("could not generate host key {}: {source}", path.display())]
    HostKeyGeneration {
        path: PathBuf,
        #[source]
        source: ssh_key::Error,
    },

    #[error("could not create host key directory {}: {source}", path.display())]
    HostKeyDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure inside one SSH connection. Ends that connection only.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("ssh transport: {0}")]
    Transport(#[from] russh::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_names_the_address() {
        let error = ServeError::Bind {
            addr: SocketAddr::from(([127, 0, 0, 1], 22)),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(error.to_string(), "could not listen on 127.0.0.1:22: in use");
    }

    #[test]
    fn directory_error_names_the_path() {
        let error = ServeError::HostKeyDirectory {
            path: PathBuf::from("/nope/.ssh"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(error.to_string().contains("/nope/.ssh"));
    }
}
