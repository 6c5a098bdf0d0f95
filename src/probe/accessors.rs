//! Narrow views of the operating system handed to probes.
//!
//! Production code uses the `Os*` implementations; tests swap in the doubles
//! from [`crate::testing`].

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::engine::Context;

const HTTP_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub trait FileSystem: Send + Sync {
    /// `Ok(false)` when the path does not exist; other failures are errors.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
}

pub trait Network: Send + Sync {
    /// Open a TCP connection and close it immediately.
    fn dial_timeout(&self, address: &str, timeout: Duration) -> io::Result<()>;

    /// Issue a GET that gives up once `ctx` expires.
    fn http_get(&self, ctx: &Context, url: &str) -> io::Result<HttpResponse>;
}

/// Process identity recorded alongside every classification.
pub trait HostIdentity: Send + Sync {
    fn pid(&self) -> u32;

    fn hostname(&self) -> io::Result<String>;

    fn container_id(&self) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match std::fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsNetwork;

impl Network for OsNetwork {
    fn dial_timeout(&self, address: &str, timeout: Duration) -> io::Result<()> {
        let mut last_err = None;
        for addr in address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(_stream) => return Ok(()),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no addresses resolved for {address}"),
            )
        }))
    }

    fn http_get(&self, ctx: &Context, url: &str) -> io::Result<HttpResponse> {
        ctx.check().map_err(io::Error::other)?;

        // The blocking client owns a runtime that must not be dropped on a
        // thread driving an async executor, so the request runs on its own
        // thread and only the wait happens here.
        let (tx, rx) = mpsc::channel();
        let url = url.to_string();
        let timeout = ctx.remaining();
        thread::Builder::new()
            .name("criprof-http".to_string())
            .spawn(move || {
                let _ = tx.send(blocking_get(&url, timeout));
            })?;

        loop {
            match rx.recv_timeout(HTTP_POLL_INTERVAL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => ctx
                    .check()
                    .map_err(|err| io::Error::new(io::ErrorKind::TimedOut, err))?,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::other("http worker exited without a response"))
                }
            }
        }
    }
}

fn blocking_get(url: &str, timeout: Option<Duration>) -> io::Result<HttpResponse> {
    let mut builder = reqwest::blocking::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder.build().map_err(io::Error::other)?;

    let response = client.get(url).send().map_err(|err| {
        if err.is_timeout() {
            io::Error::new(io::ErrorKind::TimedOut, err)
        } else {
            io::Error::other(err)
        }
    })?;

    Ok(HttpResponse {
        status: response.status().as_u16(),
    })
}

/// Identity of the running process as the operating system reports it.
#[derive(Clone)]
pub struct SystemIdentity {
    fs: Arc<dyn FileSystem>,
}

impl SystemIdentity {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Default for SystemIdentity {
    fn default() -> Self {
        Self::new(Arc::new(OsFileSystem))
    }
}

impl HostIdentity for SystemIdentity {
    fn pid(&self) -> u32 {
        std::process::id()
    }

    fn hostname(&self) -> io::Result<String> {
        let name = hostname::get()?;
        Ok(name.to_string_lossy().into_owned())
    }

    fn container_id(&self) -> Option<String> {
        crate::container::container_id(self.fs.as_ref())
    }
}
