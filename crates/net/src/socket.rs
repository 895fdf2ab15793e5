//! Socket primitives backing the address scheme in [`crate::url`]: a TCP
//! connection for `rti://`, a Unix-domain-socket connection for the
//! `pipe://`/`file://`/bare-path named-pipe equivalent.

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, Interest, ReadBuf, Ready};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};

use crate::error::TransportError;
use crate::url::{Address, Scheme, DEFAULT_RTI_PORT};

/// A bidirectional connection to a peer.
pub enum Connection {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl Connection {
    pub async fn ready(&self, interest: Interest) -> io::Result<Ready> {
        match self {
            Self::Tcp(s) => s.ready(interest).await,
            Self::Unix(s) => s.ready(interest).await,
        }
    }

    /// Non-blocking read used by the packetizer (§4.4): fills as much of
    /// `buf` as is immediately available, returning `Ok(0)` on EOF and
    /// `WouldBlock` if the socket was reported ready spuriously.
    pub fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(s) => s.try_read(buf),
            Self::Unix(s) => s.try_read(buf),
        }
    }

    /// Non-blocking write used by the packetizer and compression layer.
    pub fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(s) => s.try_write(buf),
            Self::Unix(s) => s.try_write(buf),
        }
    }

    pub fn peer_description(&self) -> String {
        match self {
            Self::Tcp(s) => s
                .peer_addr()
                .map_or_else(|_| "tcp://?".to_string(), |a| format!("tcp://{a}")),
            Self::Unix(s) => s.peer_addr().map_or_else(
                |_| "unix://?".to_string(),
                |a| format!("unix://{}", a.as_pathname().map_or_else(|| "?".into(), PathBuf::from).display()),
            ),
        }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            Self::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            Self::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_flush(cx),
            Self::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            Self::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Binds a listener for `address`. Only [`Scheme::Rti`] and [`Scheme::Pipe`]
/// are bindable; `thread://`/`trace://`/`http://` are handled elsewhere (an
/// in-process registry, a decorator, and "reserved" respectively).
pub enum Listener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl Listener {
    pub async fn bind(address: &Address) -> Result<Self, TransportError> {
        match address.scheme {
            Scheme::Rti => {
                let host = address.host.as_deref().unwrap_or("0.0.0.0");
                let port = address.port.unwrap_or(DEFAULT_RTI_PORT);
                let listener = TcpListener::bind((host, port)).await?;
                Ok(Self::Tcp(listener))
            }
            Scheme::Pipe => {
                let path = PathBuf::from(&address.path);
                if path.exists() {
                    let _ = std::fs::remove_file(&path);
                }
                let listener = UnixListener::bind(&path)?;
                Ok(Self::Unix(listener))
            }
            other => Err(TransportError::other(format!(
                "cannot bind a listener for scheme `{}`",
                other.as_str()
            ))),
        }
    }

    pub async fn accept(&self) -> Result<(Connection, String), TransportError> {
        match self {
            Self::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                Ok((Connection::Tcp(stream), format!("tcp://{peer}")))
            }
            Self::Unix(listener) => {
                let (stream, _peer) = listener.accept().await?;
                Ok((Connection::Unix(stream), "unix://?".to_string()))
            }
        }
    }

    pub fn local_description(&self) -> String {
        match self {
            Self::Tcp(listener) => listener
                .local_addr()
                .map_or_else(|_| "tcp://?".to_string(), |a| format!("tcp://{a}")),
            Self::Unix(_) => "unix://?".to_string(),
        }
    }
}

/// Connects to `address`. `rti://` dials TCP; `pipe://`/`file://`/bare path
/// dials the local Unix socket.
pub async fn connect(address: &Address) -> Result<Connection, TransportError> {
    match address.scheme {
        Scheme::Rti => {
            let host = address
                .host
                .as_deref()
                .ok_or_else(|| TransportError::other("rti:// address is missing a host"))?;
            let port = address.port.unwrap_or(DEFAULT_RTI_PORT);
            let stream = TcpStream::connect((host, port)).await?;
            Ok(Connection::Tcp(stream))
        }
        Scheme::Pipe => {
            let stream = UnixStream::connect(&address.path).await?;
            Ok(Connection::Unix(stream))
        }
        other => Err(TransportError::other(format!(
            "cannot connect to scheme `{}`",
            other.as_str()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn tcp_round_trip() {
        let addr = url::parse("rti://127.0.0.1:0").unwrap();
        let listener = Listener::bind(&addr).await.unwrap();
        let local = match &listener {
            Listener::Tcp(l) => l.local_addr().unwrap(),
            Listener::Unix(_) => unreachable!(),
        };

        let server = tokio::spawn(async move {
            let (mut conn, _peer) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            conn.read_exact(&mut buf).await.unwrap();
            conn.write_all(b"world").await.unwrap();
        });

        let connect_addr = url::parse(&format!("rti://{local}")).unwrap();
        let mut client = connect(&connect_addr).await.unwrap();
        client.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"world");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn unix_round_trip() {
        let dir = tempdir();
        let path = dir.join("openrti-test.sock");
        let addr = url::Address {
            scheme: Scheme::Pipe,
            host: None,
            port: None,
            path: path.to_string_lossy().into_owned(),
            query: Vec::new(),
            fragment: None,
            wrapped: None,
        };
        let listener = Listener::bind(&addr).await.unwrap();
        let server = tokio::spawn(async move {
            let (mut conn, _peer) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            conn.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"ping");
        });
        let mut client = connect(&addr).await.unwrap();
        client.write_all(b"ping").await.unwrap();
        server.await.unwrap();
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("openrti-net-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
