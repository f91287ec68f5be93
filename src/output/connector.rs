//! Transport seam for the output channel.
//!
//! Production code connects over TCP; tests substitute in-memory duplex
//! streams so the reconnect logic runs without a network.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Opens byte streams to the remote endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connected stream type.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Open one connection.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the connection cannot be established.
    async fn connect(&self, host: &str, port: u16) -> io::Result<Self::Stream>;
}

/// Plain TCP connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;
        // One short line per reading; don't let Nagle hold it back.
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
