//! A single TCP connection to a server node.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::record::Record;
use recwire_protocol::{
    info_frame, parse_info_response, Decoder, Encoder, Frame, Message, MessageBody,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Read buffer size for socket reads (8 KiB).
pub const READ_BUFFER_SIZE: usize = 8 * 1024;

/// One request at a time over a plain TCP stream.
pub struct Connection {
    stream: TcpStream,
    decoder: Decoder,
    request_timeout: Duration,
    peer: SocketAddr,
}

impl Connection {
    /// Connects to the configured node.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let addr = config.addr();
        tracing::debug!("Connecting to {}...", addr);

        let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                tracing::debug!("Connection timeout");
                ClientError::Timeout
            })?
            .map_err(|e| {
                tracing::debug!("Connection failed: {}", e);
                ClientError::Io(e)
            })?;

        stream.set_nodelay(true).ok();
        let peer = stream.peer_addr()?;
        tracing::debug!("Connected to {}", peer);

        Ok(Self {
            stream,
            decoder: Decoder::new().with_max_body_size(config.max_body_size),
            request_timeout: config.request_timeout(),
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Writes one frame.
    pub async fn send(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let encoded = frame.encode()?;
        self.stream.write_all(&encoded).await?;
        tracing::debug!("Sent {} frame ({} bytes)", frame.kind.name(), encoded.len());
        Ok(())
    }

    /// Reads the next complete message, bounded by the request timeout.
    pub async fn recv(&mut self) -> Result<Message, ClientError> {
        let timeout = self.request_timeout;
        let stream = &mut self.stream;
        let decoder = &mut self.decoder;

        tokio::time::timeout(timeout, async {
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            loop {
                if let Some(message) = decoder.decode_message()? {
                    tracing::debug!("Decoded {} message", message.kind().name());
                    return Ok(message);
                }

                let n = stream.read(&mut buf).await?;
                if n == 0 {
                    tracing::debug!("Connection closed (0 bytes)");
                    return Err(ClientError::ConnectionClosed);
                }
                decoder.extend(&buf[..n]);
                tracing::trace!("Decoder buffer now has {} bytes", decoder.buffered());
            }
        })
        .await
        .map_err(|_| {
            tracing::debug!("Read timeout");
            ClientError::Timeout
        })?
    }

    /// Sends a frame and waits for the reply.
    pub async fn request(&mut self, frame: &Frame) -> Result<Message, ClientError> {
        self.send(frame).await?;
        self.recv().await
    }

    /// Runs info commands. An empty command list asks for the default set.
    pub async fn info(&mut self, commands: &[&str]) -> Result<Vec<(String, String)>, ClientError> {
        match self.request(&info_frame(commands)).await? {
            Message::Info(body) => Ok(parse_info_response(&body)?),
            other => Err(ClientError::UnexpectedMessage(other.kind().name())),
        }
    }

    /// Sends a database message and decodes the response record. A non-OK
    /// result code becomes [`ClientError::Server`].
    pub async fn execute(&mut self, body: &MessageBody) -> Result<Record, ClientError> {
        self.stream.write_all(&Encoder::encode_message(body)?).await?;
        let response = match self.recv().await? {
            Message::Body(response) => response,
            other => return Err(ClientError::UnexpectedMessage(other.kind().name())),
        };

        let code = response.result_code();
        if !code.is_ok() {
            tracing::debug!("Server returned {}", code);
            return Err(ClientError::Server { code });
        }
        Record::from_body(&response)
    }

    /// Shuts down the write half. Further requests fail.
    pub async fn close(mut self) -> Result<(), ClientError> {
        tracing::debug!("Closing connection to {}", self.peer);
        self.stream.shutdown().await?;
        Ok(())
    }
}
