//! Content-Length framed transport.
//!
//! Reads requests from any async reader and writes responses and events to any
//! async writer, so the same loop serves stdio and in-memory test buffers.

use crate::adapter::DebugAdapter;
use crate::protocol::{ProtocolMessage, Request};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::error;

const CONTENT_LENGTH: &str = "Content-Length:";

/// Transport failure
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Reading or writing the stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header block had no usable length
    #[error("Invalid message header: {0}")]
    InvalidHeader(String),

    /// A message body was not valid JSON
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Read one framed request; `None` at end of stream
///
/// # Errors
///
/// Returns an error on I/O failure, a missing or unparsable `Content-Length`,
/// or a body that is not a request.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>, ServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut length = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let header = line.trim_end();
        if header.is_empty() {
            if length.is_some() {
                break;
            }
            continue;
        }
        if let Some(value) = header.strip_prefix(CONTENT_LENGTH) {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| ServerError::InvalidHeader(header.to_string()))?;
            length = Some(parsed);
        }
    }
    let length = length.ok_or_else(|| ServerError::InvalidHeader("missing Content-Length".to_string()))?;
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

/// Write one framed message
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub async fn write_message<W>(writer: &mut W, message: &ProtocolMessage) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)?;
    let frame = format!("{CONTENT_LENGTH} {}\r\n\r\n{json}", json.len());
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Debug adapter server
#[derive(Debug, Default)]
pub struct DapServer {
    adapter: DebugAdapter,
}

impl DapServer {
    /// Server with a fresh adapter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The adapter being served
    #[must_use]
    pub const fn adapter(&self) -> &DebugAdapter {
        &self.adapter
    }

    /// Serve requests until end of stream or `disconnect`
    ///
    /// # Errors
    ///
    /// Returns an error when the stream itself fails. A malformed message is
    /// logged and skipped.
    pub async fn run<R, W>(&mut self, reader: R, writer: W) -> Result<(), ServerError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut writer = BufWriter::new(writer);
        loop {
            let request = match read_request(&mut reader).await {
                Ok(Some(request)) => request,
                Ok(None) => break,
                Err(ServerError::Malformed(err)) => {
                    error!(error = %err, "skipping malformed request");
                    continue;
                }
                Err(err) => return Err(err),
            };
            for message in self.adapter.handle(&request) {
                if let Err(err) = write_message(&mut writer, &message).await {
                    error!(error = %err, "failed to write message");
                    return Err(err);
                }
            }
            if self.adapter.is_disconnected() {
                break;
            }
        }
        tracing::info!("client disconnected");
        Ok(())
    }
}
