//! MCP transport layer implementations.
//!
//! A transport only moves lines: inbound raw JSON-RPC text is handed to the
//! server untouched, and outbound responses and notifications are written one
//! per line.

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::mcp::protocol::{JsonRpcNotification, JsonRpcResponse};

/// An outbound message.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Message {
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send {
    /// Start the transport, returning the inbound line channel and the
    /// outbound message channel.
    async fn start(&mut self) -> Result<(mpsc::Receiver<String>, mpsc::Sender<Message>)>;

    /// Stop the transport.
    async fn stop(&mut self) -> Result<()>;
}

/// Newline-delimited JSON over any byte stream pair.
pub struct LineTransport<R, W> {
    reader: Option<R>,
    writer: Option<W>,
    running: bool,
}

/// Stdio transport for MCP.
pub type StdioTransport = LineTransport<Stdin, Stdout>;

impl<R, W> LineTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl StdioTransport {
    /// Create a new stdio transport.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn start(&mut self) -> Result<(mpsc::Receiver<String>, mpsc::Sender<Message>)> {
        let (Some(reader), Some(mut writer)) = (self.reader.take(), self.writer.take()) else {
            return Err(Error::Transport("transport already started".to_string()));
        };
        self.running = true;

        // Channel for incoming lines (from the reader)
        let (incoming_tx, incoming_rx) = mpsc::channel::<String>(100);
        // Channel for outgoing messages (to the writer)
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(100);

        // Spawn reader task
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();

            loop {
                match lines.next_line().await {
                    Ok(None) => {
                        debug!("EOF on input, stopping transport");
                        break;
                    }
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }

                        trace!("Received: {}", trimmed);
                        if incoming_tx.send(trimmed.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error reading input: {}", e);
                        break;
                    }
                }
            }
        });

        // Spawn writer task
        tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Error serializing message: {}", e);
                        continue;
                    }
                };

                trace!("Sending: {}", json);
                if let Err(e) = write_line(&mut writer, &json).await {
                    error!("Error writing output: {}", e);
                    break;
                }
            }
        });

        Ok((incoming_rx, outgoing_tx))
    }

    async fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::RequestId;
    use serde_json::json;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_lines_are_forwarded_raw() {
        let (mut client, server_in) = duplex(1024);
        let (server_out, _client_out) = duplex(1024);
        let mut transport = LineTransport::new(server_in, server_out);

        let (mut incoming, _outgoing) = transport.start().await.unwrap();
        assert!(transport.is_running());

        client.write_all(b"{not json}\n\n  {\"a\":1}  \n").await.unwrap();
        assert_eq!(incoming.recv().await.unwrap(), "{not json}");
        assert_eq!(incoming.recv().await.unwrap(), "{\"a\":1}");

        drop(client);
        assert!(incoming.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_messages_are_written_as_lines() {
        let (_client_in, server_in) = duplex(1024);
        let (server_out, mut client_out) = duplex(1024);
        let mut transport = LineTransport::new(server_in, server_out);

        let (_incoming, outgoing) = transport.start().await.unwrap();
        outgoing
            .send(Message::Notification(JsonRpcNotification::new(
                "notifications/tools/list_changed",
                None,
            )))
            .await
            .unwrap();
        outgoing
            .send(Message::Response(JsonRpcResponse::success(
                RequestId::Number(1),
                json!({}),
            )))
            .await
            .unwrap();
        drop(outgoing);

        let mut written = String::new();
        client_out.read_to_string(&mut written).await.unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(lines[0]).unwrap()["method"],
            "notifications/tools/list_changed"
        );
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(lines[1]).unwrap(),
            json!({"jsonrpc": "2.0", "id": 1, "result": {}})
        );
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (_a, reader) = duplex(64);
        let (writer, _b) = duplex(64);
        let mut transport = LineTransport::new(reader, writer);

        transport.start().await.unwrap();
        let err = transport.start().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        transport.stop().await.unwrap();
        assert!(!transport.is_running());
    }
}
