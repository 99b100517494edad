use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::mcp::{JsonRpcRequest, JsonRpcResponse, McpServer};

const RESPONSE_QUEUE: usize = 64;

/// Serve newline-delimited JSON-RPC on one stream until EOF.
///
/// Each request runs on its own task; responses go out through a single
/// writer task as they complete, so they may be reordered.
pub async fn serve_lines<R, W>(reader: R, writer: W, server: Arc<McpServer>) -> eyre::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(RESPONSE_QUEUE);

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut buf_reader = BufReader::new(reader);
    let mut line = Vec::new();
    let mut in_flight = Vec::new();

    while buf_reader.read_until(b'\n', &mut line).await? > 0 {
        let text = match std::str::from_utf8(&line) {
            Ok(text) => text.trim(),
            Err(e) => {
                error!("Request line is not valid UTF-8: {}", e);
                send(&tx, &JsonRpcResponse::parse_error(e.to_string())).await;
                line.clear();
                continue;
            }
        };

        if text.is_empty() {
            line.clear();
            continue;
        }

        match serde_json::from_str::<JsonRpcRequest>(text) {
            Ok(request) => {
                info!(
                    "Received request: {} (id: {:?})",
                    request.method, request.id
                );

                let server = Arc::clone(&server);
                let tx = tx.clone();
                in_flight.push(tokio::spawn(async move {
                    if let Some(response) = server.handle_request(request).await {
                        send(&tx, &response).await;
                    }
                }));
            }
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                send(&tx, &JsonRpcResponse::parse_error(e.to_string())).await;
            }
        }

        in_flight.retain(|task| !task.is_finished());
        line.clear();
    }

    debug!("Input closed, waiting for {} in-flight request(s)", in_flight.len());
    for task in in_flight {
        if let Err(e) = task.await {
            error!("Request task failed: {}", e);
        }
    }

    drop(tx);
    writer_task.await??;
    Ok(())
}

async fn send(tx: &mpsc::Sender<String>, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(json) => {
            if tx.send(json).await.is_err() {
                warn!("Response dropped: output closed");
            }
        }
        Err(e) => error!("Failed to encode response: {}", e),
    }
}

/// MCP hosts spawn the server and talk over stdin/stdout.
pub async fn serve_stdio(server: Arc<McpServer>) -> eyre::Result<()> {
    info!("MCP server listening on stdio");
    serve_lines(tokio::io::stdin(), tokio::io::stdout(), server).await
}

/// One line-delimited session per TCP connection.
pub async fn serve_tcp(addr: SocketAddr, server: Arc<McpServer>) -> eyre::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("MCP server listening on tcp://{}", addr);

    loop {
        let (socket, peer_addr) = listener.accept().await?;
        let server = Arc::clone(&server);
        info!("Accepted connection from {}", peer_addr);

        tokio::spawn(async move {
            let (reader, writer) = socket.into_split();
            if let Err(e) = serve_lines(reader, writer, server).await {
                error!("Error handling connection from {}: {}", peer_addr, e);
            }
        });
    }
}
