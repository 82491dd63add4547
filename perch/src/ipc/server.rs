use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};

use perch_ipc::{Command, Response};

/// Channel the server forwards parsed commands on. Each command carries its
/// own reply slot, so responses cannot cross between connections.
pub type CommandSender = mpsc::Sender<(Command, oneshot::Sender<Response>)>;

/// JSON-lines command endpoint. One request per line, one response per line,
/// connections stay open for as many commands as the client wants to send.
pub struct IpcServer {
    socket_path: PathBuf,
    listener: UnixListener,
    cmd_tx: CommandSender,
}

impl IpcServer {
    /// Bind the command socket, replacing a stale socket file left behind by
    /// a previous run.
    pub fn bind(socket_path: PathBuf, cmd_tx: CommandSender) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        let listener = UnixListener::bind(&socket_path)?;
        Ok(Self {
            socket_path,
            listener,
            cmd_tx,
        })
    }

    pub async fn run(&self) -> Result<()> {
        tracing::info!("command socket listening on {:?}", self.socket_path);

        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let cmd_tx = self.cmd_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, cmd_tx).await {
                            tracing::error!("command connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("command socket accept failed: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, cmd_tx: CommandSender) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Command>(line) {
            Ok(cmd) => {
                tracing::debug!("received command: {:?}", cmd);
                forward(&cmd_tx, cmd).await
            }
            Err(e) => Response::Error {
                message: format!("invalid command: {}", e),
            },
        };

        let mut json = serde_json::to_string(&response)?;
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

async fn forward(cmd_tx: &CommandSender, cmd: Command) -> Response {
    let (resp_tx, resp_rx) = oneshot::channel();
    if cmd_tx.send((cmd, resp_tx)).await.is_err() {
        return Response::Error {
            message: "daemon is shutting down".to_string(),
        };
    }
    resp_rx.await.unwrap_or(Response::Error {
        message: "daemon dropped the command".to_string(),
    })
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
