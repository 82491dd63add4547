use std::io;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot};

use perch_ipc::{StateEvent, SubscribeRequest};

/// Receiving end of the snapshot side channel. The daemon answers each
/// request with the current state so a fresh subscriber does not have to
/// wait for the next change.
pub type SnapshotRequests = mpsc::Receiver<oneshot::Sender<StateEvent>>;

/// Streams state events to subscribers as JSON lines. Each connection opens
/// with a [`SubscribeRequest`] line choosing a filter and optionally a
/// snapshot of the current state.
pub struct EventServer {
    socket_path: PathBuf,
    listener: UnixListener,
    event_rx: broadcast::Receiver<StateEvent>,
    snapshot_tx: mpsc::Sender<oneshot::Sender<StateEvent>>,
}

impl EventServer {
    /// Bind the event socket. Returns the server together with the snapshot
    /// request stream the daemon must service.
    pub fn bind(
        socket_path: PathBuf,
        event_rx: broadcast::Receiver<StateEvent>,
    ) -> Result<(Self, SnapshotRequests)> {
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        let listener = UnixListener::bind(&socket_path)?;
        let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
        let server = Self {
            socket_path,
            listener,
            event_rx,
            snapshot_tx,
        };
        Ok((server, snapshot_rx))
    }

    pub async fn run(&self) -> Result<()> {
        tracing::info!("event socket listening on {:?}", self.socket_path);

        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let event_rx = self.event_rx.resubscribe();
                    let snapshot_tx = self.snapshot_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_subscriber(stream, event_rx, snapshot_tx).await {
                            if is_disconnect(&e) {
                                tracing::debug!("event subscriber disconnected");
                            } else {
                                tracing::warn!("event subscriber error: {}", e);
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("event socket accept failed: {}", e);
                }
            }
        }
    }
}

/// A subscriber going away mid-write is routine, not an error.
fn is_disconnect(e: &anyhow::Error) -> bool {
    e.downcast_ref::<io::Error>().is_some_and(|io_err| {
        matches!(
            io_err.kind(),
            io::ErrorKind::BrokenPipe
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::UnexpectedEof
        )
    })
}

async fn handle_subscriber(
    stream: UnixStream,
    mut event_rx: broadcast::Receiver<StateEvent>,
    snapshot_tx: mpsc::Sender<oneshot::Sender<StateEvent>>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let Some(line) = lines.next_line().await? else {
        return Ok(());
    };
    let request: SubscribeRequest = serde_json::from_str(line.trim()).unwrap_or_default();
    let filter = request.effective_filter();
    tracing::debug!("event subscriber connected with filter {:?}", filter);

    if request.snapshot {
        let (reply_tx, reply_rx) = oneshot::channel();
        if snapshot_tx.send(reply_tx).await.is_ok() {
            if let Ok(snapshot) = reply_rx.await {
                write_event(&mut writer, &snapshot).await?;
            }
        }
    }

    loop {
        match event_rx.recv().await {
            Ok(event) if filter.matches(&event) => write_event(&mut writer, &event).await?,
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("event subscriber lagged by {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    Ok(())
}

async fn write_event(writer: &mut OwnedWriteHalf, event: &StateEvent) -> Result<()> {
    let mut json = serde_json::to_string(event)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

impl Drop for EventServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socket_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("perch-evt-{}-{}", std::process::id(), tag));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("perch-events.sock")
    }

    #[tokio::test]
    async fn test_snapshot_then_filtered_stream() {
        let path = socket_path("filtered");
        let (event_tx, event_rx) = broadcast::channel(16);
        let (server, mut snapshot_rx) = EventServer::bind(path.clone(), event_rx).unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::spawn(async move {
            while let Some(reply) = snapshot_rx.recv().await {
                let _ = reply.send(StateEvent::Snapshot {
                    items: vec![],
                    permission_granted: true,
                });
            }
        });

        let stream = UnixStream::connect(&path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer
            .write_all(b"{\"snapshot\":true,\"filter\":{\"layout\":true}}\n")
            .await
            .unwrap();
        writer.flush().await.unwrap();

        let line = lines.next_line().await.unwrap().unwrap();
        let event: StateEvent = serde_json::from_str(&line).unwrap();
        assert!(matches!(
            event,
            StateEvent::Snapshot {
                permission_granted: true,
                ..
            }
        ));

        // Permission events are filtered out for this subscriber, only the
        // layout change comes through.
        event_tx
            .send(StateEvent::PermissionChanged { granted: false })
            .unwrap();
        event_tx
            .send(StateEvent::LayoutChanged { items: vec![] })
            .unwrap();

        let line = lines.next_line().await.unwrap().unwrap();
        let event: StateEvent = serde_json::from_str(&line).unwrap();
        assert!(matches!(event, StateEvent::LayoutChanged { .. }));
    }

    #[test]
    fn test_disconnect_errors_are_recognized() {
        let broken: anyhow::Error =
            io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(is_disconnect(&broken));

        let other = anyhow::anyhow!("subscriber sent garbage");
        assert!(!is_disconnect(&other));
    }
}
