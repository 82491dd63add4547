//! Daemon wiring: engine, IPC servers and background tasks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};

use perch_ipc::{Command, Response, StateEvent};

use crate::engine::{Engine, OpError};
use crate::event_emitter::EventEmitter;
use crate::gesture::GestureSimulator;
use crate::ipc::{EventServer, IpcServer, SocketPaths};
use crate::permission::PermissionGate;
use crate::platform::{InputInjector, TrustProvider, WindowSystem};
use crate::store::SettingsStore;

/// How often the menu bar is re-scanned in the absence of operations.
const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[cfg(target_os = "macos")]
pub fn run() -> Result<()> {
    use crate::platform::{MacInputInjector, MacTrustProvider, MacWindowSystem};
    serve(MacWindowSystem, MacInputInjector, MacTrustProvider)
}

#[cfg(not(target_os = "macos"))]
pub fn run() -> Result<()> {
    anyhow::bail!("the perch daemon only runs on macOS")
}

fn serve<W, I, T>(windows: W, injector: I, trust: T) -> Result<()>
where
    W: WindowSystem + Send + Sync + 'static,
    I: InputInjector + Send + Sync + 'static,
    T: TrustProvider + Send + Sync + 'static,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let emitter = EventEmitter::new(256);
        let store = SettingsStore::open_default()?;
        let permission = Arc::new(PermissionGate::new(trust, emitter.clone()));

        if !permission.is_granted() {
            tracing::warn!("Accessibility permission not granted, requesting...");
            permission.request();
        }

        let engine = Arc::new(Engine::new(
            windows,
            GestureSimulator::new(injector),
            Arc::clone(&permission),
            store,
            emitter.clone(),
        ));

        let paths = SocketPaths::default();

        // Command server
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<(Command, oneshot::Sender<Response>)>(256);
        let ipc_server = IpcServer::bind(paths.commands.clone(), cmd_tx)?;
        let ipc_task = tokio::spawn(async move {
            if let Err(e) = ipc_server.run().await {
                tracing::error!("IPC server error: {}", e);
            }
        });

        // Event server; the snapshot request stream is serviced below
        let (event_server, mut snapshot_rx) =
            EventServer::bind(paths.events.clone(), emitter.subscribe())?;
        let event_task = tokio::spawn(async move {
            if let Err(e) = event_server.run().await {
                tracing::error!("Event server error: {}", e);
            }
        });

        // Periodic re-scan of the menu bar
        let refresh_engine = Arc::clone(&engine);
        let refresh_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(REFRESH_INTERVAL);
            loop {
                interval.tick().await;
                refresh_engine.refresh().await;
            }
        });

        // Poll for permission grant changes
        let poll_permission = Arc::clone(&permission);
        let poll_task = tokio::spawn(async move {
            poll_permission.run_poll().await;
        });

        engine.refresh().await;
        tracing::info!("perch daemon running");

        loop {
            tokio::select! {
                Some((cmd, resp_tx)) = cmd_rx.recv() => {
                    if matches!(cmd, Command::Quit) {
                        let _ = resp_tx.send(Response::Ok);
                        tracing::info!("quit requested, shutting down");
                        break;
                    }
                    let engine = Arc::clone(&engine);
                    tokio::spawn(async move {
                        let response = dispatch(engine, cmd).await;
                        let _ = resp_tx.send(response);
                    });
                }
                Some(reply) = snapshot_rx.recv() => {
                    let items = engine.list_items().await;
                    let _ = reply.send(StateEvent::Snapshot {
                        items,
                        permission_granted: permission.is_granted(),
                    });
                }
                else => break,
            }
        }

        ipc_task.abort();
        event_task.abort();
        refresh_task.abort();
        poll_task.abort();
        Ok(())
    })
}

async fn dispatch<W, I, T>(engine: Arc<Engine<W, I, T>>, cmd: Command) -> Response
where
    W: WindowSystem + Send + Sync + 'static,
    I: InputInjector + Send + Sync + 'static,
    T: TrustProvider + Send + Sync + 'static,
{
    match cmd {
        Command::ListItems => Response::Items {
            items: engine.list_items().await,
        },
        Command::Search { query } => Response::Items {
            items: engine.search(&query).await,
        },
        Command::MoveItem { name, index } => {
            op_response(engine.move_to_index(&name, index).await)
        }
        Command::SwapItem { source, target } => {
            op_response(engine.swap(&source, &target).await)
        }
        Command::HideItem { name } => op_response(engine.hide(&name).await),
        Command::ShowItem { name } => op_response(engine.show(&name).await),
        Command::ToggleItem { name } => op_response(engine.toggle(&name).await),
        Command::Refresh => Response::Items {
            items: engine.refresh().await,
        },
        Command::Permission => Response::Permission {
            info: perch_ipc::PermissionInfo {
                granted: engine.permission_granted(),
            },
        },
        Command::RequestPermission => Response::Permission {
            info: perch_ipc::PermissionInfo {
                granted: engine.request_permission(),
            },
        },
        Command::Quit => Response::Ok,
    }
}

fn op_response(result: Result<(), OpError>) -> Response {
    match result {
        Ok(()) => Response::Ok,
        Err(e) => Response::Error {
            message: e.to_string(),
        },
    }
}
