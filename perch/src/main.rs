mod app;
mod core;
mod engine;
mod event_emitter;
mod gesture;
mod ipc;
#[cfg(target_os = "macos")]
mod macos;
mod permission;
mod platform;
mod store;

use anyhow::Result;
use argh::FromArgs;
use ipc::IpcClient;
use tracing_subscriber::EnvFilter;

use perch_ipc::{Command, EventFilter, Response};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Perch - macOS menu bar item organizer
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Option<SubCommand>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum SubCommand {
    Start(StartCmd),
    Version(VersionCmd),
    ListItems(ListItemsCmd),
    Search(SearchCmd),
    MoveItem(MoveItemCmd),
    SwapItem(SwapItemCmd),
    HideItem(HideItemCmd),
    ShowItem(ShowItemCmd),
    ToggleItem(ToggleItemCmd),
    Refresh(RefreshCmd),
    Permission(PermissionCmd),
    Subscribe(SubscribeCmd),
    Quit(QuitCmd),
}

/// Start the perch daemon
#[derive(FromArgs)]
#[argh(subcommand, name = "start")]
struct StartCmd {}

/// Show version information
#[derive(FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCmd {}

/// List all known menu bar items
#[derive(FromArgs)]
#[argh(subcommand, name = "list-items")]
struct ListItemsCmd {}

/// Search items by name (case-insensitive substring)
#[derive(FromArgs)]
#[argh(subcommand, name = "search")]
struct SearchCmd {
    /// search query
    #[argh(positional)]
    query: String,
}

/// Move an item to a position in the bar
#[derive(FromArgs)]
#[argh(subcommand, name = "move-item")]
struct MoveItemCmd {
    /// item name (application owner name)
    #[argh(positional)]
    name: String,
    /// target position, 0 is leftmost
    #[argh(positional)]
    index: usize,
}

/// Swap the positions of two items
#[derive(FromArgs)]
#[argh(subcommand, name = "swap-item")]
struct SwapItemCmd {
    /// first item name
    #[argh(positional)]
    source: String,
    /// second item name
    #[argh(positional)]
    target: String,
}

/// Hide an item by parking it off-screen
#[derive(FromArgs)]
#[argh(subcommand, name = "hide-item")]
struct HideItemCmd {
    /// item name
    #[argh(positional)]
    name: String,
}

/// Bring a hidden item back
#[derive(FromArgs)]
#[argh(subcommand, name = "show-item")]
struct ShowItemCmd {
    /// item name
    #[argh(positional)]
    name: String,
}

/// Hide an item, or show it if it is already hidden
#[derive(FromArgs)]
#[argh(subcommand, name = "toggle-item")]
struct ToggleItemCmd {
    /// item name
    #[argh(positional)]
    name: String,
}

/// Re-scan the menu bar now
#[derive(FromArgs)]
#[argh(subcommand, name = "refresh")]
struct RefreshCmd {}

/// Show (and optionally request) accessibility permission state
#[derive(FromArgs)]
#[argh(subcommand, name = "permission")]
struct PermissionCmd {
    /// show the system consent prompt if permission is missing
    #[argh(switch)]
    request: bool,
}

/// Subscribe to state change events and print them as JSON lines
#[derive(FromArgs)]
#[argh(subcommand, name = "subscribe")]
struct SubscribeCmd {
    /// request a full snapshot on connection
    #[argh(switch)]
    snapshot: bool,
    /// subscribe to layout change events only
    #[argh(switch)]
    layout: bool,
    /// subscribe to permission change events only
    #[argh(switch)]
    permission: bool,
}

/// Quit the perch daemon
#[derive(FromArgs)]
#[argh(subcommand, name = "quit")]
struct QuitCmd {}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    match cli.command {
        None => {
            // No subcommand - show help (simulate --help)
            let args: Vec<&str> = vec!["perch", "--help"];
            match Cli::from_args(&args[..1], &args[1..]) {
                Ok(_) => {}
                Err(e) => {
                    println!("{}", e.output);
                }
            }
            Ok(())
        }
        Some(SubCommand::Start(_)) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .init();

            tracing::info!("perch starting");
            app::run()
        }
        Some(SubCommand::Version(_)) => {
            println!("perch {}", VERSION);
            Ok(())
        }
        Some(SubCommand::Subscribe(cmd)) => {
            let filter = if cmd.layout || cmd.permission {
                Some(EventFilter {
                    layout: cmd.layout,
                    permission: cmd.permission,
                })
            } else {
                None
            };
            ipc::subscribe_and_print(cmd.snapshot, filter)
        }
        Some(subcmd) => run_cli(subcmd),
    }
}

fn run_cli(subcmd: SubCommand) -> Result<()> {
    let cmd = to_command(subcmd);
    let mut client = IpcClient::connect()?;
    let response = client.send(&cmd)?;

    match response {
        Response::Ok => {}
        Response::Error { message } => {
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
        Response::Items { items } => {
            for item in items {
                let position = match (item.x, item.width) {
                    (Some(x), Some(w)) => format!("{:.0}x @ {:.0}", w, x),
                    _ => "off-screen".to_string(),
                };
                println!(
                    "{}: {} [{}]{}{}",
                    item.order,
                    item.name,
                    position,
                    if item.is_system { " (system)" } else { "" },
                    if item.is_hidden { " (hidden)" } else { "" }
                );
            }
        }
        Response::Permission { info } => {
            println!(
                "accessibility: {}",
                if info.granted { "granted" } else { "not granted" }
            );
            if !info.granted {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn to_command(subcmd: SubCommand) -> Command {
    match subcmd {
        SubCommand::Start(_) | SubCommand::Version(_) | SubCommand::Subscribe(_) => {
            unreachable!("handled in main")
        }
        SubCommand::ListItems(_) => Command::ListItems,
        SubCommand::Search(cmd) => Command::Search { query: cmd.query },
        SubCommand::MoveItem(cmd) => Command::MoveItem {
            name: cmd.name,
            index: cmd.index,
        },
        SubCommand::SwapItem(cmd) => Command::SwapItem {
            source: cmd.source,
            target: cmd.target,
        },
        SubCommand::HideItem(cmd) => Command::HideItem { name: cmd.name },
        SubCommand::ShowItem(cmd) => Command::ShowItem { name: cmd.name },
        SubCommand::ToggleItem(cmd) => Command::ToggleItem { name: cmd.name },
        SubCommand::Refresh(_) => Command::Refresh,
        SubCommand::Permission(cmd) => {
            if cmd.request {
                Command::RequestPermission
            } else {
                Command::Permission
            }
        }
        SubCommand::Quit(_) => Command::Quit,
    }
}
