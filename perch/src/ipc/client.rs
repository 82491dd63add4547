use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

use anyhow::{Context, Result};

use perch_ipc::{Command, EventFilter, Response, StateEvent, SubscribeRequest};

use super::SocketPaths;

/// Blocking command client used by the CLI.
pub struct IpcClient {
    stream: UnixStream,
}

impl IpcClient {
    pub fn connect() -> Result<Self> {
        Self::connect_to(&SocketPaths::default())
    }

    pub fn connect_to(paths: &SocketPaths) -> Result<Self> {
        let stream = UnixStream::connect(&paths.commands)
            .context("failed to connect to the perch daemon (is it running?)")?;
        Ok(Self { stream })
    }

    pub fn send(&mut self, cmd: &Command) -> Result<Response> {
        let json = serde_json::to_string(cmd)?;
        writeln!(self.stream, "{}", json)?;
        self.stream.flush()?;

        let mut reader = BufReader::new(&self.stream);
        let mut line = String::new();
        reader.read_line(&mut line)?;

        let response: Response = serde_json::from_str(&line)?;
        Ok(response)
    }
}

/// Blocking subscriber for the event stream.
pub struct EventClient {
    reader: BufReader<UnixStream>,
}

impl EventClient {
    pub fn connect(request: &SubscribeRequest) -> Result<Self> {
        Self::connect_to(&SocketPaths::default(), request)
    }

    pub fn connect_to(paths: &SocketPaths, request: &SubscribeRequest) -> Result<Self> {
        let mut stream = UnixStream::connect(&paths.events)
            .context("failed to connect to the perch event socket")?;

        let json = serde_json::to_string(request)?;
        writeln!(stream, "{}", json)?;
        stream.flush()?;

        Ok(Self {
            reader: BufReader::new(stream),
        })
    }

    /// The next event, or `None` once the daemon closes the stream.
    pub fn next_event(&mut self) -> Result<Option<StateEvent>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let event: StateEvent = serde_json::from_str(&line)?;
        Ok(Some(event))
    }
}

/// Subscribe and print events to stdout until the daemon goes away.
pub fn subscribe_and_print(snapshot: bool, filter: Option<EventFilter>) -> Result<()> {
    let mut request = if snapshot {
        SubscribeRequest::with_snapshot()
    } else {
        SubscribeRequest::default()
    };
    if let Some(filter) = filter {
        request.filter = filter;
    }

    let mut client = EventClient::connect(&request)?;
    while let Some(event) = client.next_event()? {
        println!("{}", serde_json::to_string(&event)?);
    }

    Ok(())
}
