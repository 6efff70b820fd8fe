//! WebSocket link thread.
//!
//! Each connection attempt runs on its own thread that owns the socket. The thread
//! interleaves outbound writes with reads by giving the socket a short read timeout,
//! and reports everything it sees as `LinkEvent`s. It always finishes with exactly
//! one `Closed` event, including when the handshake itself fails.
use std::io::ErrorKind;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{debug, info, warn};
use quotedesk_common::{DeskError, Result};
use tungstenite::Message;
use tungstenite::stream::MaybeTlsStream;
use url::Url;

use super::{Connector, LinkEvent, LinkEventKind, LinkId};

/// Opens real WebSocket connections to a fixed URL.
pub struct WsConnector {
    url: Url,
    poll_interval: Duration,
}

impl WsConnector {
    /// Connector for `url`. `poll_interval` bounds how long a queued outbound frame
    /// can wait behind a blocking read.
    pub fn new(url: Url, poll_interval: Duration) -> Self {
        Self { url, poll_interval }
    }
}

impl Connector for WsConnector {
    fn connect(&mut self, link: LinkId, events: Sender<LinkEvent>) -> Sender<String> {
        let (outbound_tx, outbound_rx) = unbounded::<String>();
        let url = self.url.clone();
        let poll_interval = self.poll_interval;

        thread::spawn(move || {
            let reason = match run_link(&url, link, &events, &outbound_rx, poll_interval) {
                Ok(reason) => reason,
                Err(e) => {
                    warn!("Link {} to {} failed: {}", link, url, e);
                    e.to_string()
                }
            };
            if events
                .send(LinkEvent {
                    link,
                    kind: LinkEventKind::Closed(reason),
                })
                .is_err()
            {
                debug!("Link {} finished after the session went away", link);
            }
        });
        outbound_tx
    }
}

/// Drives one connection until it closes. Returns the close reason.
fn run_link(
    url: &Url,
    link: LinkId,
    events: &Sender<LinkEvent>,
    outbound: &Receiver<String>,
    poll_interval: Duration,
) -> Result<String> {
    info!("Connecting to {} (link {})", url, link);
    let (mut socket, response) = tungstenite::connect(url.as_str())
        .map_err(|e| DeskError::Transport(format!("connect failed: {}", e)))?;
    debug!("Handshake complete, HTTP status {}", response.status());

    set_read_timeout(socket.get_ref(), poll_interval)?;
    emit(events, link, LinkEventKind::Opened)?;

    loop {
        loop {
            match outbound.try_recv() {
                Ok(frame) => {
                    debug!("Link {} sending {}", link, frame);
                    socket
                        .send(Message::Text(frame))
                        .map_err(|e| DeskError::Transport(e.to_string()))?;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    return Ok(String::from("closed locally"));
                }
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => emit(events, link, LinkEventKind::Frame(text))?,
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| String::from("server closed the connection"));
                return Ok(reason);
            }
            Ok(Message::Binary(bytes)) => {
                debug!("Link {} ignoring {}-byte binary frame", link, bytes.len());
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => return Err(DeskError::Transport(e.to_string())),
        }
    }
}

fn emit(events: &Sender<LinkEvent>, link: LinkId, kind: LinkEventKind) -> Result<()> {
    events
        .send(LinkEvent { link, kind })
        .map_err(|e| DeskError::ChannelSend(e.to_string()))
}

fn set_read_timeout(stream: &MaybeTlsStream<TcpStream>, timeout: Duration) -> Result<()> {
    match stream {
        MaybeTlsStream::Plain(tcp) => tcp.set_read_timeout(Some(timeout))?,
        MaybeTlsStream::NativeTls(tls) => tls.get_ref().set_read_timeout(Some(timeout))?,
        _ => {}
    }
    Ok(())
}
