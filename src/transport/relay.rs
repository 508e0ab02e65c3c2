use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

use crate::errors::MonitorError;

use super::{Frame, epoch_ms};

const BROADCAST_CAPACITY: usize = 256;
const MAX_DATAGRAM_BYTES: usize = 1024;

pub struct RelayOptions {
    /// UDP address the sensor device sends pulse datagrams to
    pub udp_addr: String,
    /// TCP address dashboards connect to over WebSocket
    pub ws_addr: String,
}

/// Forwards device pulse datagrams to every connected dashboard and fans
/// control frames out to all clients. Relay failures stay local: a bad
/// datagram or a dead client is logged and dropped, never propagated to the
/// engine side.
pub async fn run_relay(options: RelayOptions) -> Result<(), MonitorError> {
    let udp = UdpSocket::bind(&options.udp_addr)
        .await
        .map_err(|e| MonitorError::RelayBindError { source: e })?;
    let listener = TcpListener::bind(&options.ws_addr)
        .await
        .map_err(|e| MonitorError::RelayBindError { source: e })?;
    info!(
        "relay listening for pulses on udp://{} and dashboards on ws://{}",
        options.udp_addr, options.ws_addr
    );

    let (frames, _) = broadcast::channel::<String>(BROADCAST_CAPACITY);

    let pulse_frames = frames.clone();
    tokio::spawn(async move {
        forward_datagrams(udp, pulse_frames).await;
    });

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("could not accept dashboard connection: {}", e);
                continue;
            }
        };
        let client_frames = frames.clone();
        let inbox = frames.subscribe();
        tokio::spawn(async move {
            if let Err(e) = serve_dashboard(stream, peer, client_frames, inbox).await {
                warn!("dashboard {} dropped: {}", peer, e);
            }
        });
    }
}

async fn forward_datagrams(udp: UdpSocket, frames: broadcast::Sender<String>) {
    let mut buf = [0u8; MAX_DATAGRAM_BYTES];
    loop {
        let (len, addr) = match udp.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                error!("pulse socket error: {}", e);
                continue;
            }
        };
        let text = match std::str::from_utf8(&buf[..len]) {
            Ok(text) => text.trim(),
            Err(e) => {
                warn!("undecodable datagram from {} dropped: {}", addr, e);
                continue;
            }
        };
        if text.is_empty() {
            continue;
        }
        let frame = Frame::Pulse {
            data: text.to_string(),
            from: addr.to_string(),
            timestamp_ms: epoch_ms(),
        };
        debug!("pulse {:?} from {}", text, addr);
        match serde_json::to_string(&frame) {
            // send only fails when no dashboard is connected; pulses are
            // simply dropped then
            Ok(json) => {
                let _ = frames.send(json);
            }
            Err(e) => error!("could not serialize pulse frame: {}", e),
        }
    }
}

async fn serve_dashboard(
    stream: TcpStream,
    peer: SocketAddr,
    frames: broadcast::Sender<String>,
    mut inbox: broadcast::Receiver<String>,
) -> Result<(), MonitorError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| MonitorError::WebSocketError { source: e })?;
    info!("dashboard {} connected", peer);
    let (mut sink, mut source) = ws.split();

    loop {
        tokio::select! {
            frame = inbox.recv() => match frame {
                Ok(json) => sink
                    .send(Message::text(json))
                    .await
                    .map_err(|e| MonitorError::WebSocketError { source: e })?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("dashboard {} lagged, {} frames skipped", peer, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = source.next() => match message {
                Some(Ok(Message::Text(text))) => handle_dashboard_frame(text.as_str(), peer, &frames),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(MonitorError::WebSocketError { source: e }),
            },
        }
    }
    info!("dashboard {} disconnected", peer);
    Ok(())
}

fn handle_dashboard_frame(text: &str, peer: SocketAddr, frames: &broadcast::Sender<String>) {
    match serde_json::from_str::<Frame>(text) {
        Ok(Frame::Control { command }) => {
            info!("control {:?} from dashboard {}", command, peer);
            // fan out so counterpart devices and other dashboards follow;
            // the sender sees its own command echoed, which is idempotent
            match serde_json::to_string(&Frame::Control { command }) {
                Ok(json) => {
                    let _ = frames.send(json);
                }
                Err(e) => error!("could not serialize control frame: {}", e),
            }
        }
        Ok(Frame::Pulse { .. }) => {
            warn!("ignoring pulse frame from dashboard {}", peer);
        }
        Err(e) => warn!("malformed frame from dashboard {} dropped: {}", peer, e),
    }
}
