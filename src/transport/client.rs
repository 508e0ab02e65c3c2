use std::sync::mpsc::Sender;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::engine::{ControlCommand, SessionEvent};
use crate::errors::MonitorError;

use super::Frame;

pub(crate) const RECONNECT_WAIT_MS: u64 = 3_000;
pub(crate) const MAX_RECONNECT_ATTEMPTS: u32 = 5;

pub struct ClientOptions {
    pub url: String,
    pub reconnect_wait_ms: u64,
    pub max_reconnect_attempts: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080".to_string(),
            reconnect_wait_ms: RECONNECT_WAIT_MS,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

enum ConnectionEnd {
    /// The relay side went away; the caller should reconnect
    Lost,
    /// The local command channel closed; the application is shutting down
    LocalShutdown,
}

/// Connects to the relay and feeds decoded frames into the session channel.
/// Control commands queued locally are forwarded to the relay so counterpart
/// devices and other dashboards see them too.
///
/// Reconnects on loss with a fixed delay and a capped attempt count; the
/// lap session survives reconnects, only an explicit reset clears it.
pub async fn run_client(
    options: ClientOptions,
    events: Sender<SessionEvent>,
    mut commands: UnboundedReceiver<ControlCommand>,
) -> Result<(), MonitorError> {
    let mut attempts: u32 = 0;
    loop {
        match connect_async(options.url.as_str()).await {
            Ok((ws, _)) => {
                info!("connected to relay at {}", options.url);
                attempts = 0;
                match serve_connection(ws, &events, &mut commands).await {
                    Ok(ConnectionEnd::LocalShutdown) => return Ok(()),
                    Ok(ConnectionEnd::Lost) => warn!("relay connection closed"),
                    Err(e) => warn!("relay connection lost: {}", e),
                }
            }
            Err(e) => warn!("could not reach relay at {}: {}", options.url, e),
        }

        attempts += 1;
        if attempts >= options.max_reconnect_attempts {
            return Err(MonitorError::ReconnectAttemptsExhausted { attempts });
        }
        info!(
            "reconnecting in {} ms (attempt {}/{})",
            options.reconnect_wait_ms, attempts, options.max_reconnect_attempts
        );
        tokio::time::sleep(Duration::from_millis(options.reconnect_wait_ms)).await;
    }
}

async fn serve_connection(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: &Sender<SessionEvent>,
    commands: &mut UnboundedReceiver<ControlCommand>,
) -> Result<ConnectionEnd, MonitorError> {
    let (mut sink, mut source) = ws.split();
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    let frame = Frame::Control { command };
                    match serde_json::to_string(&frame) {
                        Ok(json) => sink
                            .send(Message::text(json))
                            .await
                            .map_err(|e| MonitorError::WebSocketError { source: e })?,
                        Err(e) => warn!("could not serialize control frame: {}", e),
                    }
                }
                None => return Ok(ConnectionEnd::LocalShutdown),
            },
            message = source.next() => match message {
                Some(Ok(Message::Text(text))) => dispatch_frame(text.as_str(), events),
                Some(Ok(Message::Close(_))) | None => return Ok(ConnectionEnd::Lost),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(MonitorError::WebSocketError { source: e }),
            },
        }
    }
}

fn dispatch_frame(text: &str, events: &Sender<SessionEvent>) {
    match serde_json::from_str::<Frame>(text) {
        Ok(frame) => {
            debug!("frame from relay: {:?}", frame);
            // a closed session channel means the app is exiting
            let _ = events.send(frame.into_event());
        }
        Err(e) => warn!("malformed frame from relay dropped: {}", e),
    }
}
