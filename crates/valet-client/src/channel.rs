//! Channel manager: owns the lifecycle of the realtime connection.
//!
//! One spawned task exclusively owns the WebSocket handle - connect, send,
//! receive-dispatch, close, reconnect. No other component touches the socket;
//! all sends are routed through [`ChannelHandle::send_text`], which enforces
//! the connectivity precondition. Reconnection is perpetual: after every
//! disconnect exactly one reconnect attempt is scheduled, delayed by the
//! configured [`ReconnectPolicy`], until the handle is shut down.

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use valet_core::error::{Result, ValetError};
use valet_core::session::{ChatMessage, ClientFrame, ConnectivityState, ServerFrame, SessionId};

use crate::config::ClientConfig;
use crate::reconnect::ReconnectPolicy;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Events the channel task emits toward the session controller.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A conversation message arrived on the channel.
    Inbound(ChatMessage),
    /// The connectivity state changed.
    Connectivity(ConnectivityState),
    /// An outbound message was lost to a transport fault after it was
    /// accepted for delivery.
    SendFailed { text: String },
}

/// Handle to the channel task.
///
/// Cloneable; dropping all clones does not stop the task - call
/// [`ChannelHandle::shutdown`] for an orderly teardown that also cancels any
/// pending reconnect attempt.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    outbound: mpsc::Sender<String>,
    connectivity: watch::Receiver<ConnectivityState>,
    cancel: CancellationToken,
}

impl ChannelHandle {
    /// Enqueues a chat message for transmission.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when the channel is not currently connected,
    /// or a channel error if the task's outbound queue is unavailable.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        if !self.connectivity.borrow().is_connected() {
            return Err(ValetError::NotConnected);
        }
        self.outbound
            .try_send(text.into())
            .map_err(|e| ValetError::channel(format!("outbound queue unavailable: {}", e)))
    }

    /// Current connectivity state.
    pub fn connectivity(&self) -> ConnectivityState {
        *self.connectivity.borrow()
    }

    /// Shuts the channel down: closes the socket, cancels any pending
    /// reconnect, and suppresses further attempts.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    #[cfg(test)]
    pub(crate) fn stub(
        state: ConnectivityState,
    ) -> (Self, mpsc::Receiver<String>, watch::Sender<ConnectivityState>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        let (conn_tx, conn_rx) = watch::channel(state);
        let handle = Self {
            outbound: outbound_tx,
            connectivity: conn_rx,
            cancel: CancellationToken::new(),
        };
        (handle, outbound_rx, conn_tx)
    }
}

/// Spawns the channel task for the given session and returns its handle.
///
/// Inbound messages, connectivity transitions, and delivery failures are
/// reported on `events`.
pub fn spawn_channel(
    config: &ClientConfig,
    session_id: &SessionId,
    events: mpsc::Sender<ChannelEvent>,
) -> ChannelHandle {
    let url = config.ws_url(session_id);
    let policy = config.reconnect.clone();
    let (outbound_tx, outbound_rx) = mpsc::channel(64);
    let (conn_tx, conn_rx) = watch::channel(ConnectivityState::Disconnected);
    let cancel = CancellationToken::new();

    tokio::spawn(run_channel(
        url,
        policy,
        outbound_rx,
        conn_tx,
        events,
        cancel.clone(),
    ));

    ChannelHandle {
        outbound: outbound_tx,
        connectivity: conn_rx,
        cancel,
    }
}

/// The connect/reconnect loop.
///
/// A single loop drives the whole state machine, so at most one connect
/// attempt or reconnect delay can ever be outstanding - a disconnect while a
/// delay is pending cannot schedule a second concurrent attempt.
async fn run_channel(
    url: String,
    policy: ReconnectPolicy,
    mut outbound: mpsc::Receiver<String>,
    conn_tx: watch::Sender<ConnectivityState>,
    events: mpsc::Sender<ChannelEvent>,
    cancel: CancellationToken,
) {
    let mut failed_attempts: u32 = 0;

    loop {
        set_state(&conn_tx, &events, ConnectivityState::Connecting).await;

        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((stream, _)) => {
                info!(%url, "channel connected");
                failed_attempts = 0;
                set_state(&conn_tx, &events, ConnectivityState::Connected).await;

                run_connected(stream, &mut outbound, &events, &cancel).await;

                set_state(&conn_tx, &events, ConnectivityState::Disconnected).await;
                if cancel.is_cancelled() {
                    break;
                }
                info!(%url, "channel closed, reconnect scheduled");
            }
            Err(e) => {
                warn!(%url, error = %e, "connect failed");
                set_state(&conn_tx, &events, ConnectivityState::Disconnected).await;
                failed_attempts += 1;
            }
        }

        let delay = policy.delay_for(failed_attempts.saturating_sub(1));
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    debug!(%url, "channel task stopped");
}

/// Pumps one open connection until it closes, errors, or is cancelled.
async fn run_connected(
    stream: WsStream,
    outbound: &mut mpsc::Receiver<String>,
    events: &mpsc::Sender<ChannelEvent>,
    cancel: &CancellationToken,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return;
            }

            maybe_text = outbound.recv() => {
                let Some(text) = maybe_text else { return };
                let frame = ClientFrame::new(text.clone());
                let payload = match serde_json::to_string(&frame) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "failed to serialize outbound frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(payload)).await {
                    warn!(error = %e, "outbound send failed");
                    let _ = events.send(ChannelEvent::SendFailed { text }).await;
                    return;
                }
            }

            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch_frame(&text, events).await,
                Some(Ok(Message::Close(_))) => {
                    debug!("backend sent close frame");
                    return;
                }
                // Ping/pong handled by the protocol layer; binary is not
                // part of this protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "channel transport error");
                    return;
                }
                None => return,
            }
        }
    }
}

/// Parses one inbound frame and dispatches it.
///
/// A parse failure drops the single frame without tearing down the channel;
/// unknown frame types are ignored for forward compatibility.
async fn dispatch_frame(text: &str, events: &mpsc::Sender<ChannelEvent>) {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::Message { data }) => {
            let _ = events.send(ChannelEvent::Inbound(data)).await;
        }
        Ok(ServerFrame::Unknown) => {
            debug!("ignoring frame with unrecognized type");
        }
        Err(e) => {
            warn!(error = %e, "dropping malformed inbound frame");
        }
    }
}

async fn set_state(
    conn_tx: &watch::Sender<ConnectivityState>,
    events: &mpsc::Sender<ChannelEvent>,
    state: ConnectivityState,
) {
    // send_replace so the state is visible to send_text even with no
    // subscribers awake.
    let previous = conn_tx.send_replace(state);
    if previous != state {
        let _ = events.send(ChannelEvent::Connectivity(state)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_text_requires_connected_state() {
        let (handle, _outbound, _conn) = ChannelHandle::stub(ConnectivityState::Disconnected);
        let err = handle.send_text("status?").unwrap_err();
        assert!(err.is_not_connected());
    }

    #[tokio::test]
    async fn test_send_text_enqueues_when_connected() {
        let (handle, mut outbound, _conn) = ChannelHandle::stub(ConnectivityState::Connected);
        handle.send_text("status?").unwrap();
        assert_eq!(outbound.recv().await.unwrap(), "status?");
    }

    #[tokio::test]
    async fn test_malformed_inbound_frame_is_dropped_without_event() {
        let (events_tx, mut events_rx) = mpsc::channel(4);

        dispatch_frame("{not json at all", &events_tx).await;
        dispatch_frame(r#"{"type":"message"}"#, &events_tx).await; // missing data
        dispatch_frame(r#"{"type":"message","data":{"id":1}}"#, &events_tx).await;

        assert!(events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_frame_type_is_ignored() {
        let (events_tx, mut events_rx) = mpsc::channel(4);

        dispatch_frame(r#"{"type":"heartbeat","data":{"seq":7}}"#, &events_tx).await;

        assert!(events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_message_frame_is_forwarded() {
        let (events_tx, mut events_rx) = mpsc::channel(4);

        dispatch_frame(
            r#"{
                "type": "message",
                "data": {
                    "id": "m-1",
                    "session_id": "session_test",
                    "message": "All systems nominal",
                    "sender": "jarvis",
                    "timestamp": "2024-01-01T00:00:00Z",
                    "message_type": "text"
                }
            }"#,
            &events_tx,
        )
        .await;

        match events_rx.try_recv().unwrap() {
            ChannelEvent::Inbound(message) => {
                assert_eq!(message.id, "m-1");
                assert_eq!(message.message, "All systems nominal");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_failure_emits_single_disconnect_transition() {
        // Nothing listens on this port, so the connect attempt fails fast.
        let config = ClientConfig::new("http://127.0.0.1:9");
        let session_id = SessionId::generate();
        let (events_tx, mut events_rx) = mpsc::channel(16);

        let handle = spawn_channel(&config, &session_id, events_tx);

        let mut transitions = Vec::new();
        while transitions.len() < 2 {
            match events_rx.recv().await {
                Some(ChannelEvent::Connectivity(state)) => transitions.push(state),
                Some(_) => {}
                None => break,
            }
        }
        handle.shutdown();

        assert_eq!(
            transitions,
            vec![
                ConnectivityState::Connecting,
                ConnectivityState::Disconnected
            ]
        );
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_reconnect() {
        let config = ClientConfig::new("http://127.0.0.1:9");
        let session_id = SessionId::generate();
        let (events_tx, mut events_rx) = mpsc::channel(16);

        let handle = spawn_channel(&config, &session_id, events_tx);

        // Wait for the first failed attempt, then shut down during the
        // reconnect delay. The event stream must end without another
        // Connecting transition.
        loop {
            match events_rx.recv().await {
                Some(ChannelEvent::Connectivity(ConnectivityState::Disconnected)) => break,
                Some(_) => {}
                None => panic!("channel task ended prematurely"),
            }
        }
        handle.shutdown();

        while let Some(event) = events_rx.recv().await {
            if let ChannelEvent::Connectivity(state) = event {
                assert_ne!(state, ConnectivityState::Connecting);
            }
        }
    }
}
