//! Connection manager for the live tally feed.
//!
//! Owns one logical push-channel connection per SMS short-code: connect,
//! heartbeat every 25 seconds, one pending reconnect at a time after a fixed
//! 5 second delay, and teardown that synchronously cancels both timers and
//! the channel. The loop is generic over a connector so the timer behavior
//! is testable against a fake socket under a paused clock.

use crate::config::SyncConfig;
use crate::models::events::Event;
use crate::models::websocket::{PingMessage, SocketMessage};
use anyhow::{ensure, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, sleep, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

pub struct WsHandle {
    shutdown_tx: oneshot::Sender<()>,
}

impl WsHandle {
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        (Self { shutdown_tx }, shutdown_rx)
    }

    /// Stops the feed. The owning loop drops its connection, heartbeat and
    /// any pending reconnect timer as soon as the signal lands; sending to
    /// an already-finished loop is a no-op, so repeated teardown is safe.
    pub fn shutdown(self) {
        info!("Shutting down WebSocket");
        let _ = self.shutdown_tx.send(());
    }
}

/// Runs the live tally feed for one SMS short-code until shutdown.
///
/// The initial connection failure surfaces to the caller. Later open
/// failures end the loop with a logged error instead: a failed open never
/// yields a close notification, and reconnects are only scheduled from
/// close, so nothing retries it.
pub async fn run_websocket(
    config: &SyncConfig,
    sms_number: &str,
    sender: mpsc::Sender<Event>,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<()> {
    ensure!(!sms_number.is_empty(), "SMS number must not be empty");
    let url = config.channel_url(sms_number);
    debug!("Connecting to live tally feed: {}", url);

    // Reconnects reuse the exact same address.
    let connector = move || {
        let url = url.clone();
        async move { connect_async(url).await.map(|(ws, _)| ws) }
    };

    supervise(
        connector,
        sender,
        shutdown_rx,
        config.heartbeat_interval,
        config.reconnect_delay,
    )
    .await
}

async fn supervise<C, Fut, S>(
    connector: C,
    sender: mpsc::Sender<Event>,
    shutdown_rx: oneshot::Receiver<()>,
    heartbeat: Duration,
    backoff: Duration,
) -> Result<()>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<S, WsError>>,
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    tokio::select! {
        res = reconnect_loop(connector, sender, heartbeat, backoff) => res,
        _ = shutdown_rx => {
            info!("Live tally feed shutdown requested");
            Ok(())
        }
    }
}

async fn reconnect_loop<C, Fut, S>(
    mut connector: C,
    sender: mpsc::Sender<Event>,
    heartbeat: Duration,
    backoff: Duration,
) -> Result<()>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<S, WsError>>,
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    let mut first_attempt = true;
    loop {
        let ws = match connector().await {
            Ok(ws) => ws,
            Err(e) if first_attempt => return Err(e.into()),
            Err(e) => {
                error!("WebSocket reconnect failed: {}", e);
                return Ok(());
            }
        };
        first_attempt = false;

        info!("WebSocket connection established");
        if sender.send(Event::ConnectionEstablished).is_err() {
            return Ok(());
        }

        let (sink, read) = ws.split();
        drive_session(sink, read, sender.clone(), heartbeat).await;

        if sender.send(Event::ConnectionLost).is_err() {
            return Ok(());
        }

        // At most one reconnect pending at a time; the next attempt is not
        // scheduled until this sleep elapses.
        sleep(backoff).await;
        info!("Attempting to reconnect WebSocket...");
    }
}

/// Pumps one connected session: inbound frames become tally events, the
/// heartbeat probe goes out on its interval, and a remote close ends the
/// session. Ping failures are logged, never escalated.
async fn drive_session<Si, St>(
    mut sink: Si,
    mut read: St,
    sender: mpsc::Sender<Event>,
    heartbeat: Duration,
) where
    Si: Sink<Message> + Unpin,
    Si::Error: std::fmt::Display,
    St: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let mut ping = interval_at(Instant::now() + heartbeat, heartbeat);
    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<SocketMessage>(text.as_str()) {
                        Ok(message) => {
                            debug!("Tally received for item {}", message.voting_item_id);
                            if sender.send(Event::Tally(message.into())).is_err() {
                                // Rendering layer is gone; stop pumping.
                                return;
                            }
                        }
                        Err(e) => warn!("Dropping malformed message: {}", e),
                    }
                }
                // Control frames carry no tallies.
                Some(Ok(_)) => {}
                // A transport error alone does not end the session; the
                // close that follows it does.
                Some(Err(e)) => error!("WebSocket error: {}", e),
                None => {
                    info!("WebSocket is closed");
                    return;
                }
            },
            _ = ping.tick() => {
                match serde_json::to_string(&PingMessage::new()) {
                    Ok(probe) => {
                        if let Err(e) = sink.send(Message::text(probe)).await {
                            warn!("Failed to send ping: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to encode ping: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    /// In-memory stand-in for a WebSocketStream: replays scripted inbound
    /// frames and records everything sent.
    struct FakeSocket {
        incoming: VecDeque<Result<Message, WsError>>,
        sent: Arc<Mutex<Vec<Message>>>,
        stay_open: bool,
    }

    impl Stream for FakeSocket {
        type Item = Result<Message, WsError>;

        fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            let this = self.get_mut();
            match this.incoming.pop_front() {
                Some(frame) => Poll::Ready(Some(frame)),
                None if this.stay_open => Poll::Pending,
                None => Poll::Ready(None),
            }
        }
    }

    impl Sink<Message> for FakeSocket {
        type Error = WsError;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), WsError> {
            self.get_mut().sent.lock().unwrap().push(item);
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }
    }

    const HEARTBEAT: Duration = Duration::from_secs(25);
    const BACKOFF: Duration = Duration::from_secs(5);

    fn tally_frame(voting_item_id: i64) -> Result<Message, WsError> {
        Ok(Message::text(format!(
            r#"{{"voting_id":1,"voting_item_id":{},"client_id":7,"message":"02","date":"2024-11-02 10:15:00"}}"#,
            voting_item_id
        )))
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_pings_on_the_interval() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let socket = FakeSocket {
            incoming: VecDeque::new(),
            sent: sent.clone(),
            stay_open: true,
        };
        let (tx, _rx) = mpsc::channel();
        let (sink, read) = socket.split();
        let session = tokio::spawn(drive_session(sink, read, tx, HEARTBEAT));
        settle().await;

        tokio::time::advance(Duration::from_secs(24)).await;
        settle().await;
        assert!(sent.lock().unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        {
            let sent = sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].to_text().unwrap(), r#"{"type":"ping"}"#);
        }

        tokio::time::advance(Duration::from_secs(25)).await;
        settle().await;
        assert_eq!(sent.lock().unwrap().len(), 2);

        session.abort();
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped_and_later_frames_still_apply() {
        let socket = FakeSocket {
            incoming: VecDeque::from([
                Ok(Message::text("not json")),
                Err(WsError::ConnectionClosed),
                tally_frame(2),
            ]),
            sent: Arc::new(Mutex::new(Vec::new())),
            stay_open: false,
        };
        let (tx, rx) = mpsc::channel();
        let (sink, read) = socket.split();
        drive_session(sink, read, tx, HEARTBEAT).await;

        match rx.try_recv() {
            Ok(Event::Tally(event)) => {
                assert_eq!(event.voting_item_id, 2);
                assert_eq!(event.increment, 1);
            }
            other => panic!("expected a tally event, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_waits_the_full_backoff_and_schedules_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = {
            let attempts = attempts.clone();
            move || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    // Connects fine, then the remote closes immediately.
                    Ok::<_, WsError>(FakeSocket {
                        incoming: VecDeque::new(),
                        sent: Arc::new(Mutex::new(Vec::new())),
                        stay_open: false,
                    })
                }
            }
        };
        let (tx, rx) = mpsc::channel();
        let task = tokio::spawn(reconnect_loop(connector, tx, HEARTBEAT, BACKOFF));
        settle().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(rx.try_recv(), Ok(Event::ConnectionEstablished)));
        assert!(matches!(rx.try_recv(), Ok(Event::ConnectionLost)));

        // Backoff not yet elapsed: the one pending timer must not fire, and
        // the already-observed close must not have stacked another.
        tokio::time::advance(Duration::from_secs(4)).await;
        settle().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(matches!(rx.try_recv(), Ok(Event::ConnectionEstablished)));

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_silences_heartbeat_and_reconnect_timers() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let connector = {
            let attempts = attempts.clone();
            let sent = sent.clone();
            move || {
                attempts.fetch_add(1, Ordering::SeqCst);
                let sent = sent.clone();
                async move {
                    Ok::<_, WsError>(FakeSocket {
                        incoming: VecDeque::new(),
                        sent,
                        stay_open: true,
                    })
                }
            }
        };
        let (tx, rx) = mpsc::channel();
        let (handle, shutdown_rx) = WsHandle::new();
        let task = tokio::spawn(supervise(connector, tx, shutdown_rx, HEARTBEAT, BACKOFF));
        settle().await;

        tokio::time::advance(Duration::from_secs(25)).await;
        settle().await;
        assert_eq!(sent.lock().unwrap().len(), 1);

        handle.shutdown();
        settle().await;
        assert!(task.is_finished());

        // Long after teardown: no pings, no reconnect attempts, no events.
        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;
        assert_eq!(sent.lock().unwrap().len(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(rx.try_recv(), Ok(Event::ConnectionEstablished)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_sms_number_is_rejected_before_any_connect() {
        let config = SyncConfig::default();
        let (tx, _rx) = mpsc::channel();
        let (_handle, shutdown_rx) = WsHandle::new();
        let result = run_websocket(&config, "", tx, shutdown_rx).await;
        assert!(result.is_err());
    }
}
