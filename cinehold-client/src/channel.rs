use crate::error::ChannelError;
use async_trait::async_trait;
use cinehold_core::SeatUpdate;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Stream of parsed seat updates from one established push connection
pub type UpdateStream = BoxStream<'static, Result<SeatUpdate, ChannelError>>;

/// Transport-level connection to the seat-lock push service, addressed per
/// showtime. Implemented over WebSocket in production and mocked in tests.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn connect(&self, endpoint: &str, showtime_id: &str) -> Result<UpdateStream, ChannelError>;
}

/// WebSocket push transport via tokio-tungstenite
pub struct WsTransport;

#[async_trait]
impl PushTransport for WsTransport {
    async fn connect(&self, endpoint: &str, showtime_id: &str) -> Result<UpdateStream, ChannelError> {
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), showtime_id);
        let (ws, _) = connect_async(&url)
            .await
            .map_err(|err| ChannelError::Transport(err.to_string()))?;

        // Receive-only: the server pushes one message per seat-state change
        let updates = ws.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<SeatUpdate>(&text) {
                    Ok(update) => Some(Ok(update)),
                    Err(err) => {
                        tracing::warn!(error = %err, "discarding unparseable push message");
                        None
                    }
                },
                Ok(Message::Close(_)) => Some(Err(ChannelError::Transport("server closed".to_string()))),
                Ok(_) => None,
                Err(err) => Some(Err(ChannelError::Transport(err.to_string()))),
            }
        });

        Ok(updates.boxed())
    }
}

/// Bounded reconnection: a fixed number of attempts with a fixed delay, then
/// the channel goes silent and the UI keeps its last seat snapshot
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, delay: Duration::from_secs(2) }
    }
}

type UpdateCallback = Box<dyn Fn(&SeatUpdate) + Send + Sync>;

#[derive(Default)]
struct SubscriberSet {
    callbacks: Mutex<HashMap<u64, UpdateCallback>>,
}

impl SubscriberSet {
    fn insert(&self, id: u64, callback: UpdateCallback) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.insert(id, callback);
        }
    }

    fn remove(&self, id: u64) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.remove(&id);
        }
    }

    fn len(&self) -> usize {
        self.callbacks.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn fan_out(&self, update: &SeatUpdate) {
        if let Ok(callbacks) = self.callbacks.lock() {
            for callback in callbacks.values() {
                callback(update);
            }
        }
    }
}

struct ActiveChannel {
    showtime_id: String,
    subscribers: Arc<SubscriberSet>,
    /// Set by the reader once it gives up reconnecting; the entry then no
    /// longer counts as connected and callers fall back to REST polling
    dead: Arc<AtomicBool>,
    reader: tokio::task::JoinHandle<()>,
}

impl ActiveChannel {
    fn is_live(&self, showtime_id: &str) -> bool {
        self.showtime_id == showtime_id && !self.dead.load(Ordering::SeqCst)
    }
}

/// The one live push connection per showtime, shared by every view that wants
/// seat updates.
///
/// `connect` is idempotent for the current showtime and switches showtimes by
/// tearing the previous connection down. Subscribing registers a callback that
/// receives every message; `disconnect` only closes the transport once no
/// subscriber remains, so one consumer going away cannot cut off another.
pub struct SeatLockChannel {
    transport: Arc<dyn PushTransport>,
    endpoint: String,
    policy: ReconnectPolicy,
    active: tokio::sync::Mutex<Option<ActiveChannel>>,
    next_subscriber_id: AtomicU64,
}

/// Handle for one registered callback; dropping it (or calling `unsubscribe`)
/// deregisters. Deregistering the last subscriber does not itself disconnect.
pub struct SubscriptionGuard {
    id: u64,
    subscribers: Weak<SubscriberSet>,
}

impl SubscriptionGuard {
    pub fn unsubscribe(self) {}
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.remove(self.id);
        }
    }
}

impl SeatLockChannel {
    pub fn new(transport: Arc<dyn PushTransport>, endpoint: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            policy,
            active: tokio::sync::Mutex::new(None),
            next_subscriber_id: AtomicU64::new(1),
        }
    }

    /// Connect to the push channel for `showtime_id`.
    ///
    /// Already connected to the same showtime: returns immediately. Connected
    /// to a different one: that connection is torn down first. A transport
    /// failure is returned to the caller, who treats it as non-fatal (seat
    /// display degrades, booking continues).
    pub async fn connect(&self, showtime_id: &str) -> Result<(), ChannelError> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref() {
            if current.is_live(showtime_id) {
                return Ok(());
            }
        }
        if let Some(previous) = active.take() {
            tracing::info!(showtime_id = %previous.showtime_id, "switching showtime, closing previous channel");
            previous.reader.abort();
        }

        let stream = self.transport.connect(&self.endpoint, showtime_id).await?;
        let subscribers = Arc::new(SubscriberSet::default());
        let dead = Arc::new(AtomicBool::new(false));

        let reader = tokio::spawn(run_reader(
            stream,
            Arc::clone(&self.transport),
            self.endpoint.clone(),
            showtime_id.to_string(),
            Arc::clone(&subscribers),
            self.policy.clone(),
            Arc::clone(&dead),
        ));

        tracing::info!(showtime_id, "seat push channel connected");
        *active = Some(ActiveChannel {
            showtime_id: showtime_id.to_string(),
            subscribers,
            dead,
            reader,
        });
        Ok(())
    }

    /// Register a callback for every parsed update of the connected showtime
    pub async fn subscribe(
        &self,
        showtime_id: &str,
        callback: impl Fn(&SeatUpdate) + Send + Sync + 'static,
    ) -> Result<SubscriptionGuard, ChannelError> {
        let active = self.active.lock().await;
        let current = active
            .as_ref()
            .filter(|c| c.is_live(showtime_id))
            .ok_or_else(|| ChannelError::NotConnected(showtime_id.to_string()))?;

        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        current.subscribers.insert(id, Box::new(callback));

        Ok(SubscriptionGuard {
            id,
            subscribers: Arc::downgrade(&current.subscribers),
        })
    }

    /// Tear the transport down, but only if nobody is subscribed anymore.
    /// With subscribers remaining this is a safe no-op.
    pub async fn disconnect(&self) {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref() {
            let remaining = current.subscribers.len();
            if remaining > 0 {
                tracing::debug!(remaining, "disconnect skipped, channel still in use");
                return;
            }
        }

        if let Some(previous) = active.take() {
            previous.reader.abort();
            tracing::info!(showtime_id = %previous.showtime_id, "seat push channel closed");
        }
    }

    /// True while a live reader exists for `showtime_id`. Goes false once the
    /// reader exhausts its reconnect attempts.
    pub async fn is_connected(&self, showtime_id: &str) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|c| c.is_live(showtime_id))
            .unwrap_or(false)
    }
}

async fn run_reader(
    mut stream: UpdateStream,
    transport: Arc<dyn PushTransport>,
    endpoint: String,
    showtime_id: String,
    subscribers: Arc<SubscriberSet>,
    policy: ReconnectPolicy,
    dead: Arc<AtomicBool>,
) {
    loop {
        while let Some(item) = stream.next().await {
            match item {
                Ok(update) => {
                    if update.showtime_id == showtime_id {
                        subscribers.fan_out(&update);
                    }
                }
                Err(err) => {
                    tracing::warn!(showtime_id = %showtime_id, error = %err, "push stream error");
                    break;
                }
            }
        }

        // Unexpected closure: bounded retries, then give up and leave the UI
        // with its last snapshot.
        let mut reconnected = false;
        for attempt in 1..=policy.max_attempts {
            tokio::time::sleep(policy.delay).await;
            match transport.connect(&endpoint, &showtime_id).await {
                Ok(next_stream) => {
                    tracing::info!(showtime_id = %showtime_id, attempt, "push channel reconnected");
                    stream = next_stream;
                    reconnected = true;
                    break;
                }
                Err(err) => {
                    tracing::warn!(showtime_id = %showtime_id, attempt, error = %err, "push reconnect failed");
                }
            }
        }

        if !reconnected {
            tracing::warn!(
                showtime_id = %showtime_id,
                attempts = policy.max_attempts,
                "push channel gave up reconnecting"
            );
            dead.store(true, Ordering::SeqCst);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinehold_core::SeatStatus;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    type Inject = mpsc::UnboundedSender<Result<SeatUpdate, ChannelError>>;

    /// Transport whose connections are in-memory streams the test can feed,
    /// optionally failing the first N connect attempts
    #[derive(Default)]
    struct MockTransport {
        senders: Mutex<Vec<Inject>>,
        fail_next_connects: AtomicU32,
        connect_count: AtomicU32,
    }

    impl MockTransport {
        fn latest_sender(&self) -> Inject {
            self.senders.lock().unwrap().last().unwrap().clone()
        }

        fn connects(&self) -> u32 {
            self.connect_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PushTransport for MockTransport {
        async fn connect(&self, _endpoint: &str, _showtime_id: &str) -> Result<UpdateStream, ChannelError> {
            self.connect_count.fetch_add(1, Ordering::SeqCst);
            let failures = self.fail_next_connects.load(Ordering::SeqCst);
            if failures > 0 {
                self.fail_next_connects.store(failures - 1, Ordering::SeqCst);
                return Err(ChannelError::Transport("mock connect refused".to_string()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            self.senders.lock().unwrap().push(tx);
            Ok(UnboundedReceiverStream::new(rx).boxed())
        }
    }

    fn update(showtime_id: &str, seat_id: &str) -> SeatUpdate {
        SeatUpdate {
            showtime_id: showtime_id.to_string(),
            seat_id: seat_id.to_string(),
            status: SeatStatus::Locked,
            ttl: Some(300),
        }
    }

    async fn wait_for(counter: &Arc<AtomicU32>, expected: u32) {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected counter to reach {expected}, got {}", counter.load(Ordering::SeqCst));
    }

    fn fast_policy(attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_attempts: attempts, delay: Duration::from_millis(10) }
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_message() {
        let transport = Arc::new(MockTransport::default());
        let channel = SeatLockChannel::new(transport.clone(), "ws://test", fast_policy(1));
        channel.connect("st-1").await.unwrap();

        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let first_clone = Arc::clone(&first);
        let second_clone = Arc::clone(&second);

        let _sub_a = channel
            .subscribe("st-1", move |_| { first_clone.fetch_add(1, Ordering::SeqCst); })
            .await
            .unwrap();
        let _sub_b = channel
            .subscribe("st-1", move |_| { second_clone.fetch_add(1, Ordering::SeqCst); })
            .await
            .unwrap();

        let sender = transport.latest_sender();
        sender.send(Ok(update("st-1", "A1"))).unwrap();
        sender.send(Ok(update("st-1", "A2"))).unwrap();
        // A message for another showtime never reaches the subscribers
        sender.send(Ok(update("st-9", "Z9"))).unwrap();

        wait_for(&first, 2).await;
        wait_for(&second, 2).await;
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent_per_showtime() {
        let transport = Arc::new(MockTransport::default());
        let channel = SeatLockChannel::new(transport.clone(), "ws://test", fast_policy(1));

        channel.connect("st-1").await.unwrap();
        channel.connect("st-1").await.unwrap();

        assert_eq!(transport.connects(), 1);
        assert!(channel.is_connected("st-1").await);
    }

    #[tokio::test]
    async fn test_switching_showtime_tears_down_previous() {
        let transport = Arc::new(MockTransport::default());
        let channel = SeatLockChannel::new(transport.clone(), "ws://test", fast_policy(1));

        channel.connect("st-1").await.unwrap();
        let old_sender = transport.latest_sender();

        channel.connect("st-2").await.unwrap();
        assert!(channel.is_connected("st-2").await);
        assert!(!channel.is_connected("st-1").await);

        // The old reader task is gone, so its receiver has been dropped
        for _ in 0..200 {
            if old_sender.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(old_sender.is_closed());
    }

    #[tokio::test]
    async fn test_disconnect_refused_while_subscribers_remain() {
        let transport = Arc::new(MockTransport::default());
        let channel = SeatLockChannel::new(transport.clone(), "ws://test", fast_policy(1));
        channel.connect("st-1").await.unwrap();

        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);
        let sub_a = channel
            .subscribe("st-1", move |_| { seen_clone.fetch_add(1, Ordering::SeqCst); })
            .await
            .unwrap();
        let sub_b = channel.subscribe("st-1", |_| {}).await.unwrap();

        // One consumer leaves and disconnects; the other must keep receiving
        sub_b.unsubscribe();
        channel.disconnect().await;
        assert!(channel.is_connected("st-1").await);

        transport.latest_sender().send(Ok(update("st-1", "A1"))).unwrap();
        wait_for(&seen, 1).await;

        // Last subscriber gone: unsubscribing alone still keeps the transport,
        // only the explicit disconnect closes it
        sub_a.unsubscribe();
        assert!(channel.is_connected("st-1").await);
        channel.disconnect().await;
        assert!(!channel.is_connected("st-1").await);
    }

    #[tokio::test]
    async fn test_subscribe_requires_matching_showtime() {
        let transport = Arc::new(MockTransport::default());
        let channel = SeatLockChannel::new(transport, "ws://test", fast_policy(1));
        channel.connect("st-1").await.unwrap();

        let result = channel.subscribe("st-2", |_| {}).await;
        assert!(matches!(result, Err(ChannelError::NotConnected(_))));
    }

    #[tokio::test]
    async fn test_reconnects_after_unexpected_closure() {
        let transport = Arc::new(MockTransport::default());
        let channel = SeatLockChannel::new(transport.clone(), "ws://test", fast_policy(3));
        channel.connect("st-1").await.unwrap();

        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);
        let _sub = channel
            .subscribe("st-1", move |_| { seen_clone.fetch_add(1, Ordering::SeqCst); })
            .await
            .unwrap();

        // First reconnect attempt refused, second succeeds
        transport.fail_next_connects.store(1, Ordering::SeqCst);
        transport.senders.lock().unwrap().clear();

        for _ in 0..400 {
            if transport.connects() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(transport.connects(), 3);

        // Updates flow again over the replacement stream
        transport.latest_sender().send(Ok(update("st-1", "B2"))).unwrap();
        wait_for(&seen, 1).await;
    }

    #[tokio::test]
    async fn test_gives_up_after_bounded_attempts() {
        let transport = Arc::new(MockTransport::default());
        let channel = SeatLockChannel::new(transport.clone(), "ws://test", fast_policy(2));
        channel.connect("st-1").await.unwrap();

        transport.fail_next_connects.store(u32::MAX, Ordering::SeqCst);
        transport.senders.lock().unwrap().clear();

        // 1 initial connect + exactly 2 failed retries, then silence
        for _ in 0..400 {
            if transport.connects() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.connects(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_reconnects_mark_channel_disconnected() {
        let transport = Arc::new(MockTransport::default());
        let channel = SeatLockChannel::new(transport.clone(), "ws://test", fast_policy(1));
        channel.connect("st-1").await.unwrap();
        assert!(channel.is_connected("st-1").await);

        transport.fail_next_connects.store(u32::MAX, Ordering::SeqCst);
        transport.senders.lock().unwrap().clear();

        for _ in 0..400 {
            if !channel.is_connected("st-1").await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!channel.is_connected("st-1").await);
        let result = channel.subscribe("st-1", |_| {}).await;
        assert!(matches!(result, Err(ChannelError::NotConnected(_))));

        // A fresh connect replaces the dead entry instead of short-circuiting
        transport.fail_next_connects.store(0, Ordering::SeqCst);
        channel.connect("st-1").await.unwrap();
        assert!(channel.is_connected("st-1").await);
    }
}
