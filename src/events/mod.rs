//! Fire-and-forget event bus over Redis pub/sub.
//!
//! Every published fact is wrapped in an [`Event`] envelope and sent on the
//! channel named after the event type. Delivery is at-most-once per
//! subscriber, there is no persistence and no replay. Handlers are kept in a
//! registry owned by the bus value, so independent bus instances (e.g. in
//! tests) never see each other's subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Envelope published on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub payload: serde_json::Value,
}

impl Event {
    fn new(event_type: &str, source: &str, payload: serde_json::Value) -> Self {
        Event {
            event_id: Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            source: source.to_string(),
            payload,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>;

type HandlerRegistry = Arc<RwLock<HashMap<String, Vec<EventHandler>>>>;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("pub/sub task is not running")]
    ChannelClosed,
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

struct SubscribeCmd {
    channel: String,
    ready: oneshot::Sender<redis::RedisResult<()>>,
}

#[derive(Clone)]
enum Transport {
    Redis {
        publisher: ConnectionManager,
        commands: mpsc::Sender<SubscribeCmd>,
    },
    // Dispatches through the registry without leaving the process. Used by
    // tests; semantics (fan-out, isolation, at-most-once) match production.
    InProcess,
}

#[derive(Clone)]
pub struct EventBus {
    source: String,
    transport: Transport,
    handlers: HandlerRegistry,
}

impl EventBus {
    pub async fn connect(redis_url: &str, source: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        let pubsub = client.get_async_pubsub().await?;

        let handlers: HandlerRegistry = Arc::new(RwLock::new(HashMap::new()));
        let (commands, command_rx) = mpsc::channel(16);
        tokio::spawn(Self::run_pubsub(pubsub, command_rx, handlers.clone()));

        Ok(EventBus {
            source: source.to_string(),
            transport: Transport::Redis {
                publisher,
                commands,
            },
            handlers,
        })
    }

    pub fn in_process(source: &str) -> Self {
        EventBus {
            source: source.to_string(),
            transport: Transport::InProcess,
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publishes a fact. Failures are logged and swallowed: a missed event is
    /// an accepted inconsistency (the sweeper or the next release re-triggers
    /// downstream work), never a reason to fail the committed operation.
    pub async fn publish(&self, event_type: &str, payload: serde_json::Value) {
        let event = Event::new(event_type, &self.source, payload);

        match &self.transport {
            Transport::Redis { publisher, .. } => {
                let body = match serde_json::to_string(&event) {
                    Ok(body) => body,
                    Err(e) => {
                        error!("failed to serialize event {}: {}", event_type, e);
                        return;
                    }
                };
                let mut conn = publisher.clone();
                let result: redis::RedisResult<i64> = conn.publish(event_type, body).await;
                match result {
                    Ok(receivers) => {
                        debug!(
                            "Event published: {} ({}), {} receivers",
                            event_type, event.event_id, receivers
                        );
                    }
                    Err(e) => error!("failed to publish {}: {}", event_type, e),
                }
            }
            Transport::InProcess => {
                debug!("Event published: {} ({})", event_type, event.event_id);
                Self::dispatch(&self.handlers, event);
            }
        }
    }

    /// Registers a handler for a channel. Resolves only once the underlying
    /// subscription is active, so a caller can rely on delivery afterwards.
    pub async fn subscribe(
        &self,
        event_type: &str,
        handler: EventHandler,
    ) -> Result<(), EventBusError> {
        self.handlers
            .write()
            .expect("handler registry lock poisoned")
            .entry(event_type.to_string())
            .or_default()
            .push(handler);

        if let Transport::Redis { commands, .. } = &self.transport {
            let (ready_tx, ready_rx) = oneshot::channel();
            commands
                .send(SubscribeCmd {
                    channel: event_type.to_string(),
                    ready: ready_tx,
                })
                .await
                .map_err(|_| EventBusError::ChannelClosed)?;
            ready_rx.await.map_err(|_| EventBusError::ChannelClosed)??;
        }

        info!("Subscribed to {}", event_type);
        Ok(())
    }

    // Each handler runs in its own task: one slow or panicking handler never
    // affects the others.
    fn dispatch(handlers: &HandlerRegistry, event: Event) {
        let matching = handlers
            .read()
            .expect("handler registry lock poisoned")
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        for handler in matching {
            let event = event.clone();
            tokio::spawn(async move { handler(event).await });
        }
    }

    async fn run_pubsub(
        pubsub: redis::aio::PubSub,
        mut commands: mpsc::Receiver<SubscribeCmd>,
        handlers: HandlerRegistry,
    ) {
        let (mut sink, mut stream) = pubsub.split();

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => {
                        let result = sink.subscribe(&cmd.channel).await;
                        if let Err(ref e) = result {
                            error!("failed to subscribe to {}: {}", cmd.channel, e);
                        }
                        let _ = cmd.ready.send(result);
                    }
                    None => break,
                },
                msg = stream.next() => match msg {
                    Some(msg) => {
                        let channel = msg.get_channel_name().to_string();
                        let raw: String = match msg.get_payload() {
                            Ok(raw) => raw,
                            Err(e) => {
                                warn!("unreadable message on {}: {}", channel, e);
                                continue;
                            }
                        };
                        match serde_json::from_str::<Event>(&raw) {
                            Ok(event) => Self::dispatch(&handlers, event),
                            Err(e) => warn!("discarding malformed event on {}: {}", channel, e),
                        }
                    }
                    None => {
                        warn!("pub/sub stream closed, event delivery stopped");
                        break;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    fn forwarding_handler(tx: mpsc::Sender<Event>) -> EventHandler {
        Arc::new(move |event: Event| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(event).await;
            })
        })
    }

    #[tokio::test]
    async fn publish_wraps_payload_in_envelope() {
        let bus = EventBus::in_process("seat-service-test");
        let (tx, mut rx) = mpsc::channel(1);
        bus.subscribe("seat.released", forwarding_handler(tx))
            .await
            .unwrap();

        bus.publish("seat.released", json!({"seatId": "12A", "flightId": "SK123"}))
            .await;

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("delivery timed out")
            .expect("channel closed");
        assert_eq!(event.event_type, "seat.released");
        assert_eq!(event.source, "seat-service-test");
        assert_eq!(event.payload["seatId"], "12A");
        assert!(Uuid::parse_str(&event.event_id).is_ok());
    }

    #[tokio::test]
    async fn publish_fans_out_to_every_handler() {
        let bus = EventBus::in_process("test");
        let (tx_a, mut rx_a) = mpsc::channel(1);
        let (tx_b, mut rx_b) = mpsc::channel(1);
        bus.subscribe("seat.hold.expired", forwarding_handler(tx_a))
            .await
            .unwrap();
        bus.subscribe("seat.hold.expired", forwarding_handler(tx_b))
            .await
            .unwrap();

        bus.publish("seat.hold.expired", json!({"seatId": "3C"})).await;

        assert!(timeout(Duration::from_secs(1), rx_a.recv()).await.is_ok());
        assert!(timeout(Duration::from_secs(1), rx_b.recv()).await.is_ok());
    }

    #[tokio::test]
    async fn panicking_handler_does_not_block_others() {
        let bus = EventBus::in_process("test");
        let (tx, mut rx) = mpsc::channel(1);
        bus.subscribe(
            "seat.released",
            Arc::new(|_event: Event| {
                Box::pin(async move {
                    panic!("subscriber bug");
                })
            }),
        )
        .await
        .unwrap();
        bus.subscribe("seat.released", forwarding_handler(tx))
            .await
            .unwrap();

        bus.publish("seat.released", json!({"seatId": "7B"})).await;

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("healthy handler starved by panicking one")
            .expect("channel closed");
        assert_eq!(event.payload["seatId"], "7B");
    }

    #[tokio::test]
    async fn bus_instances_are_isolated() {
        let bus_a = EventBus::in_process("a");
        let bus_b = EventBus::in_process("b");
        let (tx, mut rx) = mpsc::channel(1);
        bus_a
            .subscribe("seat.released", forwarding_handler(tx))
            .await
            .unwrap();

        bus_b.publish("seat.released", json!({"seatId": "1A"})).await;

        assert!(
            timeout(Duration::from_millis(200), rx.recv()).await.is_err(),
            "handler on bus A received an event published on bus B"
        );
    }

    #[tokio::test]
    async fn unsubscribed_channel_is_ignored() {
        let bus = EventBus::in_process("test");
        let (tx, mut rx) = mpsc::channel(1);
        bus.subscribe("seat.released", forwarding_handler(tx))
            .await
            .unwrap();

        bus.publish("seat.confirmed", json!({"seatId": "2B"})).await;

        assert!(timeout(Duration::from_millis(200), rx.recv()).await.is_err());
    }
}
