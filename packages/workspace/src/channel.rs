//! Server channel
//!
//! A multiplexed event channel between the index server and connected
//! browsers. Delivery is at-most-once: subscribers that fall behind are
//! resynchronised with the last index snapshot instead of the missed deltas.

use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use storyloom_index::StoryIndex;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

pub const STORY_INDEX_INVALIDATED: &str = "storyIndexInvalidated";
pub const SET_INDEX: &str = "setIndex";
pub const OPEN_IN_EDITOR_REQUEST: &str = "openInEditorRequest";
pub const OPEN_IN_EDITOR_RESPONSE: &str = "openInEditorResponse";

/// Payload field carrying the correlation id of a request
pub const REQUEST_ID_FIELD: &str = "id";

const CHANNEL_CAPACITY: usize = 256;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("no {event_type} response within {after_ms}ms")]
    Timeout { event_type: String, after_ms: u64 },

    #[error("request payload for {event_type} must be an object")]
    InvalidPayload { event_type: String },

    #[error("channel closed")]
    Closed,
}

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Wire envelope for every channel message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl ChannelEvent {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            from: None,
        }
    }

    pub fn from_sender(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Whether every named payload field equals the one in `other`
    pub fn matches_fields(&self, other: &ChannelEvent, fields: &[&str]) -> bool {
        fields
            .iter()
            .all(|field| self.payload.get(field) == other.payload.get(field))
    }
}

type Listener = Arc<dyn Fn(&ServerChannel, &ChannelEvent) + Send + Sync>;

struct ChannelInner {
    sender: broadcast::Sender<ChannelEvent>,
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
    last_index: RwLock<Option<ChannelEvent>>,
    next_request: AtomicU64,
}

/// Cheaply cloneable handle; clones share listeners and subscribers
#[derive(Clone)]
pub struct ServerChannel {
    inner: Arc<ChannelInner>,
}

impl Default for ServerChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ChannelInner {
                sender,
                listeners: RwLock::new(HashMap::new()),
                last_index: RwLock::new(None),
                next_request: AtomicU64::new(1),
            }),
        }
    }

    /// Send an event to every connected subscriber
    pub fn emit(&self, event: ChannelEvent) {
        tracing::debug!(event = %event.event_type, "channel emit");
        // No subscribers is fine, delivery is at-most-once
        let _ = self.inner.sender.send(event);
    }

    /// Register a handler for events of `event_type` sent by clients
    pub fn on<F>(&self, event_type: impl Into<String>, listener: F)
    where
        F: Fn(&ServerChannel, &ChannelEvent) + Send + Sync + 'static,
    {
        let mut listeners = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners
            .entry(event_type.into())
            .or_default()
            .push(Arc::new(listener));
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Handle an event sent by a client: run listeners, then fan it out to
    /// the other subscribers
    pub fn receive(&self, event: ChannelEvent) {
        tracing::debug!(event = %event.event_type, from = ?event.from, "channel receive");

        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        for listener in listeners {
            listener(self, &event);
        }

        self.emit(event);
    }

    /// Publish a full index snapshot; it is replayed to every new connection
    pub fn set_index(&self, index: &StoryIndex) {
        let payload = match serde_json::to_value(index) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(%error, "failed to serialize story index");
                return;
            }
        };

        let event = ChannelEvent::new(SET_INDEX, payload);
        *self
            .inner
            .last_index
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(event.clone());
        self.emit(event);
    }

    pub fn invalidate_index(&self) {
        self.emit(ChannelEvent::new(STORY_INDEX_INVALIDATED, Value::Null));
    }

    pub fn last_index(&self) -> Option<ChannelEvent> {
        self.inner
            .last_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Open a subscription. The first event is the last index snapshot, when
    /// one has been published.
    pub fn connect(&self) -> ChannelConnection {
        // Subscribe before reading the snapshot so nothing published in
        // between is lost
        let receiver = self.inner.sender.subscribe();
        ChannelConnection {
            initial: self.last_index(),
            receiver,
            channel: self.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }

    fn next_request_id(&self) -> String {
        let counter = self.inner.next_request.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", chrono::Utc::now().timestamp_millis(), counter)
    }

    /// Emit `event` with a fresh correlation id and wait for a
    /// `response_type` event echoing it
    pub async fn request(
        &self,
        event: ChannelEvent,
        response_type: &str,
        timeout: Duration,
    ) -> ChannelResult<ChannelEvent> {
        self.request_matching(event, response_type, timeout, &[REQUEST_ID_FIELD])
            .await
    }

    /// Like [`request`](Self::request), matching the response on every field
    /// in `fields` instead of the id alone
    pub async fn request_matching(
        &self,
        mut event: ChannelEvent,
        response_type: &str,
        timeout: Duration,
        fields: &[&str],
    ) -> ChannelResult<ChannelEvent> {
        let event_type = event.event_type.clone();
        if event.payload.is_null() {
            event.payload = Value::Object(Map::new());
        }
        let Some(payload) = event.payload.as_object_mut() else {
            return Err(ChannelError::InvalidPayload { event_type });
        };
        if !payload.contains_key(REQUEST_ID_FIELD) {
            payload.insert(REQUEST_ID_FIELD.to_string(), Value::String(self.next_request_id()));
        }

        let request = event.clone();
        let mut receiver = self.inner.sender.subscribe();
        self.emit(event);

        let wait = async {
            loop {
                match receiver.recv().await {
                    Ok(response)
                        if response.event_type == response_type
                            && response.matches_fields(&request, fields) =>
                    {
                        return Ok(response);
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, event = %event_type, "request lagged behind channel");
                    }
                    Err(RecvError::Closed) => return Err(ChannelError::Closed),
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(event = %event_type, response = response_type, "channel request timed out");
                Err(ChannelError::Timeout {
                    event_type,
                    after_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

/// One subscriber; dropping it unsubscribes
pub struct ChannelConnection {
    initial: Option<ChannelEvent>,
    receiver: broadcast::Receiver<ChannelEvent>,
    channel: ServerChannel,
}

impl ChannelConnection {
    /// Next event for this subscriber, or `None` once the channel is gone
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "channel subscriber lagged, replaying index");
                    if let Some(snapshot) = self.channel.last_index() {
                        return Some(snapshot);
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = ChannelEvent> + Send + 'static {
        let channel = self.channel;
        let updates = BroadcastStream::new(self.receiver).filter_map(move |result| {
            let replay = match &result {
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "channel subscriber lagged, replaying index");
                    channel.last_index()
                }
                _ => None,
            };
            async move { result.ok().or(replay) }
        });

        stream::iter(self.initial).chain(updates)
    }
}
