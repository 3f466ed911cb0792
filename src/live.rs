//! Live activity stream over chained long polls.

use crate::client::Client;
use crate::error::Error;
use crate::transport::RequestSpec;
use crate::types::{ApiError, Cursor, Reply};
use futures::Stream;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Path of the long-poll endpoint.
pub const LIVE_PATH: &str = "api/live.json";

/// One message from the live endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveMessage {
    id: Option<Cursor>,
    body: Value,
}

impl LiveMessage {
    pub fn new(body: Value) -> Self {
        let id = body.get("_id").and_then(Cursor::from_id);
        Self { id, body }
    }

    /// The message `_id`, if the server sent one.
    pub fn id(&self) -> Option<&Cursor> {
        self.id.as_ref()
    }

    /// The message `kind` (`message`, `login`, `topic`, ...).
    pub fn kind(&self) -> Option<&str> {
        self.body.get("kind").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

/// Messages returned by one long poll, in arrival order.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct LiveBatch {
    pub messages: Vec<LiveMessage>,
    /// Cursor the next poll resumes from.
    pub cursor: Option<Cursor>,
}

impl LiveBatch {
    /// Pull `messages` out of a live response body.
    ///
    /// The server sends either an array or an object keyed by id; both are
    /// read in the order they arrived. Anything else is an empty batch.
    pub fn messages_from_body(body: Value) -> Vec<LiveMessage> {
        let messages = match body {
            Value::Object(mut map) => map.remove("messages"),
            other => {
                warn!(body = %other, "live response is not a JSON object");
                None
            }
        };

        match messages {
            Some(Value::Array(items)) => items.into_iter().map(LiveMessage::new).collect(),
            Some(Value::Object(items)) => items.into_iter().map(|(_, m)| LiveMessage::new(m)).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Cursor to resume from after `messages` were delivered.
///
/// This is the id of the last message that has one; a batch without ids
/// keeps the previous cursor.
pub fn advance_cursor(cursor: Option<Cursor>, messages: &[LiveMessage]) -> Option<Cursor> {
    messages
        .iter()
        .rev()
        .find_map(|m| m.id().cloned())
        .or(cursor)
}

/// What a live handler receives.
#[derive(Clone, Debug, PartialEq)]
pub enum LiveEvent {
    Message(LiveMessage),
    /// Credentials were rejected; the stream ends after this event.
    Unauthorized(ApiError),
}

/// Why [`LiveStream::run`] returned without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveEnd {
    Cancelled,
    Unauthorized,
}

/// Builder for configuring a live stream.
#[derive(Debug)]
#[must_use = "builders do nothing unless you call .build()"]
pub struct LiveBuilder {
    client: Client,
    cursor: Option<Cursor>,
    poll_timeout: Option<Duration>,
    token: Option<CancellationToken>,
}

impl LiveBuilder {
    pub(crate) fn new(client: Client) -> Self {
        let poll_timeout = client.poll_timeout;
        Self {
            client,
            cursor: None,
            poll_timeout,
            token: None,
        }
    }

    /// Resume after the message with this id.
    pub fn cursor(mut self, cursor: impl Into<Cursor>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Set the client-side timeout for each long poll.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Stop the stream when this token is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Build the LiveStream.
    ///
    /// No network request is made until the stream is polled.
    pub fn build(self) -> LiveStream {
        LiveStream {
            client: self.client,
            cursor: self.cursor,
            poll_timeout: self.poll_timeout,
            token: self.token.unwrap_or_default(),
            done: false,
        }
    }
}

/// A resumable sequence of live messages.
///
/// One stream per handle; the cursor it tracks is not shared.
#[derive(Debug)]
pub struct LiveStream {
    client: Client,
    cursor: Option<Cursor>,
    poll_timeout: Option<Duration>,
    token: CancellationToken,
    done: bool,
}

impl LiveStream {
    /// Id of the last message delivered, used by the next poll.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.done || self.token.is_cancelled()
    }

    /// Stop the stream; an in-flight poll is abandoned.
    pub fn close(&mut self) {
        self.token.cancel();
    }

    fn request(&self) -> RequestSpec {
        let mut request = RequestSpec::get(LIVE_PATH);
        if let Some(cursor) = &self.cursor {
            request = request.query("cursor", cursor.as_str());
        }
        if let Some(timeout) = self.poll_timeout {
            request = request.timeout(timeout);
        }
        request
    }

    /// Run one long poll.
    ///
    /// Returns `Ok(None)` once the stream is cancelled or finished. An empty
    /// batch means nothing new arrived before the poll returned.
    pub async fn next_batch(&mut self) -> Result<Option<LiveBatch>, Error> {
        if self.is_closed() {
            return Ok(None);
        }

        let request = self.request();
        debug!(cursor = ?self.cursor, "polling live stream");

        let reply = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!("live stream cancelled during poll");
                return Ok(None);
            }
            reply = self.client.send(&request) => reply,
        };

        match reply {
            Ok(Reply::Success(body)) => {
                let messages = LiveBatch::messages_from_body(body);
                self.cursor = advance_cursor(self.cursor.take(), &messages);
                if !messages.is_empty() {
                    debug!(count = messages.len(), cursor = ?self.cursor, "live batch");
                }
                Ok(Some(LiveBatch {
                    messages,
                    cursor: self.cursor.clone(),
                }))
            }
            Ok(Reply::Unauthorized(err)) => {
                warn!("live stream unauthorized");
                self.done = true;
                Err(Error::Unauthorized(err))
            }
            // Timeout in long-poll means nothing new yet
            Err(Error::Timeout) => {
                debug!(cursor = ?self.cursor, "live poll timed out");
                Ok(Some(LiveBatch {
                    messages: Vec::new(),
                    cursor: self.cursor.clone(),
                }))
            }
            Err(err) => {
                self.done = true;
                Err(err)
            }
        }
    }

    /// Deliver every message to `handler` until the stream ends.
    ///
    /// A batch that has been received is always delivered in full, even if
    /// the token is cancelled partway through it. A 401 is handed to the
    /// handler once before returning.
    pub async fn run<F>(&mut self, mut handler: F) -> Result<LiveEnd, Error>
    where
        F: FnMut(LiveEvent),
    {
        info!(cursor = ?self.cursor, "starting live stream");
        loop {
            match self.next_batch().await {
                Ok(Some(batch)) => {
                    for message in batch.messages {
                        handler(LiveEvent::Message(message));
                    }
                }
                Ok(None) => {
                    info!(cursor = ?self.cursor, "live stream stopped");
                    return Ok(LiveEnd::Cancelled);
                }
                Err(Error::Unauthorized(err)) => {
                    handler(LiveEvent::Unauthorized(err));
                    return Ok(LiveEnd::Unauthorized);
                }
                Err(err) => {
                    warn!(error = %err, "live stream failed");
                    return Err(err);
                }
            }
        }
    }

    /// Adapt the stream into a `futures::Stream` of events.
    ///
    /// The stream yields a final `Unauthorized` event or error and then
    /// ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<LiveEvent, Error>> {
        futures::stream::unfold(
            (self, VecDeque::new()),
            |(mut live, mut pending)| async move {
                loop {
                    if let Some(message) = pending.pop_front() {
                        return Some((Ok(LiveEvent::Message(message)), (live, pending)));
                    }
                    match live.next_batch().await {
                        Ok(Some(batch)) => pending.extend(batch.messages),
                        Ok(None) => return None,
                        Err(Error::Unauthorized(err)) => {
                            return Some((Ok(LiveEvent::Unauthorized(err)), (live, pending)));
                        }
                        Err(err) => return Some((Err(err), (live, pending))),
                    }
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(ids: &[&str]) -> Vec<LiveMessage> {
        ids.iter()
            .map(|id| LiveMessage::new(json!({"_id": id, "kind": "message"})))
            .collect()
    }

    #[test]
    fn test_cursor_is_last_id() {
        let next = advance_cursor(None, &batch(&["5", "9"]));
        assert_eq!(next, Some(Cursor::new("9")));
    }

    #[test]
    fn test_empty_batch_keeps_cursor() {
        assert_eq!(advance_cursor(None, &[]), None);
        assert_eq!(
            advance_cursor(Some(Cursor::new("4")), &[]),
            Some(Cursor::new("4"))
        );
    }

    #[test]
    fn test_messages_without_id_do_not_move_cursor() {
        let mut messages = batch(&["7"]);
        messages.push(LiveMessage::new(json!({"kind": "login"})));
        assert_eq!(advance_cursor(Some(Cursor::new("3")), &messages), Some(Cursor::new("7")));
    }

    #[test]
    fn test_three_batches_in_order() {
        let mut cursor = None;
        let mut seen = Vec::new();
        for ids in [&["1"][..], &[][..], &["2", "3"][..]] {
            let messages = batch(ids);
            seen.extend(messages.iter().filter_map(|m| m.id().cloned()));
            cursor = advance_cursor(cursor, &messages);
        }
        let seen: Vec<_> = seen.iter().map(Cursor::as_str).collect();
        assert_eq!(seen, ["1", "2", "3"]);
        assert_eq!(cursor, Some(Cursor::new("3")));
    }

    #[test]
    fn test_messages_from_array_body() {
        let body = json!({"messages": [{"_id": "5"}, {"_id": "9"}]});
        let messages = LiveBatch::messages_from_body(body);
        let ids: Vec<_> = messages.iter().filter_map(|m| m.id()).map(Cursor::as_str).collect();
        assert_eq!(ids, ["5", "9"]);
    }

    #[test]
    fn test_messages_from_object_body_keep_arrival_order() {
        let body: Value =
            serde_json::from_str(r#"{"messages": {"b": {"_id": 20}, "a": {"_id": 10}}}"#).unwrap();
        let messages = LiveBatch::messages_from_body(body);
        let ids: Vec<_> = messages.iter().filter_map(|m| m.id()).map(Cursor::as_str).collect();
        assert_eq!(ids, ["20", "10"]);
    }

    #[test]
    fn test_unexpected_bodies_are_empty_batches() {
        assert!(LiveBatch::messages_from_body(json!("not-json")).is_empty());
        assert!(LiveBatch::messages_from_body(json!({})).is_empty());
        assert!(LiveBatch::messages_from_body(json!({"messages": null})).is_empty());
    }

    #[test]
    fn test_live_message_accessors() {
        let message = LiveMessage::new(json!({"_id": "12", "kind": "message", "message": "hi"}));
        assert_eq!(message.id(), Some(&Cursor::new("12")));
        assert_eq!(message.kind(), Some("message"));
        assert_eq!(message.get("message"), Some(&json!("hi")));
    }

    #[test]
    fn test_request_carries_cursor_only_when_set() {
        let client = Client::new("alice", "s3cret");

        let live = client.live().build();
        assert!(live.request().query.is_empty());

        let live = client.live().cursor("9").build();
        assert_eq!(
            live.request().query,
            vec![("cursor".to_string(), "9".to_string())]
        );
    }

    #[tokio::test]
    async fn test_cancelled_stream_yields_nothing() {
        let client = Client::new("alice", "s3cret");
        let token = CancellationToken::new();
        let mut live = client.live().cancellation(token.clone()).build();

        token.cancel();
        assert!(live.is_closed());
        assert!(matches!(live.next_batch().await, Ok(None)));
    }
}
