//! Mapping between WebSocket frames and hub events.
//!
//! The hub is a pure relay: text and binary payloads pass through
//! unchanged, control frames never reach the fan-out path.

use axum::extract::ws::Message;

use crate::domain::BroadcastEvent;

/// Classification of one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A data frame to relay.
    Event(BroadcastEvent),
    /// Ping or pong; axum answers pings itself.
    Control,
    /// The peer asked to close.
    Close,
}

impl From<Message> for Inbound {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Self::Event(BroadcastEvent::Text(text)),
            Message::Binary(bytes) => Self::Event(BroadcastEvent::Binary(bytes)),
            Message::Ping(_) | Message::Pong(_) => Self::Control,
            Message::Close(_) => Self::Close,
        }
    }
}

impl From<BroadcastEvent> for Message {
    fn from(event: BroadcastEvent) -> Self {
        match event {
            BroadcastEvent::Text(text) => Self::Text(text),
            BroadcastEvent::Binary(bytes) => Self::Binary(bytes),
        }
    }
}
