//! The unit of fan-out: one relayed WebSocket frame.
//!
//! A [`BroadcastEvent`] exists only while the hub delivers it. The hub never
//! looks inside the payload; text frames stay text and binary frames stay
//! binary on the way out.

use axum::body::Bytes;
use axum::extract::ws::Utf8Bytes;
use serde::Serialize;

/// Framing of a relayed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// UTF-8 text frame.
    Text,
    /// Opaque binary frame.
    Binary,
}

/// Immutable `(kind, payload)` pair handed to [`crate::hub::Hub::broadcast`].
///
/// Both payload types are reference counted, so cloning an event per
/// recipient does not copy the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastEvent {
    /// Text payload.
    Text(Utf8Bytes),
    /// Binary payload.
    Binary(Bytes),
}

impl BroadcastEvent {
    /// Builds a text event.
    #[must_use]
    pub fn text(payload: impl Into<Utf8Bytes>) -> Self {
        Self::Text(payload.into())
    }

    /// Builds a binary event.
    #[must_use]
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::Binary(payload.into())
    }

    /// Returns the framing of this event.
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        match self {
            Self::Text(_) => FrameKind::Text,
            Self::Binary(_) => FrameKind::Binary,
        }
    }

    /// Returns the raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_str().as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload().len()
    }

    /// Returns `true` for an empty payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }
}
