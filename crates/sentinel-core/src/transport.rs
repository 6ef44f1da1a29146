//! Host frame transport seam
//!
//! Presence of a host frame is asked at every send point through
//! [`deliver`]; there is no cached "enabled" flag.

use crate::error::TransportError;
use crate::message::HostMessage;
use std::sync::Arc;

/// Channel to the supervising host frame
pub trait Transport: Send + Sync {
    /// Whether a parent frame exists right now
    fn has_host(&self) -> bool;

    /// Post `message` to the parent frame
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the message could not be handed over.
    fn post(&self, message: &HostMessage) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn has_host(&self) -> bool {
        (**self).has_host()
    }

    fn post(&self, message: &HostMessage) -> Result<(), TransportError> {
        (**self).post(message)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn has_host(&self) -> bool {
        (**self).has_host()
    }

    fn post(&self, message: &HostMessage) -> Result<(), TransportError> {
        (**self).post(message)
    }
}

/// Outcome of one delivery attempt
#[derive(Debug)]
pub enum Delivery {
    /// Message handed to the host
    Sent,
    /// Top-level context; nothing was sent
    NoHost,
    /// Host present but the send failed
    Failed(TransportError),
}

impl Delivery {
    /// Whether the host received the message
    #[inline]
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Send `message` if a host frame exists
pub fn deliver<T: Transport + ?Sized>(transport: &T, message: &HostMessage) -> Delivery {
    if !transport.has_host() {
        return Delivery::NoHost;
    }
    match transport.post(message) {
        Ok(()) => Delivery::Sent,
        Err(e) => Delivery::Failed(e),
    }
}
