//! Concrete transports
//!
//! - [`NoHost`]: top-level context, every send point is a no-op
//! - [`ChannelTransport`]: in-process host fed through a tokio channel
//! - [`JsonLinesTransport`]: one JSON message per line on a writer

use parking_lot::Mutex;
use sentinel_core::{HostMessage, Transport, TransportError};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Transport for a page that is not embedded in a host frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

impl Transport for NoHost {
    fn has_host(&self) -> bool {
        false
    }

    fn post(&self, _message: &HostMessage) -> Result<(), TransportError> {
        Err(TransportError::HostDetached)
    }
}

/// Transport delivering into an unbounded tokio channel
///
/// The host counts as present while the transport is attached and the
/// receiver is alive.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<HostMessage>,
    attached: AtomicBool,
}

impl ChannelTransport {
    /// Create an attached transport and the host-side receiver
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            tx,
            attached: AtomicBool::new(true),
        };
        (transport, rx)
    }

    /// Simulate the page being taken out of its frame
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    /// Re-embed the page
    pub fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
    }
}

impl Transport for ChannelTransport {
    fn has_host(&self) -> bool {
        self.attached.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    fn post(&self, message: &HostMessage) -> Result<(), TransportError> {
        self.tx
            .send(message.clone())
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Transport writing each message as a JSON line
#[derive(Debug)]
pub struct JsonLinesTransport<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesTransport<W> {
    /// Wrap `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Transport for JsonLinesTransport<W> {
    fn has_host(&self) -> bool {
        true
    }

    fn post(&self, message: &HostMessage) -> Result<(), TransportError> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, message)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sentinel_core::{deliver, Delivery};

    #[test]
    fn no_host_never_sends() {
        assert!(matches!(
            deliver(&NoHost, &HostMessage::copy_error("x")),
            Delivery::NoHost
        ));
    }

    #[tokio::test]
    async fn channel_delivers_while_attached() {
        let (transport, mut rx) = ChannelTransport::new();
        assert!(deliver(&transport, &HostMessage::copy_error("first")).is_sent());

        transport.detach();
        assert!(matches!(
            deliver(&transport, &HostMessage::copy_error("dropped")),
            Delivery::NoHost
        ));
        transport.attach();
        assert!(deliver(&transport, &HostMessage::invalid_token("second")).is_sent());

        assert_eq!(rx.recv().await, Some(HostMessage::copy_error("first")));
        assert_eq!(rx.recv().await, Some(HostMessage::invalid_token("second")));
    }

    #[test]
    fn closed_receiver_means_no_host() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        assert!(!transport.has_host());
        assert!(matches!(
            transport.post(&HostMessage::copy_error("x")),
            Err(TransportError::ChannelClosed)
        ));
    }

    #[test]
    fn json_lines_one_message_per_line() {
        let transport = JsonLinesTransport::new(Vec::new());
        transport.post(&HostMessage::copy_error("a")).unwrap();
        transport.post(&HostMessage::invalid_token("b")).unwrap();

        let out = String::from_utf8(transport.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"type":"copy-error","text":"a"}"#,
                r#"{"type":"invalid-token","code":"INVALID_TOKEN","text":"b"}"#,
            ]
        );
    }
}
