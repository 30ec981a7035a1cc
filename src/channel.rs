// SPDX-License-Identifier: MIT OR Apache-2.0

//! Duplex message connection used by the query session

use anyhow::{Context, Result};
use std::io;
use std::net::TcpStream;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use tungstenite::client::IntoClientRequest;
use tungstenite::http::{header, HeaderValue};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::config::ClientConfig;

/// Text-message connection to the search service
pub trait MessageChannel {
    fn send_text(&mut self, text: &str) -> Result<()>;

    /// Next text message, or `None` once the server has closed the connection
    fn recv_text(&mut self) -> Result<Option<String>>;

    fn close(&mut self) -> Result<()>;
}

impl<C: MessageChannel + ?Sized> MessageChannel for &mut C {
    fn send_text(&mut self, text: &str) -> Result<()> {
        (**self).send_text(text)
    }

    fn recv_text(&mut self) -> Result<Option<String>> {
        (**self).recv_text()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

fn is_closed(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
    )
}

/// Longest wait for the server's close frame
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Secure websocket to `ClientConfig::socket_url`
pub struct WebSocketChannel {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl WebSocketChannel {
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let url = config.socket_url();
        let mut request = url
            .as_str()
            .into_client_request()
            .with_context(|| format!("invalid session URL <{url}>"))?;
        request.headers_mut().insert(
            header::USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("invalid user agent")?,
        );

        let (socket, response) =
            tungstenite::connect(request).with_context(|| format!("failed to connect to <{url}>"))?;
        debug!(%url, status = %response.status(), "session connected");
        Ok(Self { socket })
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self.socket.get_ref() {
            MaybeTlsStream::Plain(stream) => stream.set_read_timeout(timeout),
            MaybeTlsStream::Rustls(stream) => stream.get_ref().set_read_timeout(timeout),
            _ => Ok(()),
        }
    }
}

impl MessageChannel for WebSocketChannel {
    fn send_text(&mut self, text: &str) -> Result<()> {
        trace!(text, "sending");
        self.socket
            .send(Message::Text(text.to_string()))
            .context("failed to send query")
    }

    fn recv_text(&mut self) -> Result<Option<String>> {
        loop {
            match self.socket.read() {
                Ok(Message::Text(text)) => return Ok(Some(text)),
                Ok(Message::Binary(data)) => {
                    return String::from_utf8(data)
                        .map(Some)
                        .context("binary session message is not UTF-8");
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "server closed the session");
                    return Ok(None);
                }
                Err(e) if is_closed(&e) => return Ok(None),
                Err(e) => return Err(e).context("failed to read session message"),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        match self.socket.close(None) {
            Ok(()) => {}
            Err(e) if is_closed(&e) => return Ok(()),
            Err(e) => return Err(e).context("failed to close session"),
        }
        // The close handshake completes once the server's close frame is read.
        if let Err(e) = self.set_read_timeout(Some(CLOSE_TIMEOUT)) {
            debug!(error = %e, "could not bound close wait");
        }
        let deadline = Instant::now() + CLOSE_TIMEOUT;
        while Instant::now() < deadline {
            match self.socket.read() {
                Ok(_) => continue,
                Err(e) if is_closed(&e) => break,
                Err(e) => {
                    debug!(error = %e, "error while closing session");
                    break;
                }
            }
        }
        debug!("session closed");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted server messages and records what the client sent
    #[derive(Default)]
    pub struct ScriptedChannel {
        pub incoming: VecDeque<String>,
        pub sent: Vec<String>,
        pub closed: bool,
    }

    impl ScriptedChannel {
        pub fn new(messages: &[&str]) -> Self {
            Self {
                incoming: messages.iter().map(|m| m.to_string()).collect(),
                ..Self::default()
            }
        }
    }

    impl MessageChannel for ScriptedChannel {
        fn send_text(&mut self, text: &str) -> Result<()> {
            anyhow::ensure!(!self.closed, "send on closed channel");
            self.sent.push(text.to_string());
            Ok(())
        }

        fn recv_text(&mut self) -> Result<Option<String>> {
            if self.closed {
                return Ok(None);
            }
            Ok(self.incoming.pop_front())
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }
}
