//! tokio-tungstenite transport

use std::borrow::Cow;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{Connector, Frame, GatewayTransport, TransportError, NO_STATUS_CODE};

/// Opens TLS WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayTransport>, TransportError> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(url = %url, "WebSocket connection established");

        Ok(Box::new(TungsteniteTransport { stream }))
    }
}

/// A tokio-tungstenite WebSocket stream
pub struct TungsteniteTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl GatewayTransport for TungsteniteTransport {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        match frame {
            Frame::Text(text) => self
                .stream
                .send(Message::Text(text))
                .await
                .map_err(|e| TransportError::Send(e.to_string())),
            Frame::Close { code, reason } => {
                let frame = CloseFrame {
                    code: WsCloseCode::from(code),
                    reason: Cow::Owned(reason),
                };
                self.stream
                    .close(Some(frame))
                    .await
                    .map_err(|e| TransportError::Send(e.to_string()))
            }
        }
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            };

            match message {
                Message::Text(text) => return Some(Ok(Frame::Text(text))),
                Message::Binary(bytes) => {
                    return Some(
                        String::from_utf8(bytes)
                            .map(Frame::Text)
                            .map_err(|e| TransportError::Receive(e.to_string())),
                    );
                }
                Message::Close(close) => {
                    let (code, reason) = close.map_or((NO_STATUS_CODE, String::new()), |f| {
                        (u16::from(f.code), f.reason.into_owned())
                    });
                    return Some(Ok(Frame::Close { code, reason }));
                }
                // Pings are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}
