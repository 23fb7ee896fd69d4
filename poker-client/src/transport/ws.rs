use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::unbounded_channel;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use poker_types::{Identity, ServerEvent};

use super::{Connector, ConnectorChannel, TransportError};

/// WebSocket connector speaking the JSON event envelope.
///
/// Identity rides in the handshake query string; the backend keys the
/// connection off the anonymous id. Frames the session cannot decode
/// are logged and skipped so a newer backend never kills the stream.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: String) -> Self {
        Self { url }
    }

    fn handshake_url(&self, identity: &Identity) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}name={}&anonymousId={}",
            self.url,
            separator,
            percent_encode(&identity.name),
            percent_encode(&identity.anonymous_id),
        )
    }
}

fn percent_encode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, identity: &Identity) -> Result<ConnectorChannel, TransportError> {
        let url = self.handshake_url(identity);
        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        let (mut write, mut read) = stream.split();

        let (out_tx, mut out_rx) = unbounded_channel();
        let (in_tx, in_rx) = unbounded_channel();

        tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "dropping unserializable client event");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    warn!(error = %e, "websocket write failed");
                    break;
                }
            }
            let _ = write.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if in_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!(error = %e, "ignoring undecodable frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "websocket read failed");
                        break;
                    }
                }
            }
            // in_tx drops here; the session sees the stream end.
        });

        Ok(ConnectorChannel {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
