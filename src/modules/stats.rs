use crate::modules::error::ConsoleError;
use derive_more::with_trait::Display;
use futures_util::StreamExt;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::mpsc::Sender;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const STATS_PATH: &str = "/ws/stats";

/// Frames queued ahead of the session. When full, the socket is not read
/// until the session catches up.
pub const STATS_BACKLOG: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{key}\t{value}")]
pub struct StatsRow {
    pub key: String,
    pub value: String,
}

/// One pushed frame: message-type key to rendered value, in the order the
/// keys appear in the frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub rows: Vec<StatsRow>,
}

impl StatsSnapshot {
    pub fn decode(text: &str) -> Result<Self, ConsoleError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(map) = value else {
            return Err(ConsoleError::malformed("stats frame is not a JSON object"));
        };
        let rows = map
            .into_iter()
            .map(|(key, value)| StatsRow {
                key,
                value: render_value(value),
            })
            .collect();
        Ok(Self { rows })
    }
}

fn render_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Rendered stats table body. Each snapshot replaces the previous one whole.
#[derive(Debug, Clone, Default)]
pub struct StatsTable {
    rows: Vec<StatsRow>,
    generation: u64,
}

impl StatsTable {
    pub fn render(&mut self, snapshot: StatsSnapshot) {
        self.rows = snapshot.rows;
        self.generation += 1;
    }

    pub fn rows(&self) -> &[StatsRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&StatsRow> {
        self.rows.get(index)
    }

    /// Number of snapshots rendered so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Display for StatsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.rows.iter().map(|r| r.key.len()).max().unwrap_or(0);
        for row in &self.rows {
            writeln!(f, "{:<width$}  {}", row.key, row.value)?;
        }
        Ok(())
    }
}

/// Socket address for the stats feed, derived from the page origin:
/// `wss` when the page was served over `https`, `ws` otherwise.
pub fn stats_url(page: &Url) -> Result<Url, ConsoleError> {
    let scheme = if page.scheme() == "https" { "wss" } else { "ws" };
    let host = page
        .host_str()
        .ok_or_else(|| ConsoleError::fatal(format!("page url {page} has no host")))?;
    let authority = match page.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Url::parse(&format!("{scheme}://{authority}{STATS_PATH}"))
        .map_err(|e| ConsoleError::fatal(format!("invalid stats url: {e}")))
}

#[derive(Debug)]
pub enum StatsEvent {
    Snapshot(StatsSnapshot),
    Failed(ConsoleError),
    Closed,
}

/// Subscribes to the stats feed and forwards each decoded frame in arrival
/// order. Returns when the socket closes, the receiver is dropped or the
/// token is cancelled. No reconnection is attempted.
pub async fn stream_stats(url: Url, token: CancellationToken, events: Sender<StatsEvent>) {
    let connect = tokio::select! {
        _ = token.cancelled() => return,
        c = tokio_tungstenite::connect_async(url.as_str()) => c,
    };
    let mut socket = match connect {
        Ok((socket, _)) => socket,
        Err(e) => {
            warn!("Stats socket {url} failed to open: {e}");
            let _ = forward(&token, &events, StatsEvent::Failed(e.into())).await;
            return;
        }
    };
    info!("Stats socket open: {url}");

    loop {
        let frame = tokio::select! {
            _ = token.cancelled() => {
                debug!("Closing stats socket");
                let _ = socket.close(None).await;
                return;
            }
            frame = socket.next() => frame,
        };

        let event = match frame {
            Some(Ok(Message::Text(text))) => match StatsSnapshot::decode(&text) {
                Ok(snapshot) => StatsEvent::Snapshot(snapshot),
                Err(e) => {
                    warn!("Dropping stats frame: {e}");
                    StatsEvent::Failed(e)
                }
            },
            Some(Ok(Message::Close(_))) | None => {
                info!("Stats socket closed by gateway");
                let _ = forward(&token, &events, StatsEvent::Closed).await;
                return;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!("Stats socket error: {e}");
                if forward(&token, &events, StatsEvent::Failed(e.into())).await {
                    let _ = forward(&token, &events, StatsEvent::Closed).await;
                }
                return;
            }
        };

        if !forward(&token, &events, event).await {
            let _ = socket.close(None).await;
            return;
        }
    }
}

/// Waits for room in the backlog. `false` once the session is gone or
/// shutting down.
async fn forward(token: &CancellationToken, events: &Sender<StatsEvent>, event: StatsEvent) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_keeps_frame_key_order() {
        let snap = StatsSnapshot::decode(r#"{"127250":"180","126992":"12:00","60928":3}"#).unwrap();
        let keys: Vec<_> = snap.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["127250", "126992", "60928"]);
        assert_eq!(snap.rows[2].value, "3");
    }

    #[test]
    fn decode_rejects_non_objects() {
        assert!(matches!(
            StatsSnapshot::decode("[1,2]"),
            Err(ConsoleError::Malformed { .. })
        ));
        assert!(matches!(
            StatsSnapshot::decode("{not json"),
            Err(ConsoleError::Malformed { .. })
        ));
    }

    #[test]
    fn each_snapshot_replaces_the_table() {
        let mut table = StatsTable::default();
        table.render(StatsSnapshot::decode(r#"{"126992":"12:00"}"#).unwrap());
        table.render(StatsSnapshot::decode(r#"{"127250":"180"}"#).unwrap());
        assert_eq!(
            table.rows(),
            &[StatsRow {
                key: "127250".into(),
                value: "180".into()
            }]
        );
        assert!(table.rows().iter().all(|r| r.key != "126992"));
        assert_eq!(table.generation(), 2);
    }

    #[test]
    fn empty_snapshot_clears_the_table() {
        let mut table = StatsTable::default();
        table.render(StatsSnapshot::decode(r#"{"126992":"12:00"}"#).unwrap());
        table.render(StatsSnapshot::decode("{}").unwrap());
        assert!(table.rows().is_empty());
    }

    #[test]
    fn stats_url_follows_page_transport() {
        let plain = stats_url(&Url::parse("http://boat.local:8080/admin").unwrap()).unwrap();
        assert_eq!(plain.as_str(), "ws://boat.local:8080/ws/stats");

        let secure = stats_url(&Url::parse("https://boat.local/").unwrap()).unwrap();
        assert_eq!(secure.as_str(), "wss://boat.local/ws/stats");
    }

    #[test]
    fn stats_url_requires_a_host() {
        let page = Url::parse("file:///tmp/index.html").unwrap();
        assert!(matches!(stats_url(&page), Err(ConsoleError::Fatal { .. })));
    }
}
