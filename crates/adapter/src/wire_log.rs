//! Append-only log of every payload on the wire, one JSON object per line.
//!
//! ```text
//! {"ts":1718000000123,"dir":"out","peer":"10.0.0.2:16474","bytes":[0,0,1,1,-2],"flag":"end_turn","moves":1,"taunt":null}
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::warn;

use crate::core::decode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireRecord {
    pub ts: u64,
    pub dir: Direction,
    pub peer: Option<String>,
    /// Raw payload, as the signed bytes the protocol is written in.
    pub bytes: Vec<i8>,
    pub flag: Option<&'static str>,
    pub moves: usize,
    pub taunt: Option<String>,
}

impl WireRecord {
    pub fn new(dir: Direction, peer: Option<String>, payload: &[u8]) -> Self {
        let decoded = decode(payload).ok();
        Self {
            ts: now_millis(),
            dir,
            peer,
            bytes: payload.iter().map(|&b| b as i8).collect(),
            flag: decoded.as_ref().map(|m| m.flag.as_str()),
            moves: decoded.as_ref().map(|m| m.moves.len()).unwrap_or(0),
            taunt: decoded.and_then(|m| m.taunt),
        }
    }
}

/// Handle to the background writer. Cloning shares the same file.
#[derive(Debug, Clone)]
pub struct WireLog {
    tx: mpsc::UnboundedSender<WireRecord>,
}

impl WireLog {
    /// Spawn the writer task on the current runtime, appending to `path`.
    pub fn spawn(path: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WireRecord>();
        tokio::spawn(async move {
            let mut file = match OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
            {
                Ok(f) => f,
                Err(err) => {
                    warn!(path = %path, error = %err, "wire log disabled");
                    return;
                }
            };

            let mut buf: Vec<u8> = Vec::with_capacity(512);
            while let Some(rec) = rx.recv().await {
                buf.clear();
                if serde_json::to_writer(&mut buf, &rec).is_err() {
                    continue;
                }
                buf.push(b'\n');
                if file.write_all(&buf).await.is_err() {
                    break;
                }
                let _ = file.flush().await;
            }
        });
        Self { tx }
    }

    pub fn record(&self, dir: Direction, peer: Option<String>, payload: &[u8]) {
        let _ = self.tx.send(WireRecord::new(dir, peer, payload));
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
