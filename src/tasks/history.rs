//! Location-history sink.
//!
//! Every emitted position is appended to an NDJSON file by a dedicated
//! task. The session path only performs a bounded `try_send`; when the
//! queue is full or the file is unavailable, records are dropped with a
//! warning and the positioning pipeline keeps running.

use std::path::{Path, PathBuf};

use log::{error, warn};
use serde::Serialize;
use tokio::{io::AsyncWriteExt, task::JoinHandle};

/// One appended row of the history log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub session_id: String,
    pub x: f64,
    pub y: f64,
    pub zone_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_destination: Option<String>,
    pub timestamp: i64,
}

/// Cheap cloneable handle the sessions append through.
#[derive(Debug, Clone)]
pub struct HistoryLogger {
    tx: flume::Sender<HistoryRecord>,
}

impl HistoryLogger {
    pub fn append(&self, record: HistoryRecord) {
        if self.tx.try_send(record).is_err() {
            warn!("history queue saturated, dropping record");
        }
    }
}

pub fn history_writer_task(path: PathBuf, queue_size: usize) -> (HistoryLogger, JoinHandle<()>) {
    let (tx, rx) = flume::bounded::<HistoryRecord>(queue_size);

    let handle = tokio::spawn(async move {
        while let Ok(first) = rx.recv_async().await {
            // Drain whatever has queued up behind the first record so
            // bursts land in one write.
            let mut batch = vec![first];
            while batch.len() < 256 {
                match rx.try_recv() {
                    Ok(record) => batch.push(record),
                    Err(_) => break,
                }
            }
            flush(&path, &batch).await;
        }
    });

    (HistoryLogger { tx }, handle)
}

async fn flush(path: &Path, batch: &[HistoryRecord]) {
    let mut lines = String::new();
    for record in batch {
        match serde_json::to_string(record) {
            Ok(line) => {
                lines.push_str(&line);
                lines.push('\n');
            }
            Err(serialize_error) => {
                error!("serialize history record: {serialize_error}");
            }
        }
    }

    let open = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await;
    match open {
        Ok(mut file) => {
            if let Err(write_error) = file.write_all(lines.as_bytes()).await {
                error!("append history log: {write_error}");
            }
        }
        Err(open_error) => {
            error!("open history log {}: {open_error}", path.display());
        }
    }
}
