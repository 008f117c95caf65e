//! Event log writer (spec §4.3, component C6).
//!
//! Subscribes to the store's write-event signal and appends one framed
//! record per event to the current output file, rotating to a new
//! `forum-<unix-ts>.events` file every `createNewOutputFileEverySeconds`
//! of wall time. Rotation is checked lazily, on the next write. The writer
//! never fsyncs per record and never fails a command: a write failure is
//! logged and the in-memory state still advances (spec §4.3, §7).

use super::events::{EventContext, WriteEvent};
use super::format::encode_record;
use crate::clock::Timestamp;
use crate::id::RawIp;
use crate::store::{EventObserver, ObserverContext};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

struct WriterState {
    file: Option<File>,
    file_started_at: Timestamp,
}

pub struct EventLogWriter {
    output_folder: PathBuf,
    rotate_every_seconds: i64,
    state: Mutex<WriterState>,
}

impl EventLogWriter {
    pub fn new(output_folder: PathBuf, rotate_every_seconds: i64) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&output_folder)?;
        Ok(EventLogWriter {
            output_folder,
            rotate_every_seconds,
            state: Mutex::new(WriterState { file: None, file_started_at: 0 }),
        })
    }

    fn ensure_file(&self, state: &mut WriterState, now: Timestamp) -> std::io::Result<()> {
        let needs_rotation = state.file.is_none() || now - state.file_started_at >= self.rotate_every_seconds;
        if needs_rotation {
            let path = self.output_folder.join(format!("forum-{now}.events"));
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            state.file = Some(file);
            state.file_started_at = now;
        }
        Ok(())
    }

    fn append(&self, blob: &[u8], now: Timestamp) -> std::io::Result<()> {
        let mut state = self.state.lock().expect("event log writer lock poisoned");
        self.ensure_file(&mut state, now)?;
        let mut framed = Vec::with_capacity(blob.len() + 24);
        encode_record(blob, &mut framed);
        // Intentionally no fsync: durability is "at the OS buffer level"
        // (spec §4.3), not a per-record guarantee.
        state.file.as_mut().expect("file just ensured").write_all(&framed)
    }
}

impl EventObserver for EventLogWriter {
    fn on_event(&self, event: &WriteEvent, ctx: &ObserverContext) {
        let context = EventContext {
            timestamp: ctx.current_time,
            acting_user: ctx.performed_by,
            acting_ip: ctx.source_ip,
        };
        let blob = event.encode(context);
        if let Err(e) = self.append(&blob, ctx.current_time) {
            tracing::error!(error = %e, "failed to append event log record; in-memory state still advances");
        }
    }
}

/// The side file raw message bytes are appended to when a message's
/// content is large enough to be stored mapped rather than inline (spec
/// §6.3 `<messagesFile>`). The writer appends via its own handle and
/// publishes `(offset, length)` through the corresponding event.
pub struct MessagesFileAppender {
    file: Mutex<File>,
    next_offset: Mutex<u64>,
}

impl MessagesFileAppender {
    pub fn open(path: &std::path::Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).read(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(MessagesFileAppender { file: Mutex::new(file), next_offset: Mutex::new(len) })
    }

    pub fn append(&self, bytes: &[u8]) -> std::io::Result<(u64, u32)> {
        let mut file = self.file.lock().expect("messages file lock poisoned");
        let mut offset = self.next_offset.lock().expect("messages file offset lock poisoned");
        file.write_all(bytes)?;
        let this_offset = *offset;
        *offset += bytes.len() as u64;
        Ok((this_offset, bytes.len() as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityId;

    #[test]
    fn rotates_after_the_configured_interval() {
        let dir = tempfile::tempdir().unwrap();
        let writer = EventLogWriter::new(dir.path().to_path_buf(), 10).unwrap();
        let ctx = ObserverContext { performed_by: EntityId::new(), current_time: 1000, source_ip: RawIp::UNKNOWN };
        writer.on_event(&WriteEvent::DeleteUser { id: EntityId::new() }, &ctx);
        let ctx2 = ObserverContext { current_time: 1020, ..ctx };
        writer.on_event(&WriteEvent::DeleteUser { id: EntityId::new() }, &ctx2);

        let mut files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        files.sort();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn messages_file_appender_returns_increasing_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let appender = MessagesFileAppender::open(&dir.path().join("messages.bin")).unwrap();
        let (offset1, len1) = appender.append(b"hello").unwrap();
        let (offset2, len2) = appender.append(b"world!").unwrap();
        assert_eq!(offset1, 0);
        assert_eq!(len1, 5);
        assert_eq!(offset2, 5);
        assert_eq!(len2, 6);
    }
}
