//! The append-only event log (spec §4.3, §4.4, §6.1-§6.3, component C6/C7).
//!
//! `format` frames individual records; `codec` encodes the primitives every
//! payload is built from; `events` catalogues the event types and their
//! payload shapes; `writer` is the production [`crate::store::EventObserver`]
//! that appends them; `importer` replays a log directory back into a fresh
//! [`crate::store::Store`] at startup.

pub mod codec;
pub mod events;
pub mod format;
pub mod importer;
pub mod writer;

pub use events::{decode_blob, EventContext, EventType, MessageContentWire, WriteEvent, CONTEXT_VERSION_1};
pub use format::{decode_record, encode_record, FramingError, RECORD_MAGIC};
pub use writer::{EventLogWriter, MessagesFileAppender};
