//! JSONL transcripts of callback events
//!
//! One event per line, in emission order. A transcript replayed through a
//! [`LogAdapter`](crate::callbacks::LogAdapter) reproduces the run's log.

use crate::callbacks::events::{CallbackEvent, CallbackHandler};
use crate::error::{CrewError, CrewResult};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Writes every event to `writer`, then forwards it to the wrapped handler
pub struct TranscriptRecorder<W: Write + Send, H: CallbackHandler> {
    writer: W,
    inner: H,
}

impl<H: CallbackHandler> TranscriptRecorder<BufWriter<File>, H> {
    /// Create (or truncate) the transcript file at `path`
    pub fn create(path: &Path, inner: H) -> CrewResult<Self> {
        let file = File::create(path)?;
        debug!(path = %path.display(), "Recording transcript");
        Ok(Self::new(BufWriter::new(file), inner))
    }
}

impl<W: Write + Send, H: CallbackHandler> TranscriptRecorder<W, H> {
    pub fn new(writer: W, inner: H) -> Self {
        Self { writer, inner }
    }

    pub fn into_parts(self) -> (W, H) {
        (self.writer, self.inner)
    }
}

impl<W: Write + Send, H: CallbackHandler> CallbackHandler for TranscriptRecorder<W, H> {
    fn handle(&mut self, event: &CallbackEvent) -> CrewResult<()> {
        serde_json::to_writer(&mut self.writer, event).map_err(std::io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.inner.handle(event)
    }
}

/// Feed every event of a transcript to `handler`, returning the event count.
///
/// Blank lines are skipped. The first malformed line aborts the replay.
pub fn replay_transcript<R: BufRead>(
    reader: R,
    handler: &mut dyn CallbackHandler,
) -> CrewResult<usize> {
    let mut count = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = CallbackEvent::from_json(&line).map_err(|e| match e {
            CrewError::MalformedEvent(message) => {
                CrewError::MalformedEvent(format!("line {}: {message}", index + 1))
            }
            other => other,
        })?;
        handler.handle(&event)?;
        count += 1;
    }
    Ok(count)
}
