//! In-memory log capture for unit tests.

use std::io;
use std::sync::{Arc, Mutex};
use tracing::{Level, Subscriber};

use crate::observability::format::JsonFormatter;

/// Shared buffer the JSON formatter writes into.
#[derive(Clone, Default)]
pub(crate) struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    pub(crate) fn lines(&self) -> Vec<String> {
        let text = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
        text.lines().map(str::to_string).collect()
    }

    /// A subscriber that formats every event with `JsonFormatter` into this buffer.
    pub(crate) fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        let writer = self.clone();
        tracing_subscriber::fmt()
            .event_format(JsonFormatter)
            .with_writer(move || writer.clone())
            .with_max_level(Level::TRACE)
            .finish()
    }
}

/// Run `f` under a capturing subscriber and return the lines it wrote.
pub(crate) fn capture<F: FnOnce()>(f: F) -> Vec<String> {
    let buf = Captured::default();
    tracing::subscriber::with_default(buf.subscriber(), f);
    buf.lines()
}
