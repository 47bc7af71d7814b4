// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Log capture for asserting on emitted events.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

/// Collects formatted log output in memory.
///
/// Install with `tracing::subscriber::set_default(capture.subscriber())` for
/// thread-local capture.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).to_string()
    }

    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(
            output.contains(expected),
            "log output does not contain '{expected}', got:\n{output}"
        );
    }

    pub fn assert_not_contains(&self, unexpected: &str) {
        let output = self.output();
        assert!(
            !output.contains(unexpected),
            "log output unexpectedly contains '{unexpected}', got:\n{output}"
        );
    }

    /// Captures every level.
    #[must_use]
    pub fn subscriber(&self) -> impl tracing::Subscriber {
        self.subscriber_with_level(tracing::Level::TRACE)
    }

    /// Captures `level` and above.
    #[must_use]
    pub fn subscriber_with_level(&self, level: tracing::Level) -> impl tracing::Subscriber {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(level)
            .finish()
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

pub(crate) struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
