//! Network sink: each formatted JSON line is POSTed to a collector.
//!
//! Formatting happens on the logging thread; delivery happens on a dedicated
//! thread so a slow collector never blocks a request. Lines the collector
//! rejects are dropped.

use std::io;
use std::sync::mpsc::{self, Sender};
use std::thread;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing_subscriber::fmt::MakeWriter;

use crate::TelemetryError;

/// `MakeWriter` handing every finished line to the delivery thread.
pub(crate) struct HttpSink {
    lines: Sender<Vec<u8>>,
}

impl HttpSink {
    /// Start the delivery thread for `http://{host}:{port}/`.
    ///
    /// The thread exits once the sink (and every writer it made) is dropped.
    pub(crate) fn spawn(host: &str, port: u16) -> Result<Self, TelemetryError> {
        let url = format!("http://{host}:{port}/");
        let (lines, queue) = mpsc::channel::<Vec<u8>>();

        thread::Builder::new()
            .name("log-http-sink".into())
            .spawn(move || {
                let client = Client::new();
                for line in queue {
                    let sent = client
                        .post(&url)
                        .header(CONTENT_TYPE, "application/json")
                        .body(line)
                        .send();
                    // tracing here would re-enter this sink.
                    if let Err(e) = sent {
                        eprintln!("log line to {url} dropped: {e}");
                    }
                }
            })
            .map_err(|source| TelemetryError::HttpSink {
                endpoint: format!("{host}:{port}"),
                source,
            })?;

        Ok(Self { lines })
    }
}

impl<'a> MakeWriter<'a> for HttpSink {
    type Writer = HttpLine;

    fn make_writer(&'a self) -> Self::Writer {
        HttpLine {
            buf: Vec::new(),
            lines: self.lines.clone(),
        }
    }
}

/// Buffers one event; queued for delivery when dropped.
pub(crate) struct HttpLine {
    buf: Vec<u8>,
    lines: Sender<Vec<u8>>,
}

impl io::Write for HttpLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for HttpLine {
    fn drop(&mut self) {
        let line = std::mem::take(&mut self.buf);
        let trimmed = line.trim_ascii_end();
        if !trimmed.is_empty() {
            // Receiver only goes away with the sink itself.
            let _ = self.lines.send(trimmed.to_vec());
        }
    }
}
