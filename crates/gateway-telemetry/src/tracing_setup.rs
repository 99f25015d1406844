//! Subscriber installation.
//!
//! Builds one `fmt` layer per sink, each behind its own level filter, and a
//! global `EnvFilter` on top.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::http_sink::HttpSink;
use crate::{LogSink, LoggingConfig, TelemetryError};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber for the configured sinks.
///
/// Fails with [`TelemetryError::AlreadyInitialized`] if a global subscriber
/// is already set for this process.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TelemetryError::InvalidLevel(e.to_string()))?;

    let layers = config
        .sinks
        .iter()
        .map(build_sink)
        .collect::<Result<Vec<_>, _>>()?;

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        level = %config.level,
        sinks = config.sinks.len(),
        "Logging initialized"
    );
    Ok(())
}

fn build_sink(sink: &LogSink) -> Result<BoxedLayer, TelemetryError> {
    match sink {
        LogSink::Console { level } => Ok(fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_filter(level.to_filter())
            .boxed()),
        LogSink::File { path, level } => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| TelemetryError::Sink {
                    path: path.clone(),
                    source,
                })?;

            Ok(fmt::layer()
                .json()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(level.to_filter())
                .boxed())
        }
        LogSink::Http { host, port, level } => Ok(fmt::layer()
            .json()
            .with_target(true)
            .with_ansi(false)
            .with_writer(HttpSink::spawn(host, *port)?)
            .with_filter(level.to_filter())
            .boxed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    /// Accept one connection, answer 200 and return its head and body.
    fn collect_one_post(listener: TcpListener) -> (String, String) {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let mut received = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "connection closed before headers");
            received.extend_from_slice(&chunk[..n]);
            if let Some(pos) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&received[..head_end]).to_string();
        let length: usize = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse().ok())?
            })
            .unwrap();
        while received.len() < head_end + length {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "connection closed mid-body");
            received.extend_from_slice(&chunk[..n]);
        }

        stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .unwrap();
        let body = String::from_utf8_lossy(&received[head_end..head_end + length]).to_string();
        (head, body)
    }

    // Scoped with `with_default` so the process-wide subscriber stays free
    // for the `init_logging` test below.
    #[test]
    fn test_http_sink_posts_json_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let collector = std::thread::spawn(move || collect_one_post(listener));

        let layer = build_sink(&LogSink::Http {
            host: "127.0.0.1".into(),
            port,
            level: LogLevel::Warn,
        })
        .unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("below the sink level");
            tracing::warn!(component = "test", "shipped over http");
        });

        let (head, body) = collector.join().unwrap();
        assert!(head.starts_with("POST / HTTP/1.1"));
        assert!(head.to_ascii_lowercase().contains("content-type: application/json"));

        let line: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["fields"]["message"], "shipped over http");
        assert!(!body.contains("below the sink level"));
    }

    #[test]
    fn test_file_sink_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::File {
            path: dir.path().join("missing").join("gateway.log"),
            level: LogLevel::Info,
        };
        assert!(matches!(
            build_sink(&sink),
            Err(TelemetryError::Sink { .. })
        ));
    }

    // Installs the process-wide subscriber, so it is the only test here that
    // calls `init_logging`.
    #[test]
    fn test_file_sink_receives_json_lines_and_second_init_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        let config = LoggingConfig {
            level: "debug".to_string(),
            sinks: vec![LogSink::File {
                path: path.clone(),
                level: LogLevel::Warn,
            }],
        };

        init_logging(&config).unwrap();
        tracing::info!("below the sink level");
        tracing::warn!(component = "test", "routed to file");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["fields"]["message"], "routed to file");

        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::AlreadyInitialized(_))
        ));
    }
}
