//! Fetch boundary: read the clustering payload on a worker thread.
//!
//! The engine does not retry or cache. A fetch that is superseded simply has
//! its receiver dropped; the worker's send then fails and the result is lost.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::thread;
use std::time::Instant;

use crate::error::{FetchError, Result};
use crate::heatmap::ClusteredMatrix;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Url {
        url: String,
        top_n_genes: Option<usize>,
    },
    File(PathBuf),
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::Url { .. } => self.request_url(),
            DataSource::File(path) => path.display().to_string(),
        }
    }

    fn request_url(&self) -> String {
        match self {
            DataSource::Url {
                url,
                top_n_genes: Some(n),
            } => {
                let sep = if url.contains('?') { '&' } else { '?' };
                format!("{url}{sep}top_n_genes={n}")
            }
            DataSource::Url { url, .. } => url.clone(),
            DataSource::File(path) => path.display().to_string(),
        }
    }
}

/// Read and ingest the payload. Blocks; call from a worker thread.
pub fn fetch_matrix(source: &DataSource) -> Result<ClusteredMatrix> {
    let body = read_body(source)?;
    let matrix = ClusteredMatrix::from_json(&body)?;
    Ok(matrix)
}

fn read_body(source: &DataSource) -> std::result::Result<String, FetchError> {
    match source {
        DataSource::File(path) => std::fs::read_to_string(path).map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        }),
        DataSource::Url { .. } => {
            let url = source.request_url();
            let response = reqwest::blocking::Client::new().get(&url).send()?;
            let status = response.status();
            let body = response.text()?;
            if !status.is_success() {
                let message = service_error(&body)
                    .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
                return Err(FetchError::Status(message));
            }
            Ok(body)
        }
    }
}

/// The service reports failures as `{"error": "..."}`.
fn service_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

/// A fetch running on its own thread.
pub struct FetchHandle {
    started: Instant,
    rx: Receiver<Result<ClusteredMatrix>>,
}

impl FetchHandle {
    pub fn spawn(source: DataSource) -> Self {
        let (tx, rx) = channel();
        tracing::info!(source = %source.describe(), "fetching clustering data");
        thread::spawn(move || {
            let result = fetch_matrix(&source);
            let _ = tx.send(result);
        });
        Self {
            started: Instant::now(),
            rx,
        }
    }

    /// Non-blocking check for the result.
    pub fn poll(&self) -> Option<Result<ClusteredMatrix>> {
        match self.rx.try_recv() {
            Ok(result) => {
                let elapsed_ms = self.started.elapsed().as_millis() as u64;
                match &result {
                    Ok(m) => tracing::info!(
                        genes = m.dims().rows,
                        samples = m.dims().cols,
                        elapsed_ms,
                        "clustering data ready"
                    ),
                    Err(e) => tracing::warn!(error = %e, elapsed_ms, "clustering fetch failed"),
                }
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(FetchError::Disconnected.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HeatmapError, MalformedDataError};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    /// Answer one HTTP request with a canned response; yields the request line.
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/clustering", listener.local_addr().unwrap());
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            let request = String::from_utf8_lossy(&request);
            request.lines().next().unwrap_or_default().to_string()
        });
        (url, server)
    }

    fn url_source(url: String, top_n_genes: Option<usize>) -> DataSource {
        DataSource::Url { url, top_n_genes }
    }

    fn temp_json(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    fn wait(handle: &FetchHandle) -> Result<ClusteredMatrix> {
        for _ in 0..500 {
            if let Some(result) = handle.poll() {
                return result;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("fetch did not finish");
    }

    #[test]
    fn test_file_fetch_ingests_matrix() {
        let file = temp_json(
            r#"{"genes": ["G1"], "samples": ["S1", "S2"], "expression_data": [[0.1, null]]}"#,
        );
        let handle = FetchHandle::spawn(DataSource::File(file.path().to_path_buf()));
        let matrix = wait(&handle).unwrap();
        assert_eq!(matrix.samples(), ["S1", "S2"]);
        assert_eq!(matrix.value(0, 1), None);
    }

    #[test]
    fn test_malformed_payload_surfaces_once() {
        let file = temp_json(r#"{"genes": ["G1"], "samples": ["S1"]}"#);
        let result = fetch_matrix(&DataSource::File(file.path().to_path_buf()));
        assert!(matches!(
            result,
            Err(HeatmapError::Malformed(MalformedDataError::MissingField(
                "expression_data"
            )))
        ));
    }

    #[test]
    fn test_missing_file_is_fetch_error() {
        let result = fetch_matrix(&DataSource::File(PathBuf::from("/nonexistent/cluster.json")));
        assert!(matches!(
            result,
            Err(HeatmapError::Fetch(FetchError::Io { .. }))
        ));
    }

    #[test]
    fn test_request_url_adds_top_n() {
        let source = DataSource::Url {
            url: "http://127.0.0.1:5000/api/clustering".to_string(),
            top_n_genes: Some(250),
        };
        assert_eq!(
            source.describe(),
            "http://127.0.0.1:5000/api/clustering?top_n_genes=250"
        );

        let source = DataSource::Url {
            url: "http://host/api/clustering?dataset=a".to_string(),
            top_n_genes: Some(10),
        };
        assert_eq!(
            source.describe(),
            "http://host/api/clustering?dataset=a&top_n_genes=10"
        );

        let source = DataSource::Url {
            url: "http://host/api/clustering".to_string(),
            top_n_genes: None,
        };
        assert_eq!(source.describe(), "http://host/api/clustering");
    }

    #[test]
    fn test_http_success_ingests_and_sends_top_n() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"genes": ["G1", "G2"], "samples": ["S1"], "expression_data": [[1.0], [null]], "metadata": {"total_genes": 900}}"#,
        );
        let matrix = fetch_matrix(&url_source(url, Some(7))).unwrap();
        assert_eq!(matrix.genes(), ["G1", "G2"]);
        assert_eq!(matrix.value(1, 0), None);
        assert_eq!(matrix.metadata().and_then(|m| m.total_genes), Some(900));

        let request_line = server.join().unwrap();
        assert!(
            request_line.starts_with("GET /api/clustering?top_n_genes=7 "),
            "unexpected request line: {request_line}"
        );
    }

    #[test]
    fn test_http_error_uses_service_message() {
        let (url, server) = serve_once(
            "500 Internal Server Error",
            r#"{"error": "expression file not found"}"#,
        );
        let result = fetch_matrix(&url_source(url, None));
        server.join().unwrap();
        match result {
            Err(HeatmapError::Fetch(FetchError::Status(message))) => {
                assert_eq!(message, "expression file not found");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_http_error_without_body_message_reports_status() {
        let (url, server) = serve_once("502 Bad Gateway", "<html>Bad Gateway</html>");
        let result = fetch_matrix(&url_source(url, None));
        server.join().unwrap();
        match result {
            Err(HeatmapError::Fetch(FetchError::Status(message))) => {
                assert_eq!(message, "HTTP error! status: 502");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_service_error_message() {
        assert_eq!(
            service_error(r#"{"error": "file not found", "data_dir": "/data"}"#),
            Some("file not found".to_string())
        );
        assert_eq!(service_error("<html>502</html>"), None);
        assert_eq!(service_error(r#"{"error": 5}"#), None);
    }
}
