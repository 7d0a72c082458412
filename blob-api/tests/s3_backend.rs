use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use blob_api::{S3Backend, StorageBackend, StorageConfig, TransportOptions};

const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>bucket</Name><KeyCount>1</KeyCount><MaxKeys>1000</MaxKeys><IsTruncated>false</IsTruncated><Contents><Key>k1</Key><Size>3</Size></Contents></ListBucketResult>"#;

/// Minimal S3 stand-in: lists one key, reports every object as missing on
/// HEAD (the key was removed by another request) and accepts every DELETE.
struct FakeS3 {
    endpoint: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeS3 {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_connection(socket, seen.clone()));
            }
        });

        Self { endpoint, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

async fn serve_connection(mut socket: TcpStream, seen: Arc<Mutex<Vec<String>>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let head_end = loop {
            if let Some(end) = find_head_end(&buf) {
                break end;
            }
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let body_len = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + body_len {
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        buf.drain(..head_end + body_len);

        let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
        let method = request_line.next().unwrap_or_default().to_string();
        let path = request_line.next().unwrap_or_default();
        let path = path.split('?').next().unwrap_or_default().to_string();
        seen.lock().push(format!("{} {}", method, path));

        let response = match method.as_str() {
            "GET" => format!(
                "HTTP/1.1 200 OK\r\nx-amz-request-id: req-list\r\ncontent-type: application/xml\r\ncontent-length: {}\r\n\r\n{}",
                LISTING.len(),
                LISTING
            ),
            "HEAD" => "HTTP/1.1 404 Not Found\r\nx-amz-request-id: req-head\r\ncontent-length: 0\r\n\r\n".to_string(),
            "DELETE" => "HTTP/1.1 204 No Content\r\nx-amz-request-id: req-delete\r\n\r\n".to_string(),
            _ => "HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\n\r\n".to_string(),
        };
        if socket.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

async fn create_test_backend(server: &FakeS3) -> S3Backend {
    let config = StorageConfig::new()
        .with_account("devaccount")
        .with_region("us-east-1")
        .with_endpoint(server.endpoint.clone())
        .with_credentials("test-key", "test-secret")
        .with_transport(
            TransportOptions::new()
                .with_max_attempts(1)
                .with_operation_timeout(Duration::from_secs(10)),
        );
    S3Backend::from_config(&config).await.unwrap()
}

#[tokio::test]
async fn test_delete_container_tolerates_concurrently_removed_objects() {
    let server = FakeS3::start().await;
    let backend = create_test_backend(&server).await;

    let response = backend.delete_container("bucket").await.unwrap();
    assert_eq!(response.request_id.as_deref(), Some("req-delete"));

    let requests = server.requests();
    assert!(requests.iter().all(|r| !r.starts_with("HEAD")), "{:?}", requests);
    assert!(requests.contains(&"DELETE /bucket/k1".to_string()), "{:?}", requests);
    assert_eq!(requests.last().map(String::as_str), Some("DELETE /bucket"));
}

#[tokio::test]
async fn test_delete_blob_reports_missing_key() {
    let server = FakeS3::start().await;
    let backend = create_test_backend(&server).await;

    let result = backend.delete_blob("bucket", "k1").await;
    assert!(result.unwrap_err().is_not_found());
    assert!(server.requests().iter().all(|r| !r.starts_with("DELETE")));
}
