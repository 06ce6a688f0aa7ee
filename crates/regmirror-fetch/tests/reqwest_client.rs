#![cfg(feature = "reqwest")]

use std::time::Duration;

use regmirror_fetch::{ByteFetcher, ReqwestClient, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const BODY: &[u8] = b"0123456789abcdefghijklmnopqrst";

/// Serve one request, writing the first `sent` bytes of `body` one at a time
/// with `delay` between them. If `sent` is short of the body the connection
/// is then held open without sending anything more.
async fn trickle(body: &'static [u8], delay: Duration, sent: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        for byte in &body[..sent] {
            tokio::time::sleep(delay).await;
            socket.write_all(std::slice::from_ref(byte)).await.unwrap();
            socket.flush().await.unwrap();
        }
        if sent < body.len() {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    });

    format!("http://{addr}/a-1.0.tgz")
}

#[tokio::test]
async fn test_slow_transfer_that_keeps_progressing_completes() {
    // ~3s in total, far beyond the per-read limit but never idle for long
    let url = trickle(BODY, Duration::from_millis(100), BODY.len()).await;
    let client = ReqwestClient::new(Duration::from_secs(1), Some(Duration::from_secs(1))).unwrap();

    let bytes = client.fetch(&url).await.unwrap();

    assert_eq!(bytes.as_ref(), BODY);
}

#[tokio::test]
async fn test_stalled_body_reports_timeout_cause() {
    let url = trickle(BODY, Duration::from_millis(10), 5).await;
    let client = ReqwestClient::new(Duration::from_secs(1), Some(Duration::from_millis(300))).unwrap();

    let err = client.fetch(&url).await.unwrap_err();

    match err {
        TransportError::Body { url: failed, message } => {
            assert_eq!(failed, url);
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected body error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
    });
    let client = ReqwestClient::new(Duration::from_secs(1), None).unwrap();

    let err = client.fetch(&format!("http://{addr}/missing")).await.unwrap_err();

    assert!(matches!(err, TransportError::Status { status: 404, .. }));
}
