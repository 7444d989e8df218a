#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{http::header::CONTENT_TYPE, http::StatusCode, routing::get, Router};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

/// Serve `router` on an ephemeral local port
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Feed server answering `/stations.json` with `body`, and
/// `/broken.json` with a 500.
pub async fn feed_server(body: String) -> SocketAddr {
    let router = Router::new()
        .route(
            "/stations.json",
            get(move || {
                let body = body.clone();
                async move { ([(CONTENT_TYPE, "application/json")], body) }
            }),
        )
        .route(
            "/broken.json",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
    serve(router).await
}

/// Feed server that announces a longer body than it sends, then hangs up
pub async fn truncated_feed_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            // Drain the request head so closing sends FIN, not RST
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }

            let head = "HTTP/1.1 200 OK\r\n\
                        content-type: application/json\r\n\
                        content-length: 4096\r\n\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(br#"[{"id": 1001, "name": "#).await;
            let _ = socket.shutdown().await;
        }
    });
    addr
}

/// A small feed around Bangkok in the loosely-typed shape of the source
pub fn bangkok_feed() -> Value {
    json!([
        {
            "id": 1001, "station_code": "1,001", "name": "กรุงเทพ", "en_name": "Bangkok",
            "lat": "13.7373", "long": "100.5170", "active": 1, "class": 1
        },
        {
            "id": "1002", "station_code": 1002, "name": "ยมราช", "en_name": "Yommarat",
            "lat": 13.7530, "long": 100.5260, "active": "1", "class": "2"
        },
        {
            "id": 1003, "station_code": 1003, "name": "สามเสน", "en_name": "Sam Sen",
            "lat": 13.7870, "long": 100.5180, "active": 1
        },
        {
            "id": 1004, "station_code": 1004, "name": "ร้าง", "en_name": "Closed",
            "lat": 13.7380, "long": 100.5175, "active": 0
        },
        {
            "id": 1005, "station_code": 1005, "name": "ไม่ทราบ", "en_name": "Unknown",
            "lat": 0, "long": null, "active": 1
        },
        {
            "id": 2001, "station_code": 2001, "name": "อยุธยา", "en_name": "Ayutthaya",
            "lat": 14.3569, "long": 100.5848, "active": 1
        }
    ])
}
