// tests/common/mod.rs
// Shared helpers: a tiny HTTP responder and recording collaborators.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use listing_watch::{Listing, Notifier};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub struct Route {
    pub path: &'static str,
    pub status: u16,
    pub body: String,
}

impl Route {
    pub fn ok(path: &'static str, body: String) -> Self {
        Self { path, status: 200, body }
    }

    pub fn status(path: &'static str, status: u16) -> Self {
        Self {
            path,
            status,
            body: "nope".into(),
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Serve `routes` on an ephemeral port; unknown paths get 404. Returns `http://127.0.0.1:PORT`.
pub async fn serve(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = match sock.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let req = String::from_utf8_lossy(&buf);
                let path = req.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|r| r.path == path)
                    .map(|r| (r.status, r.body.clone()))
                    .unwrap_or((404, "not found".to_string()));
                let resp = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    reason(status),
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

/// A listing page with product cards `(name, price, href)`, padded past the escalation threshold.
pub fn listing_page(cards: &[(&str, Option<&str>, &str)]) -> String {
    let mut html = String::from("<html><body><ul>");
    for (name, price, href) in cards {
        html.push_str("<li class=\"card\">");
        html.push_str(&format!("<h3 class=\"title\">{name}</h3>"));
        if let Some(p) = price {
            html.push_str(&format!("<span class=\"price\">{p}</span>"));
        }
        html.push_str(&format!("<a href=\"{href}\">view</a></li>"));
    }
    html.push_str("</ul><!--");
    html.push_str(&"x".repeat(3_000));
    html.push_str("--></body></html>");
    html
}

pub fn listing(name: &str, link: &str) -> Listing {
    Listing {
        name: name.to_string(),
        price: "$100".to_string(),
        link: link.to_string(),
        source: "https://s/".to_string(),
    }
}

/// Records every batch it is handed.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub batches: Arc<Mutex<Vec<Vec<Listing>>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<Listing>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, new_items: &[Listing]) -> Result<()> {
        self.batches.lock().unwrap().push(new_items.to_vec());
        if self.fail {
            anyhow::bail!("smtp down");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
