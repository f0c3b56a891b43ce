//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed route table (path → status + body). The query string is
//! ignored for matching; every request target is recorded so tests can check
//! what was (and was not) requested. Unknown paths get 404. The server also
//! tracks the most requests it has seen open at the same time.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: b"error".to_vec(),
        }
    }
}

pub struct TreeServer {
    /// e.g. "http://127.0.0.1:12345"
    pub base: String,
    hits: Arc<Mutex<Vec<String>>>,
    open: Arc<OpenRequests>,
}

/// Requests accepted but not yet answered, and the highest that count reached.
#[derive(Default)]
struct OpenRequests {
    now: AtomicUsize,
    peak: AtomicUsize,
}

impl OpenRequests {
    fn enter(&self) {
        let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.now.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TreeServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Request targets seen so far (path plus query).
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    /// Most connections that were waiting for a response at the same time.
    pub fn peak_open_requests(&self) -> usize {
        self.open.peak.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. Runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> TreeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> =
        Arc::new(routes.into_iter().map(|(p, r)| (p.to_string(), r)).collect());
    let hits = Arc::new(Mutex::new(Vec::new()));
    let hits_srv = Arc::clone(&hits);
    let open = Arc::new(OpenRequests::default());
    let open_srv = Arc::clone(&open);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let hits = Arc::clone(&hits_srv);
            let open = Arc::clone(&open_srv);
            thread::spawn(move || {
                open.enter();
                handle(stream, &routes, &hits, &open);
            });
        }
    });
    TreeServer {
        base: format!("http://127.0.0.1:{}", port),
        hits,
        open,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    routes: &HashMap<String, Route>,
    hits: &Mutex<Vec<String>>,
    open: &OpenRequests,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(5)));
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => {
                open.leave();
                return;
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let request = String::from_utf8_lossy(&buf);
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("").to_string();
    hits.lock().unwrap().push(target.clone());

    let path = target.split('?').next().unwrap_or("");
    let route = if method.eq_ignore_ascii_case("GET") {
        routes.get(path).cloned().unwrap_or_else(|| Route::status(404))
    } else {
        Route::status(405)
    };
    // The client is still mid-transfer until the response below is written.
    open.leave();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        route.status,
        reason(route.status),
        route.body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
