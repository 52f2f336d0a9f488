//! ============================================================================
//! Test Support - fake REST backend
//! ============================================================================
//! One-shot tiny_http server that records what the client sent.
//! ============================================================================

use std::io::Cursor;
use std::sync::mpsc;

use tiny_http::{Header, Response, Server};

/// What the fake backend observed
#[derive(Debug)]
pub struct SeenRequest {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub client_header: Option<String>,
    pub body: String,
}

pub fn json_response(status: u16, body: String) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap())
}

fn header_value(request: &tiny_http::Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

/// Answer exactly one request with `status`/`body`; returns the base URL
/// and a channel that yields the observed request.
pub fn serve_once(
    status: u16,
    body: String,
    extra_header: Option<(&'static str, &'static str)>,
) -> (String, mpsc::Receiver<SeenRequest>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let Ok(mut request) = server.recv() else {
            return;
        };

        let mut received = String::new();
        let _ = request.as_reader().read_to_string(&mut received);
        let seen = SeenRequest {
            method: request.method().to_string(),
            url: request.url().to_string(),
            content_type: header_value(&request, "Content-Type"),
            client_header: header_value(&request, "X-Client"),
            body: received,
        };

        let mut response = json_response(status, body);
        if let Some((name, value)) = extra_header {
            response = response.with_header(Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap());
        }
        let _ = request.respond(response);
        let _ = tx.send(seen);
    });

    (format!("http://{}/api/v1", addr), rx)
}

/// Base URL on a port nothing listens on
pub fn unused_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api/v1", port)
}
