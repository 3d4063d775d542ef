//! Minimal HTTP/1.1 object server for integration tests: HEAD and Range GET.
//!
//! Serves one static object body under any path. HEAD responds with
//! Content-Length and Last-Modified; GET with a Range header responds
//! 206 Partial Content. Options simulate fault modes: a missing object
//! (404 on every request) and range responses that carry fewer bytes than
//! requested.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

/// Fixed Last-Modified marker the server reports.
pub const LAST_MODIFIED: &str = "Wed, 21 Oct 2015 07:28:00 GMT";

#[derive(Debug, Clone, Copy)]
pub struct ObjectServerOptions {
    /// If false, every request gets 404 (object does not exist).
    pub object_exists: bool,
    /// Bytes withheld from the end of every range response body. The
    /// Content-Length matches the truncated body, so the transfer completes
    /// and the client's own byte-count check has to catch the shortfall.
    pub truncate_by: u64,
}

impl Default for ObjectServerOptions {
    fn default() -> Self {
        Self {
            object_exists: true,
            truncate_by: 0,
        }
    }
}

/// Starts a server in a background thread serving `body`. Returns the
/// endpoint base URL (e.g. "http://127.0.0.1:12345/"). The server runs until
/// the process exits.
pub fn start(body: Vec<u8>) -> String {
    start_with_options(body, ObjectServerOptions::default())
}

/// Like `start` but with customized fault behavior.
pub fn start_with_options(body: Vec<u8>, opts: ObjectServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            thread::spawn(move || handle(stream, &body, opts));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: ObjectServerOptions) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    let total = body.len() as u64;

    if !opts.object_exists {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    if method.eq_ignore_ascii_case("HEAD") {
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nLast-Modified: {}\r\nAccept-Ranges: bytes\r\n\r\n",
            total, LAST_MODIFIED
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if method.eq_ignore_ascii_case("GET") {
        let (status, range_header, slice) = match range {
            Some((start, end_incl)) => {
                let start = start.min(total);
                let end_incl = end_incl.min(total.saturating_sub(1));
                if start > end_incl {
                    (
                        "416 Range Not Satisfiable",
                        format!("bytes */{}", total),
                        &body[0..0],
                    )
                } else {
                    let start = start as usize;
                    let end_excl = (end_incl + 1).min(total) as usize;
                    let slice = body.get(start..end_excl).unwrap_or(&body[0..0]);
                    (
                        "206 Partial Content",
                        format!("bytes {}-{}/{}", start, end_excl.saturating_sub(1), total),
                        slice,
                    )
                }
            }
            None => (
                "200 OK",
                format!("bytes 0-{}/{}", total.saturating_sub(1), total),
                body,
            ),
        };
        let keep = slice.len().saturating_sub(opts.truncate_by as usize);
        let slice = &slice[..keep];
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\n\r\n",
            status,
            slice.len(),
            range_header
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(slice);
        return;
    }

    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    let spec = value[6..].trim();
                    if let Some((a, b)) = spec.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
