// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP response builders.
//!
//! Responses always carry a Content-Length so clients on keep-alive
//! connections can frame them.

/// 200 with a body.
pub fn ok(content_type: &str, body: &str, keep_alive: bool) -> String {
    let mut head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nCache-Control: max-age=120\r\n",
        body.len()
    );
    push_keep_alive(&mut head, keep_alive);
    head.push_str("\r\n");
    head.push_str(body);
    head
}

/// 200 with a body and a `Last-Modified` validator the client can echo
/// back as `If-Modified-Since`.
pub fn ok_with_last_modified(
    content_type: &str,
    body: &str,
    last_modified: &str,
    keep_alive: bool,
) -> String {
    let mut head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nCache-Control: max-age=120\r\nLast-Modified: {last_modified}\r\n",
        body.len()
    );
    push_keep_alive(&mut head, keep_alive);
    head.push_str("\r\n");
    head.push_str(body);
    head
}

/// 301 to `location`.
pub fn moved(location: &str, keep_alive: bool) -> String {
    let mut head = format!(
        "HTTP/1.1 301 Moved Permanently\r\nContent-Length: 0\r\nContent-Type: text/plain\r\nLocation: {location}\r\nCache-Control: no-cache\r\n"
    );
    push_keep_alive(&mut head, keep_alive);
    head.push_str("\r\n");
    head
}

/// 304 for conditional requests.
pub fn not_modified(keep_alive: bool) -> String {
    let mut head = "HTTP/1.1 304 Not Modified\r\nContent-Length: 0\r\n".to_string();
    push_keep_alive(&mut head, keep_alive);
    head.push_str("\r\n");
    head
}

/// 404 with an empty body.
pub fn not_found(keep_alive: bool) -> String {
    let mut head =
        "HTTP/1.1 404 Not Found\r\nContent-Type: text/html\r\nContent-Length: 0\r\n".to_string();
    push_keep_alive(&mut head, keep_alive);
    head.push_str("\r\n");
    head
}

fn push_keep_alive(head: &mut String, keep_alive: bool) {
    if keep_alive {
        head.push_str("Connection: keep-alive\r\n");
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
