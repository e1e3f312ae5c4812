use std::fmt::Write as _;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Minimal HTTP/1.1 client over the agent's Unix control socket.
///
/// One request per connection (`Connection: close`), which keeps the
/// framing trivial: everything after the header block is the body.
pub struct ApiClient {
    socket_path: PathBuf,
}

impl ApiClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// GET a path; non-200 responses become errors carrying the
    /// server's plain-text reason.
    pub fn get(&self, path: &str) -> anyhow::Result<String> {
        self.request("GET", path, None)
    }

    /// POST a form; pairs are percent-encoded.
    pub fn post_form(&self, path: &str, pairs: &[(&str, &str)]) -> anyhow::Result<String> {
        let body = pairs
            .iter()
            .map(|(key, value)| format!("{}={}", urlencode(key), urlencode(value)))
            .collect::<Vec<_>>()
            .join("&");
        self.request("POST", path, Some(&body))
    }

    fn request(&self, method: &str, path: &str, body: Option<&str>) -> anyhow::Result<String> {
        let mut stream = UnixStream::connect(&self.socket_path).with_context(|| {
            format!(
                "could not reach the agent at {} (is it running?)",
                self.socket_path.display()
            )
        })?;

        let mut request = format!(
            "{method} {path} HTTP/1.1\r\nHost: wireward\r\nConnection: close\r\n"
        );
        if let Some(body) = body {
            let _ = write!(
                request,
                "Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n",
                body.len()
            );
        }
        request.push_str("\r\n");
        if let Some(body) = body {
            request.push_str(body);
        }

        stream.write_all(request.as_bytes())?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw)?;
        let response = String::from_utf8(raw).context("non-UTF-8 response from agent")?;

        let (head, body) = response
            .split_once("\r\n\r\n")
            .context("malformed response from agent")?;
        let status_line = head.lines().next().unwrap_or_default();
        let status: u16 = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .context("malformed status line from agent")?;

        let body = if head
            .lines()
            .any(|line| line.to_ascii_lowercase() == "transfer-encoding: chunked")
        {
            decode_chunked(body)?
        } else {
            body.to_string()
        };

        if status != 200 {
            bail!("{}", body.trim_end());
        }
        Ok(body)
    }
}

pub(crate) fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

fn decode_chunked(body: &str) -> anyhow::Result<String> {
    let mut out = String::new();
    let mut rest = body;
    loop {
        let (size_line, tail) = rest.split_once("\r\n").context("truncated chunk header")?;
        let size = usize::from_str_radix(size_line.trim(), 16).context("bad chunk size")?;
        if size == 0 {
            break;
        }
        if tail.len() < size {
            bail!("truncated chunk body");
        }
        out.push_str(&tail[..size]);
        // Skip the chunk and its trailing CRLF.
        rest = tail
            .get(size + 2..)
            .context("truncated chunk terminator")?;
    }
    Ok(out)
}
