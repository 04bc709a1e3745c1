//! JSON-RPC transport for the MCP stdio server.
//!
//! Two framings exist in the wild: newline-delimited JSON and
//! `Content-Length` headers per the MCP spec. The framing is detected once
//! from the first line and responses mirror it for the rest of the process.

use std::io::{BufRead, BufReader, Read, Write};

use serde::Deserialize;
use serde_json::{Value, json};

use crate::mcp::McpServer;

const MAX_CONTENT_LENGTH_BYTES: usize = 16 * 1024 * 1024;

/// An incoming JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default, rename = "jsonrpc")]
    pub _jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
}

pub fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    NewlineJson,
    ContentLength,
}

fn detect_framing(first_line: &str) -> Option<Framing> {
    let trimmed = first_line.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(Framing::NewlineJson);
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("content-length:") || lower.starts_with("content-type:") {
        return Some(Framing::ContentLength);
    }
    None
}

fn content_length_of(line: &str) -> Option<usize> {
    let (key, value) = line.trim().split_once(':')?;
    if !key.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

/// Read one Content-Length frame; `first_header` is the header line already
/// consumed. Returns `None` at EOF.
fn read_frame(
    reader: &mut impl BufRead,
    mut first_header: String,
) -> std::io::Result<Option<Vec<u8>>> {
    let mut length = content_length_of(&first_header);

    // Consume header lines until the blank separator.
    while !first_header.trim_end().is_empty() {
        first_header.clear();
        if reader.read_line(&mut first_header)? == 0 {
            return Ok(None);
        }
        if length.is_none() {
            length = content_length_of(&first_header);
        }
    }

    let Some(length) = length else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "missing Content-Length header",
        ));
    };
    if length > MAX_CONTENT_LENGTH_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Content-Length exceeds maximum frame size",
        ));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    Ok(Some(body))
}

fn write_response(
    out: &mut impl Write,
    framing: Framing,
    response: &Value,
) -> std::io::Result<()> {
    match framing {
        Framing::NewlineJson => {
            writeln!(out, "{response}")?;
        }
        Framing::ContentLength => {
            let body = response.to_string();
            write!(out, "Content-Length: {}\r\n\r\n{body}", body.len())?;
        }
    }
    out.flush()
}

fn dispatch(
    server: &mut McpServer,
    out: &mut impl Write,
    framing: Framing,
    body: &[u8],
) -> std::io::Result<()> {
    let data: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            let resp = json_rpc_error(None, -32700, &format!("Parse error: {e}"));
            return write_response(out, framing, &resp);
        }
    };

    let id = data.get("id").cloned();
    let request: JsonRpcRequest = match serde_json::from_value(data) {
        Ok(request) => request,
        Err(e) => {
            let resp = json_rpc_error(id, -32600, &format!("Invalid Request: {e}"));
            return write_response(out, framing, &resp);
        }
    };

    if let Some(response) = server.handle(request) {
        write_response(out, framing, &response)?;
    }
    Ok(())
}

/// Run the server over stdin/stdout until EOF.
pub fn run_stdio(server: &mut McpServer) -> std::io::Result<()> {
    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut stdout = std::io::stdout().lock();

    let mut framing: Option<Framing> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        let effective = match framing {
            Some(f) => f,
            None => match detect_framing(&line) {
                Some(detected) => {
                    framing = Some(detected);
                    detected
                }
                None => continue,
            },
        };

        match effective {
            Framing::NewlineJson => {
                let raw = line.trim();
                if raw.is_empty() {
                    continue;
                }
                dispatch(server, &mut stdout, effective, raw.as_bytes())?;
            }
            Framing::ContentLength => {
                if line.trim().is_empty() {
                    continue;
                }
                let Some(body) = read_frame(&mut reader, line)? else {
                    break;
                };
                dispatch(server, &mut stdout, effective, &body)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_newline_json() {
        assert_eq!(
            detect_framing(r#"{"jsonrpc":"2.0"}"#),
            Some(Framing::NewlineJson)
        );
    }

    #[test]
    fn test_detect_content_length() {
        assert_eq!(
            detect_framing("Content-Length: 42\r\n"),
            Some(Framing::ContentLength)
        );
        assert_eq!(
            detect_framing("content-type: application/json\r\n"),
            Some(Framing::ContentLength)
        );
    }

    #[test]
    fn test_detect_skips_blank_lines() {
        assert_eq!(detect_framing("   \n"), None);
    }

    #[test]
    fn test_content_length_header_parse() {
        assert_eq!(content_length_of("Content-Length: 18\r\n"), Some(18));
        assert_eq!(content_length_of("Content-Type: application/json"), None);
    }

    #[test]
    fn test_read_frame() {
        let input = b"\r\n{\"method\":\"ping\"}";
        let mut reader = BufReader::new(&input[..]);
        let body = read_frame(&mut reader, "Content-Length: 17\r\n".to_string())
            .unwrap()
            .unwrap();
        assert_eq!(body, b"{\"method\":\"ping\"}");
    }

    #[test]
    fn test_write_newline_response() {
        let mut out = Vec::new();
        let resp = json_rpc_response(Some(json!(1)), json!({}));
        write_response(&mut out, Framing::NewlineJson, &resp).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\"jsonrpc\":\"2.0\""));
    }

    #[test]
    fn test_write_content_length_response() {
        let mut out = Vec::new();
        let resp = json_rpc_response(Some(json!(1)), json!({}));
        write_response(&mut out, Framing::ContentLength, &resp).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Content-Length: "));
        assert!(text.contains("\r\n\r\n{"));
    }
}
