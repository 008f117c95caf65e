//! Streaming request parser (spec §4.6 "Parser").
//!
//! A state machine over the connection's read buffer: `Verb -> Path ->
//! Version -> NewLine -> (HeaderName -> HeaderSpacing -> HeaderValue ->
//! NewLine)* -> Body`. The original drives this a byte at a time over a
//! fixed header arena so it can run before a full request is buffered;
//! since every connection here already owns an async line reader, the same
//! states are expressed as a sequence of `read_line` calls into the leased
//! header buffer instead of a manual byte-by-byte loop.

use super::buffers::BufferPool;
use super::request::{HttpRequest, HttpVerb, MAX_COOKIES, MAX_QUERY_PAIRS};
use std::net::IpAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

/// spec §4.6 "Error states": `Bad_Request | Payload_Too_Large |
/// HTTP_Version_Not_Supported | Not_Implemented | Expectation_Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    BadRequest,
    PayloadTooLarge,
    HttpVersionNotSupported,
    NotImplemented,
    ExpectationFailed,
    ConnectionClosed,
}

impl ParseError {
    pub fn status_code(self) -> u16 {
        match self {
            ParseError::BadRequest => 400,
            ParseError::PayloadTooLarge => 413,
            ParseError::HttpVersionNotSupported => 505,
            ParseError::NotImplemented => 501,
            ParseError::ExpectationFailed => 417,
            ParseError::ConnectionClosed => 0,
        }
    }
}

/// Parses one request off `reader`, leasing a line-buffer from `header_pool`
/// for the request-line and header scratch space, and bounding the body to
/// `max_body_bytes` (backing the read-buffer-chain bound of spec §4.6).
pub async fn parse_request<R>(reader: &mut BufReader<R>, header_pool: &BufferPool, max_body_bytes: usize, remote_address: IpAddr) -> Result<HttpRequest, ParseError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line_buf = header_pool.lease();

    // --- Verb, Path, Version, NewLine ---
    let request_line = read_line(reader, &mut line_buf).await?;
    if request_line.is_empty() {
        return Err(ParseError::ConnectionClosed);
    }
    let mut parts = request_line.split(' ');
    let verb = parts.next().ok_or(ParseError::BadRequest)?;
    let raw_path = parts.next().ok_or(ParseError::BadRequest)?;
    let version = parts.next().ok_or(ParseError::BadRequest)?;
    if parts.next().is_some() {
        return Err(ParseError::BadRequest);
    }

    let verb = HttpVerb::parse(verb).ok_or(ParseError::BadRequest)?;
    let (version_major, version_minor) = parse_version(version)?;
    if version_major != 1 {
        return Err(ParseError::HttpVersionNotSupported);
    }

    let (path, query_string) = match raw_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (raw_path, None),
    };
    let path = normalize_path(path)?;
    let query = parse_query(query_string.unwrap_or(""))?;

    // --- (HeaderName -> HeaderSpacing -> HeaderValue -> NewLine)* ---
    let mut headers = Vec::new();
    loop {
        let line = read_line(reader, &mut line_buf).await?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':').ok_or(ParseError::BadRequest)?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    if headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("transfer-encoding")) || headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-encoding")) {
        return Err(ParseError::NotImplemented);
    }
    if let Some(expect) = headers.iter().find(|(k, _)| k.eq_ignore_ascii_case("expect")) {
        if !expect.1.eq_ignore_ascii_case("100-continue") {
            return Err(ParseError::ExpectationFailed);
        }
    }

    let cookies = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("cookie"))
        .map(|(_, v)| parse_cookies(v))
        .transpose()?
        .unwrap_or_default();

    let keep_alive = match version_minor {
        1 => !headers.iter().any(|(k, v)| k.eq_ignore_ascii_case("connection") && v.eq_ignore_ascii_case("close")),
        _ => headers.iter().any(|(k, v)| k.eq_ignore_ascii_case("connection") && v.eq_ignore_ascii_case("keep-alive")),
    };

    // --- Body ---
    let content_length = match headers.iter().find(|(k, _)| k.eq_ignore_ascii_case("content-length")) {
        Some((_, v)) => v.trim().parse::<usize>().map_err(|_| ParseError::BadRequest)?,
        None => 0,
    };
    if content_length > max_body_bytes {
        return Err(ParseError::PayloadTooLarge);
    }
    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).await.map_err(|_| ParseError::BadRequest)?;
    }

    Ok(HttpRequest {
        verb,
        path,
        version_major,
        version_minor,
        keep_alive,
        headers,
        query,
        cookies,
        body,
        remote_address,
    })
}

async fn read_line<R>(reader: &mut BufReader<R>, scratch: &mut Vec<u8>) -> Result<String, ParseError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    scratch.clear();
    let n = reader.read_until(b'\n', scratch).await.map_err(|_| ParseError::BadRequest)?;
    if n == 0 {
        return Err(ParseError::ConnectionClosed);
    }
    let mut line = std::str::from_utf8(scratch).map_err(|_| ParseError::BadRequest)?;
    line = line.trim_end_matches(['\r', '\n']);
    Ok(line.to_string())
}

fn parse_version(s: &str) -> Result<(u8, u8), ParseError> {
    let rest = s.strip_prefix("HTTP/").ok_or(ParseError::BadRequest)?;
    let (major, minor) = rest.split_once('.').ok_or(ParseError::BadRequest)?;
    let major = major.parse::<u8>().map_err(|_| ParseError::BadRequest)?;
    let minor = minor.parse::<u8>().map_err(|_| ParseError::BadRequest)?;
    Ok((major, minor))
}

/// Lowercases and enforces a trailing `/` (spec §4.6 "Router": "the request
/// path (lowercased, trailing `/` enforced)").
fn normalize_path(path: &str) -> Result<String, ParseError> {
    if !path.starts_with('/') {
        return Err(ParseError::BadRequest);
    }
    let decoded = urlencoding::decode(path).map_err(|_| ParseError::BadRequest)?;
    let mut lower = decoded.trim_start_matches('/').to_lowercase();
    if !lower.ends_with('/') {
        lower.push('/');
    }
    Ok(lower)
}

/// spec §4.6 "after a `?`, name=value pairs are appended... with
/// URL-decoding in place", bounded to [`MAX_QUERY_PAIRS`].
fn parse_query(query_string: &str) -> Result<Vec<(String, String)>, ParseError> {
    let mut pairs = Vec::new();
    if query_string.is_empty() {
        return Ok(pairs);
    }
    for pair in query_string.split('&') {
        if pairs.len() >= MAX_QUERY_PAIRS {
            return Err(ParseError::BadRequest);
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = urlencoding::decode(name).map_err(|_| ParseError::BadRequest)?.into_owned();
        let value = urlencoding::decode(value).map_err(|_| ParseError::BadRequest)?.into_owned();
        pairs.push((name, value));
    }
    Ok(pairs)
}

/// spec §4.6 "Cookies from the `Cookie` header are parsed analogously into
/// a fixed-size array", bounded to [`MAX_COOKIES`].
fn parse_cookies(header_value: &str) -> Result<Vec<(String, String)>, ParseError> {
    let mut cookies = Vec::new();
    for pair in header_value.split(';') {
        if cookies.len() >= MAX_COOKIES {
            return Err(ParseError::BadRequest);
        }
        let Some((name, value)) = pair.trim().split_once('=') else { continue };
        cookies.push((name.trim().to_string(), value.trim().to_string()));
    }
    Ok(cookies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn parses_request_line_headers_query_and_body() {
        let raw = b"POST /Thread_Messages/abc?sort=descending&page=2 HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello";
        let mut reader = BufReader::new(&raw[..]);
        let pool = BufferPool::new(2, 256);
        let req = parse_request(&mut reader, &pool, 1024, IpAddr::V4(Ipv4Addr::LOCALHOST)).await.unwrap();

        assert_eq!(req.verb, HttpVerb::Post);
        assert_eq!(req.path, "thread_messages/abc/");
        assert_eq!(req.query_param("sort"), Some("descending"));
        assert_eq!(req.body, b"hello");
        assert!(req.keep_alive);
    }

    #[tokio::test]
    async fn rejects_chunked_transfer_encoding() {
        let raw = b"POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);
        let pool = BufferPool::new(2, 256);
        let err = parse_request(&mut reader, &pool, 1024, IpAddr::V4(Ipv4Addr::LOCALHOST)).await.unwrap_err();
        assert_eq!(err, ParseError::NotImplemented);
    }

    #[tokio::test]
    async fn rejects_oversized_body() {
        let raw = b"POST /x HTTP/1.1\r\nContent-Length: 100\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);
        let pool = BufferPool::new(2, 256);
        let err = parse_request(&mut reader, &pool, 8, IpAddr::V4(Ipv4Addr::LOCALHOST)).await.unwrap_err();
        assert_eq!(err, ParseError::PayloadTooLarge);
    }
}
