//! Response builder (spec §4.6 "Response builder"), grounded on the
//! original's `HttpResponseBuilder.h`/`.cpp`: a linear state machine
//! `NothingWritten -> ResponseCodeWritten -> BodyWritten`. Headers may only
//! be written in the middle state; the body only once.

/// spec §4.6 "Cookies are percent-encoded per RFC 6265 with optional
/// `Expires`, `Max-Age`, `Domain`, `Path`, `Secure`, `HttpOnly`."
#[derive(Debug, Clone, Default)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub max_age_seconds: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Cookie { name: name.into(), value: value.into(), ..Default::default() }
    }

    fn encode(&self) -> String {
        let mut out = format!("{}={}", urlencoding::encode(&self.name), urlencoding::encode(&self.value));
        if let Some(max_age) = self.max_age_seconds {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={domain}"));
        }
        out.push_str(&format!("; Path={}", self.path.as_deref().unwrap_or("/")));
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NothingWritten,
    ResponseCodeWritten,
    BodyWritten,
}

/// spec §4.6: "`writeBodyAndContentLength` computes and emits
/// `Content-Length` from the buffer's final size, optionally prefixed by a
/// configurable response-prefix string (for XSSI protection)."
pub struct ResponseBuilder {
    response_prefix: String,
    state: State,
    status_line: String,
    headers: Vec<String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(response_prefix: String) -> Self {
        ResponseBuilder {
            response_prefix,
            state: State::NothingWritten,
            status_line: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn write_status(&mut self, code: u16) -> &mut Self {
        assert_eq!(self.state, State::NothingWritten, "status already written");
        self.status_line = format!("HTTP/1.1 {code} {}", reason_phrase(code));
        self.state = State::ResponseCodeWritten;
        self
    }

    pub fn write_header(&mut self, name: &str, value: &str) -> &mut Self {
        assert_eq!(self.state, State::ResponseCodeWritten, "headers may only be written after the status and before the body");
        self.headers.push(format!("{name}: {value}"));
        self
    }

    pub fn write_cookie(&mut self, cookie: &Cookie) -> &mut Self {
        self.write_header("Set-Cookie", &cookie.encode())
    }

    /// Emits the JSON-hijacking prefix, `body`, and a computed
    /// `Content-Length` covering both (spec §4.6, §6.2 "Response prefix").
    pub fn write_body_and_content_length(&mut self, body: &[u8]) {
        assert_eq!(self.state, State::ResponseCodeWritten, "body already written");
        let mut full_body = Vec::with_capacity(self.response_prefix.len() + body.len());
        full_body.extend_from_slice(self.response_prefix.as_bytes());
        full_body.extend_from_slice(body);
        self.write_header("Content-Length", &full_body.len().to_string());
        self.body = full_body;
        self.state = State::BodyWritten;
    }

    /// Serializes the whole response. Panics if the body was never written
    /// — every handler path must reach `BodyWritten`.
    pub fn into_bytes(self) -> Vec<u8> {
        assert_eq!(self.state, State::BodyWritten, "response finished without a body");
        let mut out = Vec::with_capacity(self.status_line.len() + self.body.len() + 128);
        out.extend_from_slice(self.status_line.as_bytes());
        out.extend_from_slice(b"\r\n");
        for header in &self.headers {
            out.extend_from_slice(header.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        417 => "Expectation Failed",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        505 => "HTTP Version Not Supported",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_length_covers_the_response_prefix() {
        let mut builder = ResponseBuilder::new(")]}',\n".to_string());
        builder.write_status(200).write_header("Content-Type", "application/json");
        builder.write_body_and_content_length(b"{}");
        let bytes = builder.into_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Content-Length: 8"));
        assert!(text.ends_with(")]}',\n{}"));
    }

    #[test]
    #[should_panic]
    fn writing_headers_before_status_panics() {
        let mut builder = ResponseBuilder::new(String::new());
        builder.write_header("X", "Y");
    }
}
