//! HTTP response variants and their wire rendering.

/// Body of the 404 page.
pub const NOT_FOUND_BODY: &str = "<html><body>404 Not Found</body></html>";

/// Status lines this server produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `200 OK`
    Ok,
    /// `404 Not Found`
    NotFound,
}

impl Status {
    /// Numeric status code
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
        }
    }

    /// Reason phrase for the status line
    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
        }
    }
}

/// Exactly one of these is written per connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Status line, `Content-Type`, `Content-Length`, blank line, body
    Framed {
        /// Echoed from the request line
        version: String,
        /// Status code and reason
        status: Status,
        /// `Content-Type` header value
        content_type: String,
        /// Payload
        body: Vec<u8>,
    },
    /// Body only, for clients that expect a bare payload
    Raw {
        /// Payload
        body: Vec<u8>,
    },
}

impl Response {
    /// Framed `200 OK` carrying `body`.
    pub fn ok(version: &str, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Response::Framed {
            version: version.to_string(),
            status: Status::Ok,
            content_type: content_type.into(),
            body,
        }
    }

    /// Framed 404 with the HTML error page.
    pub fn not_found(version: &str) -> Self {
        Response::Framed {
            version: version.to_string(),
            status: Status::NotFound,
            content_type: "text/html".to_string(),
            body: NOT_FOUND_BODY.as_bytes().to_vec(),
        }
    }

    /// Body written without status line or headers.
    pub fn raw(body: Vec<u8>) -> Self {
        Response::Raw { body }
    }

    /// `None` for raw responses, which carry no status line.
    pub fn status(&self) -> Option<Status> {
        match self {
            Response::Framed { status, .. } => Some(*status),
            Response::Raw { .. } => None,
        }
    }

    /// Payload, without framing
    pub fn body(&self) -> &[u8] {
        match self {
            Response::Framed { body, .. } | Response::Raw { body } => body,
        }
    }

    /// Bytes to put on the wire.
    pub fn render(&self) -> Vec<u8> {
        match self {
            Response::Raw { body } => body.clone(),
            Response::Framed {
                version,
                status,
                content_type,
                body,
            } => {
                let head = format!(
                    "{} {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
                    version,
                    status.code(),
                    status.reason(),
                    content_type,
                    body.len()
                );
                let mut out = Vec::with_capacity(head.len() + body.len());
                out.extend_from_slice(head.as_bytes());
                out.extend_from_slice(body);
                out
            }
        }
    }
}
