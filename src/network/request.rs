//! HTTP request parsing.
//!
//! Only the parts a GET needs: the request line, query arguments and headers. Any body
//! after the blank line is ignored.

use crate::error::{Result, TemplogError};
use std::collections::HashMap;
use url::form_urlencoded;

/// A parsed request. Lives for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method token, e.g. `GET`
    pub method: String,
    /// Path without the query string
    pub path: String,
    /// Protocol token, echoed in framed responses
    pub version: String,
    /// Decoded query arguments
    pub query: HashMap<String, String>,
    /// Header values keyed by the name as sent
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Parse `METHOD SP PATH[?QUERY] SP VERSION` followed by `Key: Value` header lines.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut lines = raw.split('\n').map(|line| line.trim_end_matches('\r'));

        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(target), Some(version)) => (method, target, version),
            _ => {
                return Err(TemplogError::MalformedRequest(format!(
                    "bad request line {request_line:?}"
                )))
            }
        };

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, HashMap::new()),
        };

        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            query,
            headers,
        })
    }

    /// Header lookup, ignoring ASCII case of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Decoded value of query argument `name`.
    pub fn query_arg(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Decode an `application/x-www-form-urlencoded` query. A key without `=` maps to an
/// empty value; the last duplicate wins.
fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_line_and_headers() {
        let request = Request::parse(
            "GET /all HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/8.0\r\n\r\n",
        )
        .unwrap();

        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/all");
        assert_eq!(request.version, "HTTP/1.1");
        assert_eq!(request.header("host"), Some("localhost:8080"));
        assert_eq!(request.headers.len(), 2);
        assert!(request.query.is_empty());
    }

    #[test]
    fn test_query_arguments() {
        let request =
            Request::parse("GET /day?from=10&to=20&from=30&flag&name=a%20b+c HTTP/1.0\r\n\r\n")
                .unwrap();

        assert_eq!(request.path, "/day");
        assert_eq!(request.query_arg("from"), Some("30"));
        assert_eq!(request.query_arg("to"), Some("20"));
        assert_eq!(request.query_arg("flag"), Some(""));
        assert_eq!(request.query_arg("missing"), None);
        assert_eq!(request.query_arg("name"), Some("a b c"));
    }

    #[test]
    fn test_headers_stop_at_blank_line() {
        let request =
            Request::parse("GET / HTTP/1.1\r\nA: 1\r\n\r\nB: 2\r\n").unwrap();
        assert_eq!(request.header("A"), Some("1"));
        assert_eq!(request.header("B"), None);
    }

    #[test]
    fn test_bare_newlines_accepted() {
        let request = Request::parse("GET /hour HTTP/1.1\nAccept: */*\n\n").unwrap();
        assert_eq!(request.path, "/hour");
        assert_eq!(request.header("accept"), Some("*/*"));
    }

    #[test]
    fn test_malformed_request_line() {
        for raw in ["", "\r\n", "GET\r\n\r\n", "GET /all\r\n\r\n"] {
            assert!(
                matches!(Request::parse(raw), Err(TemplogError::MalformedRequest(_))),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn test_invalid_escapes_kept_literally() {
        let request = Request::parse("GET /all?a=100%&b=%4&c=%zz&d=%41%42 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(request.query_arg("a"), Some("100%"));
        assert_eq!(request.query_arg("b"), Some("%4"));
        assert_eq!(request.query_arg("c"), Some("%zz"));
        assert_eq!(request.query_arg("d"), Some("AB"));
    }
}
