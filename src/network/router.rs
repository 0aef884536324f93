//! Request routing.
//!
//! Registered routes are matched on `{method, exact path}` in registration order, first
//! match wins. Anything else falls through to static file lookup, and a miss there is a
//! 404 page. The table is built once before the server starts and never changes.

use super::request::Request;
use super::response::Response;
use super::static_files::StaticFiles;
use crate::data::{LogKind, LogStore};
use crate::error::{Result, TemplogError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces a response body for a matched route.
pub type Handler = Arc<dyn Fn(&Request) -> Result<Vec<u8>> + Send + Sync>;

/// How a route's body goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyMode {
    /// Body only, no status line or headers
    Raw,
    /// Framed 200 response with this content type
    Framed { content_type: String },
}

struct Route {
    method: String,
    path: String,
    mode: BodyMode,
    handler: Handler,
}

/// Route table plus the static file fallback.
pub struct Router {
    routes: Vec<Route>,
    static_files: StaticFiles,
}

impl Router {
    /// Empty table falling back to `static_files`.
    pub fn new(static_files: StaticFiles) -> Self {
        Self {
            routes: Vec::new(),
            static_files,
        }
    }

    /// Register a route whose body is written without framing.
    pub fn raw<F>(self, method: &str, path: &str, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.route(method, path, BodyMode::Raw, handler)
    }

    /// Register a route answered with a framed `200 OK`.
    pub fn framed<F>(self, method: &str, path: &str, content_type: &str, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        let mode = BodyMode::Framed {
            content_type: content_type.to_string(),
        };
        self.route(method, path, mode, handler)
    }

    fn route<F>(mut self, method: &str, path: &str, mode: BodyMode, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method: method.to_string(),
            path: path.to_string(),
            mode,
            handler: Arc::new(handler),
        });
        self
    }

    /// Number of registered routes
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Produce the single response for `request`.
    pub fn dispatch(&self, request: &Request) -> Response {
        let version = request.version.as_str();

        if let Some(route) = self
            .routes
            .iter()
            .find(|r| r.method == request.method && r.path == request.path)
        {
            return match (route.handler)(request) {
                Ok(body) => match &route.mode {
                    BodyMode::Raw => Response::raw(body),
                    BodyMode::Framed { content_type } => {
                        Response::ok(version, content_type.as_str(), body)
                    }
                },
                Err(e) => {
                    warn!(path = %request.path, error = %e, "Route handler failed");
                    Response::not_found(version)
                }
            };
        }

        if request.method != "GET" {
            debug!(method = %request.method, path = %request.path, "No route for method");
            return Response::not_found(version);
        }

        match self.static_files.load(&request.path) {
            Ok((body, content_type)) => Response::ok(version, content_type, body),
            Err(TemplogError::NotFound(path)) => {
                debug!(%path, "No static file");
                Response::not_found(version)
            }
            Err(e) => {
                warn!(path = %request.path, error = %e, "Failed to read static file");
                Response::not_found(version)
            }
        }
    }
}

/// The fixed route table: `GET /all`, `GET /hour` and `GET /day` return the raw, hourly
/// and daily logs verbatim.
pub fn log_routes(store: LogStore, static_files: StaticFiles) -> Router {
    let routes = [("/all", LogKind::Raw), ("/hour", LogKind::Hourly), ("/day", LogKind::Daily)];
    routes
        .into_iter()
        .fold(Router::new(static_files), |router, (path, kind)| {
            let store = store.clone();
            router.raw("GET", path, move |_| store.read_all(kind))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::response::Status;
    use tracing_test::traced_test;

    fn get(path: &str) -> Request {
        Request::parse(&format!("GET {path} HTTP/1.1\r\n\r\n")).unwrap()
    }

    #[test]
    fn test_first_registered_route_wins() {
        let router = Router::new(StaticFiles::default())
            .raw("GET", "/x", |_| Ok(b"first".to_vec()))
            .raw("GET", "/x", |_| Ok(b"second".to_vec()));

        assert_eq!(router.dispatch(&get("/x")), Response::raw(b"first".to_vec()));
    }

    #[test]
    fn test_route_matches_method_and_exact_path() {
        let router = Router::new(StaticFiles::default())
            .framed("GET", "/status", "text/plain", |_| Ok(b"up".to_vec()));

        let ok = router.dispatch(&get("/status"));
        assert_eq!(ok.status(), Some(Status::Ok));
        assert_eq!(ok.body(), b"up");

        assert_eq!(router.dispatch(&get("/status/")).status(), Some(Status::NotFound));
        let post = Request::parse("POST /status HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(router.dispatch(&post).status(), Some(Status::NotFound));
    }

    #[test]
    fn test_query_string_does_not_affect_matching() {
        let router = Router::new(StaticFiles::default()).raw("GET", "/all", |req| {
            Ok(req.query_arg("n").unwrap_or("none").as_bytes().to_vec())
        });

        assert_eq!(router.dispatch(&get("/all?n=5")).body(), b"5");
    }

    #[test]
    #[traced_test]
    fn test_handler_error_is_not_found() {
        let router = Router::new(StaticFiles::default())
            .raw("GET", "/broken", |_| Err(TemplogError::NotFound("gone".into())));

        assert_eq!(router.dispatch(&get("/broken")).status(), Some(Status::NotFound));
        assert!(logs_contain("Route handler failed"));
    }

    #[test]
    fn test_static_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("temperature.html"), "<h1>hi</h1>").unwrap();
        let router = Router::new(StaticFiles::new(
            vec![dir.path().to_path_buf()],
            "temperature.html",
        ));

        match router.dispatch(&get("/")) {
            Response::Framed {
                status,
                content_type,
                body,
                version,
            } => {
                assert_eq!(status, Status::Ok);
                assert_eq!(content_type, "text/html");
                assert_eq!(body, b"<h1>hi</h1>");
                assert_eq!(version, "HTTP/1.1");
            }
            other => panic!("expected framed response, got {other:?}"),
        }
        assert_eq!(router.dispatch(&get("/nope.html")).status(), Some(Status::NotFound));
    }

    #[test]
    fn test_log_routes_serve_files_raw() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path(), "all.log", "hour.log", "day.log");
        store.prepare().unwrap();
        std::fs::write(store.path(LogKind::Raw), "100 23.5\n").unwrap();
        std::fs::write(store.path(LogKind::Daily), "200 1\n").unwrap();

        let router = log_routes(store, StaticFiles::default());
        assert_eq!(router.route_count(), 3);
        assert_eq!(router.dispatch(&get("/all")), Response::raw(b"100 23.5\n".to_vec()));
        assert_eq!(router.dispatch(&get("/hour")), Response::raw(Vec::new()));
        assert_eq!(router.dispatch(&get("/day")), Response::raw(b"200 1\n".to_vec()));
    }
}
