//! Minimal HTTP frontend for the log files.
//!
//! No HTTP library is involved; the server speaks just enough HTTP/1.x for a browser or
//! a polling script to fetch the logs and the static chart page.
//!
//! - **`request`**: request line, query and header parsing
//! - **`response`**: framed and raw responses and their wire form
//! - **`router`**: the fixed route table plus static file and 404 fallbacks
//! - **`static_files`**: search-path lookup and content types
//! - **`server`**: the accept loop
//!
//! # Connection lifecycle
//!
//! ```text
//!   Accepted ──► Reading ──► Dispatching ──► Writing ──► Closed
//!                  │              │
//!                  │ no data      │ malformed request line
//!                  ▼              ▼
//!                Closed         Closed
//! ```
//!
//! Exactly one connection is in flight at any time and each gets at most one response.

pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod static_files;

pub use request::Request;
pub use response::{Response, Status};
pub use router::{log_routes, BodyMode, Handler, Router};
pub use server::{HttpServer, ServerOptions};
pub use static_files::StaticFiles;
