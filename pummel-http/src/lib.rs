#![forbid(unsafe_code)]

mod client;
mod error;
mod estimate;
mod tls;
mod types;
mod util;

pub use client::{HttpClient, MAX_REDIRECTS};
pub use error::{Error, HttpTransportErrorKind, Result};
pub use estimate::estimate_header_bytes;
pub use types::{ClientOptions, HttpRequest, HttpResponse, HttpVersion};
pub use util::escape_query;
