//! Remote tile sources.
//!
//! A [`UrlBuilder`] turns a tile address into a resource locator and an
//! [`AsyncHttpClient`] fetches it. Both are traits so tests can substitute
//! counting or failing implementations.

mod http;
mod types;
mod url;
mod wms;

pub use http::{AsyncHttpClient, BoxFuture, HttpResponse, ReqwestClient, DEFAULT_TIMEOUT};
pub use types::{FetchError, UrlError};
pub use url::{ProxiedUrlBuilder, TemplateUrlBuilder, UrlBuilder, DEFAULT_TEMPLATE};
pub use wms::WmsUrlBuilder;

#[cfg(test)]
pub use http::tests::MockHttpClient;
