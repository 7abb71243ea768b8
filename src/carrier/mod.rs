//! Parcel carrier portal (DHL eCommerce)
//!
//! - [`cookies`] - Set-Cookie splitting and the request cookie jar
//! - [`session`] - authenticated session handle
//! - [`models`] - request and response payloads
//! - [`client`] - HTTP client implementing [`CarrierPortal`]

pub mod client;
pub mod cookies;
pub mod models;
pub mod session;

pub use client::{CarrierPortal, DhlClient};
pub use cookies::{split_set_cookie_header, CookieJar};
pub use models::{Credentials, HandInRequest, HandInResult, ScanResult};
pub use session::{SessionHandle, XSRF_COOKIE};
