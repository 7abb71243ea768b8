//! DHL eCommerce portal client
//!
//! Three calls make up a hand-in: `login` opens a cookie session, `scan`
//! validates one barcode, `hand_in` submits the validated barcodes as one
//! batch. All three return an [`Envelope`]; transport faults and refusals
//! both end up as `Failure`, with the category telling them apart.
//!
//! Requests are paced by a governor rate limiter. There is no retry: a
//! failed run is picked up by the next trigger.

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{COOKIE, SET_COOKIE},
    Client,
};
use serde::Serialize;
use std::num::NonZeroU32;
use std::time::Duration;
use url::Url;

use super::cookies::CookieJar;
use super::models::{
    rejection_key, Credentials, HandInRequest, HandInResult, ScanRequest, ScanResult,
};
use super::session::SessionHandle;
use crate::config::{CarrierConfig, Config};
use crate::envelope::{normalize, CallSite, Envelope, ErrorDetail};
use crate::error::{Error, ErrorCategory, RejectionError, Result, TransportError};
use crate::logging::{Severity, SharedSink};
use crate::utils::{base_url, normalize_whitespace, truncate_text};

const SOURCE: &str = "dhl";
const XSRF_HEADER: &str = "x-xsrf-token";

/// Operations of a parcel carrier portal
#[async_trait]
pub trait CarrierPortal: Send + Sync {
    /// Open a session
    async fn login(&self, credentials: &Credentials) -> Envelope<SessionHandle>;

    /// Validate one barcode within a session
    async fn scan(&self, session: &SessionHandle, barcode: &str) -> Envelope<ScanResult>;

    /// Submit validated barcodes as one batch
    async fn hand_in(
        &self,
        session: &SessionHandle,
        barcodes: &[String],
        contact_email: &str,
    ) -> Envelope<HandInResult>;
}

/// Raw answer of a portal call that reached the server
#[derive(Debug, Clone)]
struct PortalReply {
    body: serde_json::Value,
    set_cookies: Vec<String>,
}

impl crate::envelope::Emptiness for PortalReply {
    fn is_empty_result(&self) -> bool {
        false
    }
}

/// HTTP client for the DHL eCommerce portal
pub struct DhlClient {
    client: Client,
    base_url: Url,
    login_path: String,
    scan_path: String,
    handin_path: String,
    parcel_kind: String,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    sink: SharedSink,
}

impl DhlClient {
    /// Create a client from its config section
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(
        config: &CarrierConfig,
        timeout: Duration,
        user_agent: &str,
        sink: SharedSink,
    ) -> Result<Self> {
        let base_url =
            base_url(&config.base_url).map_err(|e| TransportError::InvalidUrl(format!("{e:#}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(user_agent)
            .build()
            .map_err(TransportError::Http)?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            base_url,
            login_path: config.login_path.clone(),
            scan_path: config.scan_path.clone(),
            handin_path: config.handin_path.clone(),
            parcel_kind: config.parcel_kind.clone(),
            rate_limiter,
            sink,
        })
    }

    /// Create a client from the full application config
    pub fn from_config(config: &Config, sink: SharedSink) -> Result<Self> {
        Self::new(
            &config.carrier,
            config.request_timeout(),
            &config.http.user_agent,
            sink,
        )
    }

    /// POST a JSON body, attaching the session when given
    ///
    /// Non-success statuses are transport faults unless the body carries a
    /// rejection key, in which case the reply is handed back for inspection.
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        session: Option<&SessionHandle>,
    ) -> Result<PortalReply> {
        self.rate_limiter.until_ready().await;

        let url = self
            .base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(format!("{path}: {e}")))?;

        let mut request = self.client.post(url).json(body);
        if let Some(session) = session {
            request = request
                .header(COOKIE, session.cookie_header())
                .header(XSRF_HEADER, session.token());
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(path, e))?;

        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(path, e))?;

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| serde_json::Value::String(text.clone()))
        };

        if !status.is_success() && rejection_key(&body).is_none() {
            return Err(TransportError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: truncate_text(&normalize_whitespace(&text), 200),
            }
            .into());
        }

        Ok(PortalReply { body, set_cookies })
    }

    /// Turn a refusal into a failure, logging it at `severity`
    fn refuse<T>(&self, call: &CallSite, rejection: RejectionError, severity: Severity) -> Envelope<T> {
        tracing::debug!(operation = %call.operation, key = rejection.key(), "carrier refused request");
        let detail = ErrorDetail::at(call, ErrorCategory::Rejection, Error::from(rejection).to_string());
        self.sink
            .record(SOURCE, &call.operation, &detail.to_string(), severity);
        Envelope::Failure(detail)
    }
}

#[async_trait]
impl CarrierPortal for DhlClient {
    async fn login(&self, credentials: &Credentials) -> Envelope<SessionHandle> {
        let call = CallSite::new(SOURCE, "login", format!("email={}", credentials.email));
        let reply = normalize(
            self.sink.as_ref(),
            call.clone(),
            self.post_json(&self.login_path, credentials, None),
        )
        .await;

        let reply = match reply {
            Envelope::Success(reply) => reply,
            Envelope::Empty => return Envelope::Empty,
            Envelope::Failure(detail) => return Envelope::Failure(detail),
        };

        // Bad credentials are an expected condition, not an outage.
        if let Some(key) = rejection_key(&reply.body) {
            return self.refuse(&call, RejectionError::Login { key }, Severity::Info);
        }

        let jar = CookieJar::from_set_cookie(reply.set_cookies.iter().map(String::as_str));
        let session = normalize(self.sink.as_ref(), call, async {
            SessionHandle::from_jar(jar)
        })
        .await;

        if session.is_success() {
            tracing::debug!(email = %credentials.email, "carrier session opened");
        }
        session
    }

    async fn scan(&self, session: &SessionHandle, barcode: &str) -> Envelope<ScanResult> {
        let call = CallSite::new(SOURCE, "scan", format!("barcode={barcode}"));
        let reply = normalize(
            self.sink.as_ref(),
            call.clone(),
            self.post_json(&self.scan_path, &ScanRequest { barcode }, Some(session)),
        )
        .await;

        let envelope = match reply {
            Envelope::Success(reply) => match rejection_key(&reply.body) {
                Some(key) => self.refuse(
                    &call,
                    RejectionError::Scan {
                        barcode: barcode.to_string(),
                        key,
                    },
                    Severity::Error,
                ),
                None => Envelope::Success(ScanResult {
                    barcode: barcode.to_string(),
                    response: reply.body,
                }),
            },
            Envelope::Empty => Envelope::Empty,
            Envelope::Failure(detail) => Envelope::Failure(detail),
        };

        crate::metrics::record_scan(&envelope);
        envelope
    }

    async fn hand_in(
        &self,
        session: &SessionHandle,
        barcodes: &[String],
        contact_email: &str,
    ) -> Envelope<HandInResult> {
        let call = CallSite::new(
            SOURCE,
            "hand_in",
            format!("parcels={}, receipt={contact_email}", barcodes.len()),
        );
        let request = HandInRequest::new(barcodes, &self.parcel_kind, contact_email);
        let reply = normalize(
            self.sink.as_ref(),
            call.clone(),
            self.post_json(&self.handin_path, &request, Some(session)),
        )
        .await;

        let envelope = match reply {
            Envelope::Success(reply) => match rejection_key(&reply.body) {
                Some(key) => self.refuse(
                    &call,
                    RejectionError::HandIn {
                        parcels: barcodes.len(),
                        key,
                    },
                    Severity::Error,
                ),
                None => Envelope::Success(HandInResult {
                    parcels: barcodes.len(),
                    response: reply.body,
                }),
            },
            Envelope::Empty => Envelope::Empty,
            Envelope::Failure(detail) => Envelope::Failure(detail),
        };

        crate::metrics::record_hand_in(&envelope);
        envelope
    }
}
