//! ChannelDock order-management client
//!
//! Lists shipments for a seller inside a date window. Listings are paged;
//! [`ChannelDockClient::query_shipments`] walks pages from 1 until a page
//! reports fewer than `page_size` items or the page cap is reached.
//!
//! A failed page ends pagination early. The items gathered so far are still
//! returned, so a flaky API degrades to a partial listing instead of an
//! aborted run.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::config::{ChannelDockConfig, Config};
use crate::envelope::{normalize, CallSite, Envelope};
use crate::error::{Error, ProtocolError, Result, TransportError};
use crate::logging::{Severity, SharedSink};
use crate::models::{DateWindow, SellerId, ShipmentPage, ShipmentRecord};
use crate::utils::{base_url, normalize_whitespace, truncate_text};

const SOURCE: &str = "channeldock";
const SHIPMENT_PATH: &str = "shipment";

/// Filters for a shipment listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentQuery {
    pub seller_id: Option<SellerId>,
    pub window: Option<DateWindow>,
    pub order_id: Option<u64>,
    pub shipment_id: Option<u64>,
}

impl ShipmentQuery {
    /// All shipments of `seller` created inside `window`
    pub fn for_seller(seller: SellerId, window: DateWindow) -> Self {
        Self {
            seller_id: Some(seller),
            window: Some(window),
            ..Default::default()
        }
    }

    pub fn with_order_id(mut self, order_id: u64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_shipment_id(mut self, shipment_id: u64) -> Self {
        self.shipment_id = Some(shipment_id);
        self
    }

    /// Query parameters for `page`, newest shipments first
    ///
    /// Filters follow the paging parameters and are only sent when set.
    pub fn to_params(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", page.to_string()),
            ("sort_attr", String::from("created_at")),
            ("sort_dir", String::from("DESC")),
        ];

        if let Some(seller) = self.seller_id {
            params.push(("seller_id", seller.to_string()));
        }
        if let Some(window) = &self.window {
            params.push(("start_date", window.start_param()));
            params.push(("end_date", window.end_param()));
        }
        if let Some(order_id) = self.order_id {
            params.push(("order_id", order_id.to_string()));
        }
        if let Some(shipment_id) = self.shipment_id {
            params.push(("id", shipment_id.to_string()));
        }
        params
    }

    fn describe(&self) -> String {
        let window = self.window.map(|w| w.to_string()).unwrap_or_default();
        format!(
            "seller_id={}, window={window}",
            self.seller_id.map(|s| s.to_string()).unwrap_or_default()
        )
    }
}

/// Anything that can list a seller's shipments for a window
#[async_trait]
pub trait ShipmentSource: Send + Sync {
    /// Shipments of `seller` created inside `window`
    ///
    /// `Empty` means the listing succeeded with no shipments.
    async fn fetch_shipments(
        &self,
        seller: SellerId,
        window: &DateWindow,
    ) -> Envelope<Vec<ShipmentRecord>>;
}

/// HTTP client for the ChannelDock center API
pub struct ChannelDockClient {
    client: Client,
    base_url: Url,
    api_key: String,
    api_secret: String,
    page_size: usize,
    max_pages: u32,
    sink: SharedSink,
}

impl ChannelDockClient {
    /// Create a client from its config section
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(
        config: &ChannelDockConfig,
        timeout: Duration,
        user_agent: &str,
        sink: SharedSink,
    ) -> Result<Self> {
        let base_url = base_url(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{e:#}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(user_agent)
            .build()
            .map_err(TransportError::Http)?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            page_size: config.page_size.max(1),
            max_pages: config.max_pages.max(1),
            sink,
        })
    }

    /// Create a client from the full application config
    pub fn from_config(config: &Config, sink: SharedSink) -> Result<Self> {
        Self::new(
            &config.channeldock,
            config.request_timeout(),
            &config.http.user_agent,
            sink,
        )
    }

    /// Fetch one page of a listing
    pub async fn fetch_page(&self, query: &ShipmentQuery, page: u32) -> Result<ShipmentPage> {
        let url = self
            .base_url
            .join(SHIPMENT_PATH)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .header("api_key", &self.api_key)
            .header("api_secret", &self.api_secret)
            .query(&query.to_params(page))
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(SHIPMENT_PATH, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(SHIPMENT_PATH, e))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint: SHIPMENT_PATH.to_string(),
                status: status.as_u16(),
                body: truncate_text(&normalize_whitespace(&body), 200),
            }
            .into());
        }

        serde_json::from_str(&body).map_err(|source| {
            Error::from(ProtocolError::MalformedJson {
                endpoint: SHIPMENT_PATH.to_string(),
                source,
            })
        })
    }

    /// Walk the listing page by page and concatenate the items
    ///
    /// Page failures are logged and end pagination; they never fail the query.
    pub async fn query_shipments(&self, query: &ShipmentQuery) -> Result<Vec<ShipmentRecord>> {
        let mut shipments = Vec::new();

        for page in 1..=self.max_pages {
            let result = match self.fetch_page(query, page).await {
                Ok(result) => result,
                Err(Error::Transport(TransportError::InvalidUrl(url))) => {
                    return Err(TransportError::InvalidUrl(url).into());
                }
                Err(e) => {
                    self.sink.record(
                        SOURCE,
                        "fetch_shipments",
                        &format!("page {page} failed, keeping {} shipments: {e}", shipments.len()),
                        Severity::Error,
                    );
                    break;
                }
            };

            let count = result.count();
            tracing::debug!(page, count, "fetched shipment page");
            shipments.extend(result.into_shipments());

            if count < self.page_size {
                break;
            }
            if page == self.max_pages {
                tracing::warn!(
                    max_pages = self.max_pages,
                    "page cap reached, listing may be incomplete"
                );
            }
        }

        Ok(shipments)
    }
}

#[async_trait]
impl ShipmentSource for ChannelDockClient {
    async fn fetch_shipments(
        &self,
        seller: SellerId,
        window: &DateWindow,
    ) -> Envelope<Vec<ShipmentRecord>> {
        let query = ShipmentQuery::for_seller(seller, *window);
        let call = CallSite::new(SOURCE, "fetch_shipments", query.describe());
        let envelope = normalize(self.sink.as_ref(), call, self.query_shipments(&query)).await;

        if let Envelope::Success(list) = &envelope {
            crate::metrics::record_shipments_fetched(list.len());
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window() -> DateWindow {
        DateWindow::for_day(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap())
    }

    #[test]
    fn test_query_params_for_seller() {
        let params = ShipmentQuery::for_seller(3477, window()).to_params(2);

        assert!(params.contains(&("page", "2".to_string())));
        assert!(params.contains(&("sort_attr", "created_at".to_string())));
        assert!(params.contains(&("sort_dir", "DESC".to_string())));
        assert!(params.contains(&("seller_id", "3477".to_string())));
        assert!(params.contains(&("start_date", "2024-03-14 00:00:00".to_string())));
        assert!(params.contains(&("end_date", "2024-03-15 00:00:00".to_string())));
        assert!(!params.iter().any(|(name, _)| *name == "order_id" || *name == "id"));
    }

    #[test]
    fn test_query_builders() {
        let query = ShipmentQuery::default()
            .with_order_id(12)
            .with_shipment_id(34);
        let params = query.to_params(1);

        assert!(params.contains(&("order_id", "12".to_string())));
        assert!(params.contains(&("id", "34".to_string())));
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_client_rejects_bad_base_url() {
        let config = ChannelDockConfig {
            base_url: "::not a url::".to_string(),
            ..Default::default()
        };
        let sink: SharedSink = std::sync::Arc::new(crate::logging::MemorySink::new());

        let result = ChannelDockClient::new(&config, Duration::from_secs(5), "test", sink);
        assert!(result.is_err());
    }
}
