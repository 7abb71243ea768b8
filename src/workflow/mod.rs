//! Hand-in workflow
//!
//! Drives each configured seller through
//! `fetch shipments -> login -> scan all -> hand in`, strictly one seller
//! after another. A seller with nothing due ends as a no-op. Any failed
//! call stops that seller; the remaining sellers are still attempted and
//! the failure is reported once the run is over.
//!
//! Scanning is all-or-nothing: one refused barcode means no hand-in for the
//! seller, so the carrier never holds a partial batch.

mod report;

pub use report::{RunReport, SellerOutcome, SellerReport, Stage, DONE, NO_SHIPMENTS};

use chrono::Local;
use std::sync::Arc;

use crate::carrier::{CarrierPortal, Credentials};
use crate::channeldock::ShipmentSource;
use crate::config::Config;
use crate::envelope::{Envelope, ErrorDetail};
use crate::error::{ErrorCategory, ProtocolError};
use crate::logging::{Severity, SharedSink};
use crate::models::{DateWindow, SellerId};

const SOURCE: &str = "index";

/// Orchestrates a full hand-in run over all sellers
pub struct HandInWorkflow {
    source: Arc<dyn ShipmentSource>,
    carrier: Arc<dyn CarrierPortal>,
    credentials: Credentials,
    contact_email: String,
    sellers: Vec<SellerId>,
    sink: SharedSink,
}

impl HandInWorkflow {
    pub fn new(
        source: Arc<dyn ShipmentSource>,
        carrier: Arc<dyn CarrierPortal>,
        credentials: Credentials,
        contact_email: impl Into<String>,
        sellers: Vec<SellerId>,
        sink: SharedSink,
    ) -> Self {
        Self {
            source,
            carrier,
            credentials,
            contact_email: contact_email.into(),
            sellers,
            sink,
        }
    }

    /// Wire the workflow to the given clients using the application config
    pub fn from_config(
        config: &Config,
        source: Arc<dyn ShipmentSource>,
        carrier: Arc<dyn CarrierPortal>,
        sink: SharedSink,
    ) -> Self {
        Self::new(
            source,
            carrier,
            Credentials::new(&config.carrier.email, &config.carrier.password),
            config.carrier.contact_email(),
            config.workflow.seller_ids.clone(),
            sink,
        )
    }

    pub fn sellers(&self) -> &[SellerId] {
        &self.sellers
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Run every seller in order and collect the outcomes
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::new(Local::now());

        for &seller in &self.sellers {
            // one clock sample per seller, both bounds derived from it
            let window = DateWindow::today();
            let outcome = self.run_seller(seller, &window).await;
            report.push(seller, window, outcome);
        }

        report.finish(Local::now());
        crate::metrics::record_run(report.outcome_label(), report.elapsed_secs());
        tracing::info!(
            sellers = report.sellers.len(),
            handed_in = report.handed_in(),
            outcome = report.outcome_label(),
            "hand-in run finished"
        );
        report
    }

    /// Run the state machine for one seller
    pub async fn run_seller(&self, seller: SellerId, window: &DateWindow) -> SellerOutcome {
        let shipments = match self.source.fetch_shipments(seller, window).await {
            Envelope::Success(shipments) => shipments,
            Envelope::Empty => {
                self.sink.record(
                    SOURCE,
                    "run",
                    &format!("No shipments found for seller {seller}"),
                    Severity::Info,
                );
                return SellerOutcome::NoShipments;
            }
            // already logged by the listing; nothing can be handed in
            Envelope::Failure(detail) => {
                tracing::warn!(seller, %detail, "shipment listing failed, skipping seller");
                return SellerOutcome::NoShipments;
            }
        };

        let session = match self.carrier.login(&self.credentials).await.require("login") {
            Ok(session) => session,
            Err(detail) => return SellerOutcome::failed(Stage::Login, detail, Vec::new()),
        };

        let mut scanned: Vec<String> = Vec::with_capacity(shipments.len());
        for shipment in &shipments {
            let Some(barcode) = shipment.tracking_code() else {
                let err = ProtocolError::MissingTrackingCode {
                    shipment: shipment.label(),
                };
                self.sink
                    .record(SOURCE, "scan", &err.to_string(), Severity::Error);
                let detail = ErrorDetail {
                    message: err.to_string(),
                    category: ErrorCategory::Protocol,
                    operation: String::from("scan"),
                    arguments: shipment.label(),
                };
                self.report_unsubmitted(seller, &scanned);
                return SellerOutcome::failed(Stage::Scan, detail, scanned);
            };

            match self.carrier.scan(&session, barcode).await.require("scan") {
                Ok(_) => scanned.push(barcode.to_string()),
                Err(detail) => {
                    self.report_unsubmitted(seller, &scanned);
                    return SellerOutcome::failed(Stage::Scan, detail, scanned);
                }
            }
        }

        if scanned.is_empty() {
            return SellerOutcome::NoShipments;
        }

        match self
            .carrier
            .hand_in(&session, &scanned, &self.contact_email)
            .await
            .require("hand_in")
        {
            Ok(result) => {
                self.sink.record(
                    SOURCE,
                    "hand_in",
                    &format!("Handed in {} parcels for seller {seller}", result.parcels),
                    Severity::Info,
                );
                SellerOutcome::HandedIn { barcodes: scanned }
            }
            Err(detail) => {
                self.report_unsubmitted(seller, &scanned);
                SellerOutcome::failed(Stage::HandIn, detail, scanned)
            }
        }
    }

    fn report_unsubmitted(&self, seller: SellerId, scanned: &[String]) {
        if scanned.is_empty() {
            return;
        }
        self.sink.record(
            SOURCE,
            "hand_in",
            &format!(
                "seller {seller}: scanned but not submitted: {}",
                scanned.join(", ")
            ),
            Severity::Warning,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::{CookieJar, HandInResult, ScanResult, SessionHandle};
    use crate::envelope::CallSite;
    use crate::logging::MemorySink;
    use crate::models::ShipmentRecord;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FakeSource {
        shipments: Vec<ShipmentRecord>,
    }

    #[async_trait]
    impl ShipmentSource for FakeSource {
        async fn fetch_shipments(
            &self,
            _seller: SellerId,
            _window: &DateWindow,
        ) -> Envelope<Vec<ShipmentRecord>> {
            if self.shipments.is_empty() {
                Envelope::Empty
            } else {
                Envelope::Success(self.shipments.clone())
            }
        }
    }

    #[derive(Default)]
    struct FakeCarrier {
        refuse_login: bool,
        refuse: HashSet<String>,
        logins: Mutex<usize>,
        scans: Mutex<Vec<String>>,
        hand_ins: Mutex<Vec<Vec<String>>>,
    }

    fn refused<T>(operation: &str) -> Envelope<T> {
        let call = CallSite::new("dhl", operation, "");
        Envelope::Failure(ErrorDetail::at(&call, ErrorCategory::Rejection, "refused"))
    }

    #[async_trait]
    impl CarrierPortal for FakeCarrier {
        async fn login(&self, _credentials: &Credentials) -> Envelope<SessionHandle> {
            *self.logins.lock().unwrap() += 1;
            if self.refuse_login {
                return refused("login");
            }
            let jar = CookieJar::parse_header("XSRF-TOKEN=tok");
            Envelope::Success(SessionHandle::from_jar(jar).unwrap())
        }

        async fn scan(&self, _session: &SessionHandle, barcode: &str) -> Envelope<ScanResult> {
            self.scans.lock().unwrap().push(barcode.to_string());
            if self.refuse.contains(barcode) {
                return refused("scan");
            }
            Envelope::Success(ScanResult {
                barcode: barcode.to_string(),
                response: serde_json::Value::Null,
            })
        }

        async fn hand_in(
            &self,
            _session: &SessionHandle,
            barcodes: &[String],
            _contact_email: &str,
        ) -> Envelope<HandInResult> {
            self.hand_ins.lock().unwrap().push(barcodes.to_vec());
            Envelope::Success(HandInResult {
                parcels: barcodes.len(),
                response: serde_json::Value::Null,
            })
        }
    }

    fn shipments(codes: &[&str]) -> Vec<ShipmentRecord> {
        codes
            .iter()
            .enumerate()
            .map(|(i, code)| ShipmentRecord {
                id: Some(i as u64 + 1),
                track_and_trace: Some(code.to_string()),
                ..Default::default()
            })
            .collect()
    }

    fn workflow(
        source: FakeSource,
        carrier: Arc<FakeCarrier>,
        sink: Arc<MemorySink>,
    ) -> HandInWorkflow {
        HandInWorkflow::new(
            Arc::new(source),
            carrier,
            Credentials::new("ops@example.com", "secret"),
            "ops@example.com",
            vec![3477],
            sink,
        )
    }

    #[tokio::test]
    async fn test_no_shipments_skips_login() {
        let carrier = Arc::new(FakeCarrier::default());
        let sink = Arc::new(MemorySink::new());
        let flow = workflow(FakeSource { shipments: vec![] }, carrier.clone(), sink.clone());

        let report = flow.run().await;

        assert_eq!(report.summary().unwrap(), NO_SHIPMENTS);
        assert_eq!(*carrier.logins.lock().unwrap(), 0);
        assert!(sink.with_severity(Severity::Error).is_empty());
    }

    #[tokio::test]
    async fn test_all_scans_lead_to_one_hand_in() {
        let carrier = Arc::new(FakeCarrier::default());
        let sink = Arc::new(MemorySink::new());
        let source = FakeSource {
            shipments: shipments(&["A1", "B2", "C3"]),
        };
        let flow = workflow(source, carrier.clone(), sink);

        let report = flow.run().await;

        assert_eq!(report.summary().unwrap(), DONE);
        let hand_ins = carrier.hand_ins.lock().unwrap();
        assert_eq!(hand_ins.len(), 1);
        assert_eq!(hand_ins[0], vec!["A1", "B2", "C3"]);
    }

    #[tokio::test]
    async fn test_refused_scan_blocks_hand_in() {
        let carrier = Arc::new(FakeCarrier {
            refuse: HashSet::from(["B2".to_string()]),
            ..Default::default()
        });
        let sink = Arc::new(MemorySink::new());
        let source = FakeSource {
            shipments: shipments(&["A1", "B2", "C3"]),
        };
        let flow = workflow(source, carrier.clone(), sink.clone());

        let report = flow.run().await;

        assert!(report.summary().is_err());
        assert!(carrier.hand_ins.lock().unwrap().is_empty());
        assert_eq!(*carrier.scans.lock().unwrap(), vec!["A1", "B2"]);
        assert_eq!(
            report.sellers[0].outcome,
            SellerOutcome::Failed {
                stage: Stage::Scan,
                category: ErrorCategory::Rejection,
                reason: "refused".to_string(),
                scanned: vec!["A1".to_string()],
            }
        );
        assert!(sink.contains("scanned but not submitted: A1"));
    }

    #[tokio::test]
    async fn test_refused_login_never_scans() {
        let carrier = Arc::new(FakeCarrier {
            refuse_login: true,
            ..Default::default()
        });
        let sink = Arc::new(MemorySink::new());
        let source = FakeSource {
            shipments: shipments(&["A1"]),
        };
        let flow = workflow(source, carrier.clone(), sink);

        let report = flow.run().await;

        assert!(report.has_failures());
        assert!(carrier.scans.lock().unwrap().is_empty());
        assert!(matches!(
            report.sellers[0].outcome,
            SellerOutcome::Failed {
                stage: Stage::Login,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_tracking_code_fails_seller() {
        let carrier = Arc::new(FakeCarrier::default());
        let sink = Arc::new(MemorySink::new());
        let mut list = shipments(&["A1"]);
        list.push(ShipmentRecord {
            id: Some(9),
            ..Default::default()
        });
        let flow = workflow(FakeSource { shipments: list }, carrier.clone(), sink.clone());

        let report = flow.run().await;

        assert!(report.has_failures());
        assert!(carrier.hand_ins.lock().unwrap().is_empty());
        assert!(sink.contains("shipment 9"));
    }

    #[tokio::test]
    async fn test_failed_seller_does_not_stop_the_next() {
        let carrier = Arc::new(FakeCarrier {
            refuse: HashSet::from(["A1".to_string()]),
            ..Default::default()
        });
        let sink = Arc::new(MemorySink::new());
        let mut flow = workflow(
            FakeSource {
                shipments: shipments(&["A1"]),
            },
            carrier.clone(),
            sink,
        );
        flow.sellers = vec![3477, 1673];

        let report = flow.run().await;

        assert_eq!(report.sellers.len(), 2);
        assert_eq!(*carrier.logins.lock().unwrap(), 2);
        assert_eq!(report.failures().count(), 2);
    }
}
