//! Per-run outcome bookkeeping

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::envelope::ErrorDetail;
use crate::error::{Error, ErrorCategory};
use crate::models::{DateWindow, SellerId};

/// Summary token of a run that handed in parcels without failures
pub const DONE: &str = "DONE";

/// Summary token of a run where no seller had anything to hand in
pub const NO_SHIPMENTS: &str = "No shipments found";

/// Step of the seller state machine at which a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Login,
    Scan,
    HandIn,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Scan => "scan",
            Self::HandIn => "hand_in",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one seller's run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SellerOutcome {
    /// Nothing due, or the listing could not be obtained
    NoShipments,

    /// Every barcode scanned and the batch was accepted
    HandedIn { barcodes: Vec<String> },

    /// The run stopped at `stage`
    Failed {
        stage: Stage,
        category: ErrorCategory,
        reason: String,
        /// Barcodes validated before the failure, never submitted
        scanned: Vec<String>,
    },
}

impl SellerOutcome {
    /// Failure at `stage` from a normalized call's detail
    pub fn failed(stage: Stage, detail: ErrorDetail, scanned: Vec<String>) -> Self {
        Self::Failed {
            stage,
            category: detail.category,
            reason: detail.message,
            scanned,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One seller's entry in a run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerReport {
    pub seller_id: SellerId,
    pub window: DateWindow,
    pub outcome: SellerOutcome,
}

impl SellerReport {
    /// Operator-facing line for a failed seller
    fn failure_line(&self) -> Option<String> {
        match &self.outcome {
            SellerOutcome::Failed { stage, reason, .. } => Some(format!(
                "seller {}: Error in DHL {stage}: {reason}",
                self.seller_id
            )),
            _ => None,
        }
    }
}

/// Outcomes of every seller attempted in one run, in processing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub sellers: Vec<SellerReport>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            sellers: Vec::new(),
        }
    }

    pub fn push(&mut self, seller_id: SellerId, window: DateWindow, outcome: SellerOutcome) {
        self.sellers.push(SellerReport {
            seller_id,
            window,
            outcome,
        });
    }

    pub fn finish(&mut self, at: DateTime<Local>) {
        self.finished_at = at;
    }

    pub fn failures(&self) -> impl Iterator<Item = &SellerReport> {
        self.sellers.iter().filter(|s| s.outcome.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Total barcodes accepted by the carrier in this run
    pub fn handed_in(&self) -> usize {
        self.sellers
            .iter()
            .map(|s| match &s.outcome {
                SellerOutcome::HandedIn { barcodes } => barcodes.len(),
                _ => 0,
            })
            .sum()
    }

    /// Metric label for this run
    pub fn outcome_label(&self) -> &'static str {
        if self.has_failures() {
            "failed"
        } else if self.handed_in() > 0 {
            "done"
        } else {
            "no_shipments"
        }
    }

    /// Collapse the report into the trigger's answer
    ///
    /// Any failed seller fails the run, after every seller was attempted.
    ///
    /// # Errors
    ///
    /// Returns the failure lines of every failed seller, joined
    pub fn summary(&self) -> Result<&'static str, Error> {
        let failures: Vec<String> = self.sellers.iter().filter_map(|s| s.failure_line()).collect();
        if !failures.is_empty() {
            return Err(Error::other(failures.join("; ")));
        }

        if self.handed_in() > 0 {
            Ok(DONE)
        } else {
            Ok(NO_SHIPMENTS)
        }
    }

    /// Duration of the run in seconds
    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or_default()
    }
}
