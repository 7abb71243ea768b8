//! Carrier portal request and response payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::Emptiness;

/// Login credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ScanRequest<'a> {
    pub barcode: &'a str,
}

/// Shipper block of a hand-in; the portal fills it from the account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipper {
    pub name: String,
    pub street: String,
    pub house_number: String,
    pub postal_code: String,
    pub city: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandInParcel {
    /// Client-generated parcel id
    pub id: String,
    pub parcel_kind: String,
    pub receiver_name: String,
    pub barcode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub email: String,
}

/// Batch hand-in submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandInRequest {
    pub shipper: Shipper,
    pub parcels: Vec<HandInParcel>,
    pub receipt: Receipt,
}

impl HandInRequest {
    /// One parcel per barcode, in order, each with a fresh id
    pub fn new(barcodes: &[String], parcel_kind: &str, contact_email: &str) -> Self {
        let parcels = barcodes
            .iter()
            .map(|barcode| HandInParcel {
                id: Uuid::new_v4().to_string(),
                parcel_kind: parcel_kind.to_string(),
                receiver_name: String::new(),
                barcode: barcode.clone(),
            })
            .collect();

        Self {
            shipper: Shipper::default(),
            parcels,
            receipt: Receipt {
                email: contact_email.to_string(),
            },
        }
    }
}

/// Accepted barcode validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub barcode: String,
    /// Raw portal response
    pub response: serde_json::Value,
}

// An accepted scan is a success even when the portal sends no body.
impl Emptiness for ScanResult {
    fn is_empty_result(&self) -> bool {
        false
    }
}

/// Accepted hand-in submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandInResult {
    pub parcels: usize,
    pub response: serde_json::Value,
}

impl Emptiness for HandInResult {
    fn is_empty_result(&self) -> bool {
        false
    }
}

/// Error indicator of a carrier response
///
/// A JSON object carrying a `key` field is a refusal, whatever the HTTP status.
pub fn rejection_key(body: &serde_json::Value) -> Option<String> {
    match body.get("key")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(key) => Some(key.clone()),
        other => Some(other.to_string()),
    }
}
