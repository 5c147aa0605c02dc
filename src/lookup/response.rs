//! Interpretation of lookup-service responses
//!
//! The services are inconsistent about how a missing profile is reported, so a
//! 204, an empty success body and a "not found" `errorMessage` are all read as
//! available. Anything else that is not a profile record is an error for the
//! retry loop to absorb.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Result, SniperError};
use crate::types::{LookupResult, LookupStatus};

/// Markers the profile service puts in `errorMessage` for unknown names
const NOT_FOUND_MARKERS: &[&str] = &["couldn't find any profile", "not found"];

/// Profile record returned by both lookup services
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Error payload returned by the profile service
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

/// Classify a single profile lookup response
pub fn classify_profile(status: u16, body: &str) -> Result<LookupStatus> {
    if status == 204 {
        return Ok(LookupStatus::Available);
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        if (200..300).contains(&status) {
            return Ok(LookupStatus::Available);
        }
        return Err(SniperError::unexpected_response(
            "empty response body",
            status,
            body,
        ));
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| SniperError::parse(e.to_string(), Some(trimmed.chars().take(200).collect())))?;

    if value.is_null() && (200..300).contains(&status) {
        return Ok(LookupStatus::Available);
    }

    if let Ok(payload) = serde_json::from_value::<ErrorPayload>(value.clone()) {
        if let Some(message) = payload.error_message {
            let lower = message.to_lowercase();
            if NOT_FOUND_MARKERS.iter().any(|marker| lower.contains(marker)) {
                return Ok(LookupStatus::Available);
            }
            return Err(SniperError::unexpected_response(message, status, body));
        }
    }

    match serde_json::from_value::<ProfileRecord>(value) {
        Ok(record) if !record.id.is_empty() => Ok(LookupStatus::Claimed { id: record.id }),
        _ => Err(SniperError::unexpected_response(
            "response is neither a profile nor a not-found marker",
            status,
            body,
        )),
    }
}

/// Classify a bulk lookup response for `batch`.
///
/// Listed profiles are claimed (names compared case-insensitively); every
/// other name in the batch is available. Results keep the batch order.
pub fn classify_bulk(batch: &[String], status: u16, body: &str) -> Result<Vec<LookupResult>> {
    if !(200..300).contains(&status) {
        return Err(SniperError::unexpected_response(
            "bulk lookup rejected",
            status,
            body,
        ));
    }

    let records: Vec<ProfileRecord> = serde_json::from_str(body.trim())
        .map_err(|e| SniperError::parse(e.to_string(), Some(body.chars().take(200).collect())))?;

    let claimed: HashMap<String, String> = records
        .into_iter()
        .map(|record| (record.name.to_lowercase(), record.id))
        .collect();

    Ok(batch
        .iter()
        .map(|name| match claimed.get(&name.to_lowercase()) {
            Some(id) => LookupResult::claimed(name.clone(), id.clone()),
            None => LookupResult::available(name.clone()),
        })
        .collect())
}
