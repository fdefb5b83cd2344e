//! Request and response bodies of the resolution protocol.

use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::criteria::Criteria;

pub const APPLY_CONDITIONS_PATH: &str = "/permissions/apply-conditions";
pub const RESOLVE_FILTERS_PATH: &str = "/permissions/resolve-filters";

/// Body of `POST /permissions/apply-conditions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyConditionsRequest {
    pub resource_ref: String,
    pub resource_type: String,
    pub conditions: Criteria<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyConditionsResponse {
    pub allowed: bool,
}

/// Body of `POST /permissions/resolve-filters`.
///
/// `resource_ref` is optional: lowering never needs the resource, but when a
/// reference is given the endpoint still checks that it exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveFiltersRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ref: Option<String>,
    pub resource_type: String,
    pub filters: Criteria<Condition>,
}

/// Body of every non-2xx response from the resolution endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable machine-readable kind, e.g. `RESOURCE_NOT_FOUND`.
    pub code: String,
    pub message: String,
}
