#![forbid(unsafe_code)]
//! Wire contract of the junkan HTTP API: error model, status mapping,
//! request/response DTOs, query parameter parsing and the OpenAPI document.

mod convert;
pub mod dto;
pub mod error_mapping;
mod errors;
pub mod openapi;
pub mod params;

pub use dto::*;
pub use error_mapping::{map_error, status_for, ApiErrorMapping, API_ERROR_SCHEMA_REF};
pub use errors::{ApiError, ApiErrorCode, UNKNOWN_REQUEST_ID};
pub use openapi::{openapi_v1_spec, RouteAccess, RouteDoc, ROUTES};
pub use params::{parse_content_list_params, parse_recommended_limit, required_param};

pub const CRATE_NAME: &str = "junkan-api";
pub const API_VERSION: &str = "v1";
