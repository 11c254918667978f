use crate::errors::ApiError;
use junkan_model::{ContentFilter, ContentStatus, ContentType};
use std::collections::BTreeMap;

pub const CONTENT_LIST_DEFAULT_LIMIT: usize = 50;
pub const CONTENT_LIST_MAX_LIMIT: usize = 200;
pub const RECOMMENDED_DEFAULT_LIMIT: usize = 3;
pub const RECOMMENDED_MAX_LIMIT: usize = 20;
pub const MAX_SEARCH_CHARS: usize = 100;

fn parse_limit(
    query: &BTreeMap<String, String>,
    default_limit: usize,
    max_limit: usize,
) -> Result<usize, ApiError> {
    let Some(raw) = query.get("limit") else {
        return Ok(default_limit);
    };
    let value = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| ApiError::invalid_param("limit", raw))?;
    if value == 0 || value > max_limit {
        return Err(ApiError::invalid_param("limit", raw));
    }
    Ok(value)
}

fn non_empty<'a>(query: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    query
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Admin content listing: `type`, `status`, `q` and `limit`.
pub fn parse_content_list_params(
    query: &BTreeMap<String, String>,
) -> Result<ContentFilter, ApiError> {
    let content_type = non_empty(query, "type")
        .map(|raw| ContentType::parse(raw).map_err(|_| ApiError::invalid_param("type", raw)))
        .transpose()?;
    let status = non_empty(query, "status")
        .map(|raw| ContentStatus::parse(raw).map_err(|_| ApiError::invalid_param("status", raw)))
        .transpose()?;
    let search = non_empty(query, "q").map(ToString::to_string);
    if let Some(q) = &search {
        if q.chars().count() > MAX_SEARCH_CHARS {
            return Err(ApiError::invalid_param("q", q));
        }
    }
    Ok(ContentFilter {
        content_type,
        status,
        search,
        limit: parse_limit(query, CONTENT_LIST_DEFAULT_LIMIT, CONTENT_LIST_MAX_LIMIT)?,
    })
}

pub fn parse_recommended_limit(query: &BTreeMap<String, String>) -> Result<usize, ApiError> {
    parse_limit(query, RECOMMENDED_DEFAULT_LIMIT, RECOMMENDED_MAX_LIMIT)
}

/// A mandatory, non-blank query value such as `token` or `code`.
pub fn required_param(query: &BTreeMap<String, String>, name: &str) -> Result<String, ApiError> {
    non_empty(query, name)
        .map(ToString::to_string)
        .ok_or_else(|| ApiError::missing_param(name))
}
