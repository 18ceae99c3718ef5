//! Page-based pagination for admin listings.
//!
//! Query strings look like `?page=2&limit=25`. Both values are optional and
//! empty strings are treated as absent, so `?page=&limit=` falls back to the
//! defaults.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.trim().parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number, 1-indexed
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    /// Items per page (1-100, default 20)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
}

impl PageParams {
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[must_use]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    /// Builds the response metadata for a page of this query.
    #[must_use]
    pub fn meta(&self, total: i64) -> PageMeta {
        let limit = self.limit();
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        PageMeta {
            total,
            page: self.page(),
            limit,
            total_pages,
            has_more: self.offset() + limit < total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

/// A page of items with its metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_LIMIT);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_offset_from_page() {
        let params = PageParams {
            page: Some(3),
            limit: Some(25),
        };
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn test_limit_clamped() {
        let high = PageParams {
            page: None,
            limit: Some(500),
        };
        let low = PageParams {
            page: Some(-4),
            limit: Some(0),
        };
        assert_eq!(high.limit(), MAX_LIMIT);
        assert_eq!(low.limit(), 1);
        assert_eq!(low.page(), 1);
    }

    #[test]
    fn test_meta_last_page() {
        let params = PageParams {
            page: Some(3),
            limit: Some(10),
        };
        let meta = params.meta(25);
        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_more);

        let first = PageParams {
            page: Some(1),
            limit: Some(10),
        }
        .meta(25);
        assert!(first.has_more);
    }

    #[test]
    fn test_meta_empty() {
        let meta = PageParams::default().meta(0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_more);
    }

    #[test]
    fn test_deserialize_empty_strings() {
        let params: PageParams = serde_json::from_str(r#"{"page":"","limit":""}"#).unwrap();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_deserialize_values() {
        let params: PageParams = serde_json::from_str(r#"{"page":"2","limit":"5"}"#).unwrap();
        assert_eq!(params.offset(), 5);
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let meta = PageParams::default().meta(45);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["hasMore"], true);
    }
}
