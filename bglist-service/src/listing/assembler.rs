//! Response assembly
//!
//! Combines a page of records, the request's parameters and a fresh total
//! count into the outward payload:
//!
//! ```json
//! {
//!   "data": [ { "id": 3, "name": "Terraforming Mars", ... } ],
//!   "pageIndex": 0,
//!   "pageSize": 2,
//!   "recordCount": 3,
//!   "links": [
//!     { "href": "http://localhost:8080/BoardGames?pageIndex=0&pageSize=2&sortColumn=Year&sortOrder=DESC",
//!       "rel": "self", "type": "GET" }
//!   ]
//! }
//! ```

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::error::{Error, Result};
use crate::listing::params::QueryParameters;
use crate::record::{Record, SortColumn};

/// Navigation link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(rename = "type")]
    pub method: String,
}

impl Link {
    pub fn new(href: impl Into<String>, rel: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            method: method.into(),
        }
    }
}

/// One assembled page, before serialisation
#[derive(Debug, Clone)]
pub struct PageResult<R> {
    pub data: Arc<[R]>,
    pub page_index: u32,
    pub page_size: u32,
    pub total_record_count: u64,
    pub self_link: Link,
}

impl<R> PageResult<R> {
    pub fn into_response_body(self) -> ListResponse<R> {
        ListResponse {
            data: self.data,
            page_index: self.page_index,
            page_size: self.page_size,
            record_count: self.total_record_count,
            links: vec![self.self_link],
        }
    }
}

/// Wire payload of the list endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", bound(serialize = "R: Serialize"))]
pub struct ListResponse<R> {
    #[serde(serialize_with = "serialize_records")]
    pub data: Arc<[R]>,
    pub page_index: u32,
    pub page_size: u32,
    pub record_count: u64,
    pub links: Vec<Link>,
}

fn serialize_records<S, R>(data: &Arc<[R]>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    R: Serialize,
{
    data.as_ref().serialize(serializer)
}

impl<R: Serialize> IntoResponse for ListResponse<R> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Builds [`PageResult`]s; has no state and no side effects
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseAssembler;

impl ResponseAssembler {
    /// Assemble a page
    ///
    /// `base_url` is the endpoint URL without a query string; the self link
    /// re-encodes the canonical request parameters onto it.
    pub fn assemble<R, C>(
        data: Arc<[R]>,
        params: &QueryParameters<C>,
        total_record_count: u64,
        base_url: &Url,
    ) -> Result<PageResult<R>>
    where
        R: Record<Column = C>,
        C: SortColumn,
    {
        Ok(PageResult {
            data,
            page_index: params.page_index(),
            page_size: params.page_size(),
            total_record_count,
            self_link: Link::new(self_href(params, base_url)?, "self", "GET"),
        })
    }
}

fn self_href<C: SortColumn>(params: &QueryParameters<C>, base_url: &Url) -> Result<String> {
    if base_url.cannot_be_a_base() {
        return Err(Error::Internal(format!(
            "cannot build links from base URL '{}'",
            base_url
        )));
    }

    let mut href = base_url.clone();
    href.set_fragment(None);
    href.query_pairs_mut()
        .clear()
        .extend_pairs(params.to_query_pairs());
    Ok(href.into())
}
