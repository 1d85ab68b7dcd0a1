//! Paginated, filterable, sortable listing
//!
//! Request flow:
//!
//! 1. [`RawListQuery::validate`] checks the query string against the
//!    [`ListingRules`] and the [`ColumnValidator`] allow-list.
//! 2. [`CacheKey::derive`] encodes the validated [`QueryParameters`].
//! 3. [`ResultCache::get_or_compute`](crate::cache::ResultCache::get_or_compute)
//!    returns the cached page or runs the [`QueryEngine`].
//! 4. The engine counts matching records fresh on every request.
//! 5. [`ResponseAssembler`] builds the [`PageResult`] with its `self` link.
//!
//! [`ListingService`] runs the whole flow.

pub mod assembler;
pub mod engine;
pub mod key;
pub mod params;
pub mod service;
pub mod validators;

pub use assembler::{Link, ListResponse, PageResult, ResponseAssembler};
pub use engine::QueryEngine;
pub use key::CacheKey;
pub use params::{ListingRules, QueryParameters, RawListQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use service::ListingService;
pub use validators::{validate_sort_order, ColumnValidator};
