//! HTTP routes
//!
//! | Route               | Handler                 |
//! |---------------------|-------------------------|
//! | `GET /BoardGames`   | [`list_board_games`]    |
//! | `GET /health`       | [`health::health`]      |
//! | `GET /ready`        | [`health::readiness`]   |
//!
//! The list route is publicly cacheable for `listing.response_cache_secs`.
//! Every other response, errors included, carries `no-cache, no-store`
//! unless its handler set a `Cache-Control` header itself.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use url::Url;

use crate::{
    error::{Error, Result},
    health,
    listing::RawListQuery,
    state::AppState,
};

/// Path of the board game listing
pub const LIST_PATH: &str = "/BoardGames";

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(LIST_PATH, get(list_board_games))
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store"),
        ))
        .with_state(state)
}

/// `GET /BoardGames`
///
/// The query string is read as raw pairs so that repeated fields are
/// reported alongside the other field errors.
pub async fn list_board_games(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response> {
    let query = RawListQuery::from_pairs(pairs);
    let endpoint = endpoint_url(&state, &headers)?;
    let page = state.listing().list(&query, &endpoint).await?;

    let max_age = state.config().listing.response_cache_secs;
    let cache_control = HeaderValue::from_str(&format!("public, max-age={}", max_age))
        .map_err(|e| Error::Internal(format!("invalid Cache-Control value: {}", e)))?;

    Ok((
        [(header::CACHE_CONTROL, cache_control)],
        page.into_response_body(),
    )
        .into_response())
}

/// Absolute URL of the list endpoint, used as the base of `self` links
///
/// `service.public_base_url` wins when configured. Otherwise the request's
/// `Host` header is used, then `localhost` on the configured port.
///
/// The `Host` header is client-controlled and echoed into the link as is.
/// Deployments reachable from the internet should set
/// `service.public_base_url`.
fn endpoint_url(state: &AppState, headers: &HeaderMap) -> Result<Url> {
    if let Some(base) = state.public_base_url() {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| Error::Internal(format!("public base URL '{}' cannot be a base", base)))?
            .pop_if_empty()
            .push(LIST_PATH.trim_start_matches('/'));
        return Ok(url);
    }

    let from_host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|host| Url::parse(&format!("http://{}{}", host, LIST_PATH)).ok());

    match from_host {
        Some(url) => Ok(url),
        None => {
            tracing::debug!("Missing or unusable Host header, linking to localhost");
            let fallback = format!(
                "http://localhost:{}{}",
                state.config().service.port,
                LIST_PATH
            );
            Url::parse(&fallback).map_err(|e| Error::Internal(format!("{}: {}", fallback, e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::datasource::{BoardGameSource, MemoryDataSource};
    use crate::record::BoardGame;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn source() -> Arc<MemoryDataSource<BoardGame>> {
        Arc::new(MemoryDataSource::new(vec![
            BoardGame::new(1, "Axis & Allies", 1981),
            BoardGame::new(2, "Citadels", 2000),
            BoardGame::new(3, "Terraforming Mars", 2016),
        ]))
    }

    fn app_with(config: Config, source: Arc<MemoryDataSource<BoardGame>>) -> Router {
        let state = AppState::new(config, BoardGameSource::Memory(source)).unwrap();
        router(state)
    }

    fn app() -> Router {
        app_with(Config::default(), source())
    }

    async fn get(app: Router, uri: &str, host: Option<&str>) -> (StatusCode, HeaderMap, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(host) = host {
            request = request.header(header::HOST, host);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    const YEAR_DESC: &str = "/BoardGames?pageIndex=0&pageSize=2&sortColumn=Year&sortOrder=DESC&filterQuery=";

    #[tokio::test]
    async fn test_list_board_games() {
        let (status, headers, body) = get(app(), YEAR_DESC, None).await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|game| game["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(body["data"][0]["name"], "Terraforming Mars");
        assert_eq!(body["pageIndex"], 0);
        assert_eq!(body["pageSize"], 2);
        assert_eq!(body["recordCount"], 3);

        let link = &body["links"][0];
        assert_eq!(link["rel"], "self");
        assert_eq!(link["type"], "GET");
        assert_eq!(
            link["href"],
            "http://localhost:8080/BoardGames?pageIndex=0&pageSize=2&sortColumn=Year&sortOrder=DESC"
        );
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");
    }

    #[tokio::test]
    async fn test_self_link_uses_host_header() {
        let (_, _, body) = get(app(), "/BoardGames?filterQuery=mars", Some("games.example.com")).await;
        assert_eq!(body["recordCount"], 1);
        assert_eq!(
            body["links"][0]["href"],
            "http://games.example.com/BoardGames?pageIndex=0&pageSize=10&sortColumn=Name&sortOrder=ASC&filterQuery=mars"
        );
    }

    #[tokio::test]
    async fn test_self_link_uses_public_base_url() {
        let mut config = Config::default();
        config.service.public_base_url = Some("https://api.example.com/v1".to_string());
        let app = app_with(config, source());

        let (_, _, body) = get(app, "/BoardGames", Some("internal:8080")).await;
        let href = body["links"][0]["href"].as_str().unwrap();
        assert!(
            href.starts_with("https://api.example.com/v1/BoardGames?"),
            "{}",
            href
        );
    }

    #[tokio::test]
    async fn test_validation_errors_are_itemised() {
        let (status, headers, body) =
            get(app(), "/BoardGames?pageSize=0&sortOrder=UP&sortColumn=Id", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let errors = body["errors"].as_object().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["pageSize"][0]["code"], "OUT_OF_RANGE");
        assert_eq!(errors["sortOrder"][0]["code"], "INVALID_SORT_ORDER");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-store");
    }

    #[tokio::test]
    async fn test_repeated_fields_are_itemised() {
        let (status, _, body) = get(app(), "/BoardGames?pageSize=1&pageSize=2", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["errors"]["pageSize"][0]["code"], "DUPLICATE_FIELD");

        let (status, _, body) =
            get(app(), "/BoardGames?filterQuery=a&filterText=b&sortColumn=Nope", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let errors = body["errors"].as_object().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["filterQuery"][0]["code"], "DUPLICATE_FIELD");
        assert_eq!(errors["sortColumn"][0]["code"], "INVALID_COLUMN");
    }

    #[tokio::test]
    async fn test_filter_text_alias_and_unknown_keys() {
        let (status, _, body) =
            get(app(), "/BoardGames?filterText=AXIS&utm_source=mail", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recordCount"], 1);
        assert_eq!(body["data"][0]["id"], 1);
    }

    #[tokio::test]
    async fn test_unknown_column_is_rejected() {
        let (status, _, body) = get(app(), "/BoardGames?sortColumn=Publisher", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["sortColumn"][0]["code"], "INVALID_COLUMN");
    }

    #[tokio::test]
    async fn test_data_source_outage_is_503() {
        let source = source();
        source.set_available(false);
        let (status, headers, body) = get(app_with(Config::default(), source), YEAR_DESC, None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "The service is temporarily unavailable");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-store");
    }

    #[tokio::test]
    async fn test_health_routes_are_not_cacheable() {
        let (status, headers, body) = get(app(), "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-store");

        let (status, _, body) = get(app(), "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
    }

    #[tokio::test]
    async fn test_response_cache_secs_is_configurable() {
        let mut config = Config::default();
        config.listing.response_cache_secs = 5;
        let (_, headers, _) = get(app_with(config, source()), "/BoardGames", None).await;
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=5");
    }
}
