//! Overpass API access.

use tracing::{info, warn};

use super::{OverpassError, RefPaths, parse_relations};
use super::types::OverpassResponse;
use crate::fetch::{HttpClient, RetryOptions, fetch_with_retry};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Overpass QL selecting every tram route relation plus the bus route
/// relations of one network inside a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct OverpassQuery {
    /// `south,west,north,east`, as Overpass expects.
    pub bbox: String,
    pub bus_network: Option<String>,
}

impl Default for OverpassQuery {
    fn default() -> Self {
        Self {
            bbox: "43.5,3.7,43.7,4.05".to_string(),
            bus_network: Some("TaM".to_string()),
        }
    }
}

impl OverpassQuery {
    pub fn new(bbox: impl Into<String>, bus_network: Option<String>) -> Self {
        Self {
            bbox: bbox.into(),
            bus_network,
        }
    }

    pub fn render(&self) -> String {
        let mut q = String::from("[out:json];(");
        q.push_str(&format!(
            r#"relation["type"="route"]["route"="tram"]({});"#,
            self.bbox
        ));
        if let Some(network) = &self.bus_network {
            q.push_str(&format!(
                r#"relation["type"="route"]["route"="bus"]["network"="{}"]({});"#,
                network, self.bbox
            ));
        }
        q.push_str(");out body geom;");
        q
    }
}

async fn fetch_response<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    query: &OverpassQuery,
    retry: &RetryOptions,
) -> Result<OverpassResponse, OverpassError> {
    let req = reqwest::Client::new()
        .post(url)
        .form(&[("data", query.render())])
        .build()?;
    let resp = fetch_with_retry(client, req, retry).await?;
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Fetches and resolves line geometry from Overpass.
///
/// Never fails: any fetch or decode error is logged and yields an empty
/// map, which only removes OSM geometry from path building.
#[tracing::instrument(skip(client, query, retry))]
pub async fn fetch_overpass_routes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    query: &OverpassQuery,
    retry: &RetryOptions,
) -> RefPaths {
    match fetch_response(client, url, query, retry).await {
        Ok(response) => {
            let paths = parse_relations(&response);
            info!(lines = paths.len(), "Overpass geometry resolved");
            paths
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch Overpass routes");
            RefPaths::new()
        }
    }
}
