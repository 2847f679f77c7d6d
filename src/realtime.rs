//! Polling of GTFS-RT vehicle position feeds.

use anyhow::Context;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::fetch::{HttpClient, RetryOptions, fetch_bytes};
use crate::parser::{decode_vehicle_positions, parse_feed};
use crate::vehicles::RawVehiclePosition;

async fn fetch_feed_positions<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    retry: &RetryOptions,
) -> anyhow::Result<Vec<RawVehiclePosition>> {
    let bytes = fetch_bytes(client, url, retry)
        .await
        .with_context(|| format!("fetching realtime feed {url}"))?;
    debug!(url, bytes = bytes.len(), "Realtime feed bytes received, parsing");
    let feed = parse_feed(&bytes).with_context(|| format!("decoding realtime feed {url}"))?;
    Ok(decode_vehicle_positions(&feed))
}

/// Fetches every feed concurrently and concatenates their positions in `urls` order.
///
/// A feed that cannot be fetched or decoded is logged and contributes
/// nothing; the others are still returned.
#[tracing::instrument(skip(client, retry), fields(feeds = urls.len()))]
pub async fn fetch_vehicle_positions<C: HttpClient + ?Sized>(
    client: &C,
    urls: &[String],
    retry: &RetryOptions,
) -> Vec<RawVehiclePosition> {
    let results = join_all(urls.iter().map(|url| fetch_feed_positions(client, url, retry))).await;

    let mut positions = Vec::new();
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(feed_positions) => positions.extend(feed_positions),
            Err(e) => warn!(url = %url, error = %format!("{e:#}"), "Realtime feed unavailable"),
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::{MockClient, Step};
    use crate::parser::tests::{feed, vehicle_entity};
    use prost::Message;

    const URBAN: &str = "https://example.com/Urbain/VehiclePosition.pb";
    const SUBURBAN: &str = "https://example.com/Suburbain/VehiclePosition.pb";

    fn urls() -> Vec<String> {
        vec![URBAN.to_string(), SUBURBAN.to_string()]
    }

    #[tokio::test]
    async fn test_positions_concatenated_in_url_order() {
        let urban = feed(vec![
            vehicle_entity("U1", "T1", 43.6, 3.8),
            vehicle_entity("U2", "T2", 43.6, 3.8),
        ]);
        let suburban = feed(vec![vehicle_entity("S1", "T3", 43.7, 3.9)]);
        let client = MockClient::by_url(vec![
            (URBAN, vec![Step::ok(urban.encode_to_vec())]),
            (SUBURBAN, vec![Step::ok(suburban.encode_to_vec())]),
        ]);

        let ids: Vec<String> = fetch_vehicle_positions(&client, &urls(), &RetryOptions::fast())
            .await
            .into_iter()
            .map(|p| p.vehicle_id)
            .collect();

        assert_eq!(ids, vec!["U1", "U2", "S1"]);
    }

    #[tokio::test]
    async fn test_failed_feed_contributes_nothing() {
        let suburban = feed(vec![vehicle_entity("S1", "T3", 43.7, 3.9)]);
        let client = MockClient::by_url(vec![
            (URBAN, vec![Step::status(404)]),
            (SUBURBAN, vec![Step::ok(suburban.encode_to_vec())]),
        ]);

        let positions = fetch_vehicle_positions(&client, &urls(), &RetryOptions::fast()).await;

        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].vehicle_id, "S1");
    }

    #[tokio::test]
    async fn test_undecodable_feed_contributes_nothing() {
        let urban = feed(vec![vehicle_entity("U1", "T1", 43.6, 3.8)]);
        let client = MockClient::by_url(vec![
            (URBAN, vec![Step::ok(urban.encode_to_vec())]),
            (SUBURBAN, vec![Step::ok(vec![0xFF, 0xFE, 0x00, 0x01])]),
        ]);

        let positions = fetch_vehicle_positions(&client, &urls(), &RetryOptions::fast()).await;

        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].vehicle_id, "U1");
    }
}
