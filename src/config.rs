//! Runtime settings read from the environment.
//!
//! The binary loads `.env` with `dotenvy` first, so every variable can also
//! live there.

use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::osm::{DEFAULT_OVERPASS_URL, OverpassQuery};
use crate::schedule::RouteKind;

pub const DEFAULT_URBAN_STATIC_URL: &str = "https://data.montpellier3m.fr/GTFS/Urbain/GTFS.zip";
pub const DEFAULT_SUBURBAN_STATIC_URL: &str =
    "https://data.montpellier3m.fr/GTFS/Suburbain/GTFS.zip";
pub const DEFAULT_URBAN_RT_URL: &str =
    "https://data.montpellier3m.fr/GTFS/Urbain/VehiclePosition.pb";
pub const DEFAULT_SUBURBAN_RT_URL: &str =
    "https://data.montpellier3m.fr/GTFS/Suburbain/VehiclePosition.pb";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Static archives in merge order; later entries win.
    pub static_urls: Vec<String>,
    pub realtime_urls: Vec<String>,
    pub realtime_interval: Duration,
    pub schedule_interval: Duration,
    pub overpass_url: String,
    pub overpass_query: OverpassQuery,
    /// Route kinds allowed to take their geometry from OSM.
    pub osm_route_kinds: Vec<RouteKind>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            static_urls: vec![
                DEFAULT_URBAN_STATIC_URL.to_string(),
                DEFAULT_SUBURBAN_STATIC_URL.to_string(),
            ],
            realtime_urls: vec![
                DEFAULT_URBAN_RT_URL.to_string(),
                DEFAULT_SUBURBAN_RT_URL.to_string(),
            ],
            realtime_interval: Duration::from_millis(30_000),
            schedule_interval: Duration::from_secs(86_400),
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            overpass_query: OverpassQuery::default(),
            osm_route_kinds: vec![RouteKind::Tram, RouteKind::Bus],
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or blank keys keep their default.
    ///
    /// # Errors
    ///
    /// Fails on a non-numeric interval or an unknown route kind.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        config.static_urls = vec![
            get("GTFS_URBAN_STATIC_URL").unwrap_or_else(|| DEFAULT_URBAN_STATIC_URL.to_string()),
            get("GTFS_SUBURBAN_STATIC_URL")
                .unwrap_or_else(|| DEFAULT_SUBURBAN_STATIC_URL.to_string()),
        ];
        config.realtime_urls = vec![
            get("GTFS_URBAN_RT_URL").unwrap_or_else(|| DEFAULT_URBAN_RT_URL.to_string()),
            get("GTFS_SUBURBAN_RT_URL").unwrap_or_else(|| DEFAULT_SUBURBAN_RT_URL.to_string()),
        ];

        if let Some(ms) = get("GTFS_REFRESH_INTERVAL") {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("GTFS_REFRESH_INTERVAL must be milliseconds, got {ms:?}"))?;
            config.realtime_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = get("SCHEDULE_REFRESH_INTERVAL") {
            let secs: u64 = secs.trim().parse().with_context(|| {
                format!("SCHEDULE_REFRESH_INTERVAL must be seconds, got {secs:?}")
            })?;
            config.schedule_interval = Duration::from_secs(secs);
        }

        if let Some(url) = get("OVERPASS_URL") {
            config.overpass_url = url;
        }
        if let Some(bbox) = get("OVERPASS_BBOX") {
            config.overpass_query.bbox = bbox;
        }
        if let Some(network) = get("OVERPASS_BUS_NETWORK") {
            config.overpass_query.bus_network = Some(network);
        }
        if let Some(kinds) = get("OSM_ROUTE_KINDS") {
            config.osm_route_kinds = parse_route_kinds(&kinds)?;
        }

        Ok(config)
    }
}

/// Parses a comma-separated list such as `tram,bus`. Blank items are ignored.
pub fn parse_route_kinds(list: &str) -> Result<Vec<RouteKind>> {
    let mut kinds = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some(kind) = RouteKind::parse(item) else {
            bail!("unknown route kind {item:?}, expected tram or bus");
        };
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.realtime_interval, Duration::from_secs(30));
        assert_eq!(config.overpass_query.bbox, "43.5,3.7,43.7,4.05");
        assert_eq!(config.overpass_query.bus_network.as_deref(), Some("TaM"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GTFS_URBAN_STATIC_URL", "https://example.com/a.zip"),
            ("GTFS_REFRESH_INTERVAL", "5000"),
            ("SCHEDULE_REFRESH_INTERVAL", "3600"),
            ("OVERPASS_BBOX", "1,2,3,4"),
            ("OSM_ROUTE_KINDS", "tram"),
        ]))
        .unwrap();

        assert_eq!(config.static_urls[0], "https://example.com/a.zip");
        assert_eq!(config.static_urls[1], DEFAULT_SUBURBAN_STATIC_URL);
        assert_eq!(config.realtime_interval, Duration::from_millis(5000));
        assert_eq!(config.schedule_interval, Duration::from_secs(3600));
        assert_eq!(config.overpass_query.bbox, "1,2,3,4");
        assert_eq!(config.osm_route_kinds, vec![RouteKind::Tram]);
    }

    #[test]
    fn test_blank_value_keeps_default() {
        let config = Config::from_lookup(lookup(&[("OVERPASS_URL", "  ")])).unwrap();

        assert_eq!(config.overpass_url, DEFAULT_OVERPASS_URL);
    }

    #[test]
    fn test_invalid_interval_is_an_error() {
        let err = Config::from_lookup(lookup(&[("GTFS_REFRESH_INTERVAL", "soon")])).unwrap_err();

        assert!(err.to_string().contains("GTFS_REFRESH_INTERVAL"));
    }

    #[test]
    fn test_parse_route_kinds() {
        assert_eq!(
            parse_route_kinds("bus, tram,bus,").unwrap(),
            vec![RouteKind::Bus, RouteKind::Tram]
        );
        assert!(parse_route_kinds("").unwrap().is_empty());
        assert!(parse_route_kinds("tram,metro").is_err());
    }
}
