pub mod catalog;
pub mod config;
pub mod fetch;
pub mod geo;
pub mod osm;
pub mod output;
pub mod parser;
pub mod paths;
pub mod realtime;
pub mod reconcile;
pub mod schedule;
pub mod snapshot;
pub mod stats;
pub mod vehicles;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
