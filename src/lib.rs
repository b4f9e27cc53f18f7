pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod query;
pub mod reference;
pub mod resolve;
pub mod tools;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
