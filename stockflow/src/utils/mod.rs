//! Utility functions for timestamp handling.
//!
//! Watermarks are Unix seconds as `f64`; file modification times are
//! converted to the same scale so the two compare directly.

pub mod timestamps;

pub use timestamps::{
    iso_timestamp, now_unix_seconds, parse_trade_date, system_time_to_unix_seconds,
    unix_seconds_to_timestamp, Timestamp,
};
