//! Tracks how long the browser's active tab stays on each website, counts tab switches and
//! prices the time with an hourly wage.
//!
//! The browser extension launches the `sitecost-host` native messaging host, which runs the
//! [tracker]. The `sitecost` CLI reads the same [store] and renders the [dashboard].

pub mod cli;
pub mod dashboard;
pub mod host;
pub mod store;
pub mod tracker;
pub mod utils;
