//! Turns a daily scenario-test sheet into the series a dashboard draws:
//! daily totals, the latest success/failure split and per-category NG
//! history, plus the HTML page and server that present them.

pub mod chart;
pub mod html;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod report;
pub mod server;
pub mod theme;
