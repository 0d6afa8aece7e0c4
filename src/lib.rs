pub mod config;
pub mod errors;
pub mod logging;
pub mod plan;
pub mod review;
pub mod session;
pub mod store;
pub mod ui;
