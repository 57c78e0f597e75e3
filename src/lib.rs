pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod storage;

// Mart definitions shared by the batch run and the query facade
pub mod marts;

// Application ports and use cases, with file/memory adapters behind them
pub mod app;
pub mod infra;
