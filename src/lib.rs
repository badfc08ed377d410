pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod logging;
pub mod phase;
pub mod report;
pub mod workspace;
