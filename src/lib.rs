pub mod chart;
pub mod config;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod history;
pub mod judge;
pub mod logging;
pub mod render;
pub mod session;
pub mod timeline;
