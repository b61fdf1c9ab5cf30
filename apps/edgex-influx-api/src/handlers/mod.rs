//! Handlers 模块

pub mod events;
pub mod health;
pub mod metrics;

pub use events::*;
pub use health::*;
pub use metrics::*;
