pub mod data;
pub mod point;

pub use data::{Event, InferredValue, Reading};
pub use point::{Batch, Point, SinkConfig, Timestamp, UnknownPrecision, WritePrecision};
