//! 读数规范化：值类型推断、时间戳换算、Reading -> Point。

mod infer;
mod point;
mod timestamp;

pub use infer::infer_value;
pub use point::{MAX_NANO_TIME, MAX_SERIES_KEY_LEN, MIN_NANO_TIME, build_point};
pub use timestamp::convert_origin;

/// 点位构造错误（仅影响单条读数）。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("missing measurement")]
    EmptyMeasurement,
    #[error("missing field name")]
    EmptyFieldName,
    #[error("invalid field name: {0}")]
    InvalidFieldName(String),
    #[error("unsupported value for field {field}: {value}")]
    NonFiniteFloat { field: String, value: f64 },
    #[error("series key too long: {0} bytes")]
    KeyTooLong(usize),
    #[error("{part} cannot contain line breaks or end with a backslash: {value:?}")]
    UnrepresentableIdentifier { part: &'static str, value: String },
    #[error("timestamp out of range: {0} ns")]
    TimeOutOfRange(i128),
}
