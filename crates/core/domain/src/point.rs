use crate::data::InferredValue;
use std::collections::BTreeMap;
use std::str::FromStr;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// UTC 时间点（秒 + 纳秒，纳秒恒在 `[0, 1e9)`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: i64,
}

impl Timestamp {
    pub fn new(seconds: i64, nanoseconds: i64) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// 按写入精度换算为整数时间戳（向下取整）。
    pub fn in_precision(&self, precision: WritePrecision) -> i128 {
        let total = i128::from(self.seconds) * i128::from(NANOS_PER_SECOND)
            + i128::from(self.nanoseconds);
        total.div_euclid(precision.nanos_per_unit())
    }
}

/// 时序点：measurement + tags + fields + timestamp。
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, InferredValue>,
    pub timestamp: Timestamp,
}

/// 写入精度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePrecision {
    #[default]
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl WritePrecision {
    /// InfluxDB `precision` 参数值。
    pub fn as_str(&self) -> &'static str {
        match self {
            WritePrecision::Nanoseconds => "ns",
            WritePrecision::Microseconds => "us",
            WritePrecision::Milliseconds => "ms",
            WritePrecision::Seconds => "s",
        }
    }

    fn nanos_per_unit(&self) -> i128 {
        match self {
            WritePrecision::Nanoseconds => 1,
            WritePrecision::Microseconds => 1_000,
            WritePrecision::Milliseconds => 1_000_000,
            WritePrecision::Seconds => 1_000_000_000,
        }
    }
}

/// 无法识别的写入精度。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown write precision: {0}")]
pub struct UnknownPrecision(pub String);

impl FromStr for WritePrecision {
    type Err = UnknownPrecision;

    /// 空字符串视为纳秒。
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" | "ns" => Ok(WritePrecision::Nanoseconds),
            "us" => Ok(WritePrecision::Microseconds),
            "ms" => Ok(WritePrecision::Milliseconds),
            "s" => Ok(WritePrecision::Seconds),
            other => Err(UnknownPrecision(other.to_string())),
        }
    }
}

/// 写入目标配置（数据库 + 精度）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub database: String,
    pub precision: WritePrecision,
}

impl SinkConfig {
    pub fn new(database: impl Into<String>, precision: WritePrecision) -> Self {
        Self {
            database: database.into(),
            precision,
        }
    }
}

/// 一次写入的点位批次。
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub config: SinkConfig,
    pub points: Vec<Point>,
}

impl Batch {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
