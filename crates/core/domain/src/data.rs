/// EdgeX 上报的单条读数。
///
/// `value` 始终是文本，真实类型需由推断得出。
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device: String,
    pub name: String,
    pub id: String,
    pub value: String,
    /// 采集时间（毫秒级 Unix 时间戳，UTC）。
    pub origin: i64,
}

/// 同一设备一次上报的读数集合。
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub device: String,
    pub readings: Vec<Reading>,
}

impl Event {
    pub fn new(device: impl Into<String>, readings: Vec<Reading>) -> Self {
        Self {
            device: device.into(),
            readings,
        }
    }
}

/// 读数值的推断结果。
#[derive(Debug, Clone, PartialEq)]
pub enum InferredValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl InferredValue {
    /// 类型名（用于日志）。
    pub fn kind(&self) -> &'static str {
        match self {
            InferredValue::Bool(_) => "bool",
            InferredValue::Int(_) => "int",
            InferredValue::Float(_) => "float",
            InferredValue::Str(_) => "string",
        }
    }
}

impl std::fmt::Display for InferredValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferredValue::Bool(v) => write!(f, "{}", v),
            InferredValue::Int(v) => write!(f, "{}", v),
            InferredValue::Float(v) => write!(f, "{}", v),
            InferredValue::Str(v) => write!(f, "{}", v),
        }
    }
}
