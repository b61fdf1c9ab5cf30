//! InfluxDB 行协议编码
//!
//! `measurement[,tag=value...] field=value[,field=value...] timestamp`
//!
//! - measurement 转义 `,` 与空格
//! - tag key/value、field key 转义 `,`、`=` 与空格
//! - 字符串 field 加双引号，转义 `"` 与 `\`
//! - 整数带 `i` 后缀

use domain::{Batch, InferredValue, Point, WritePrecision};
use std::fmt::Write as _;

const MEASUREMENT_SPECIAL: &[char] = &[',', ' '];
const KEY_SPECIAL: &[char] = &[',', '=', ' '];

/// 编码整个批次，每个点一行。
pub fn encode_batch(batch: &Batch) -> String {
    let mut out = String::new();
    for point in &batch.points {
        out.push_str(&encode_point(point, batch.config.precision));
        out.push('\n');
    }
    out
}

/// 编码单个点。
pub fn encode_point(point: &Point, precision: WritePrecision) -> String {
    let mut line = escape(&point.measurement, MEASUREMENT_SPECIAL);
    for (key, value) in &point.tags {
        line.push(',');
        line.push_str(&escape(key, KEY_SPECIAL));
        line.push('=');
        line.push_str(&escape(value, KEY_SPECIAL));
    }
    line.push(' ');
    for (index, (key, value)) in point.fields.iter().enumerate() {
        if index > 0 {
            line.push(',');
        }
        line.push_str(&escape(key, KEY_SPECIAL));
        line.push('=');
        push_field_value(&mut line, value);
    }
    let _ = write!(line, " {}", point.timestamp.in_precision(precision));
    line
}

fn push_field_value(line: &mut String, value: &InferredValue) {
    match value {
        InferredValue::Bool(v) => {
            let _ = write!(line, "{}", v);
        }
        InferredValue::Int(v) => {
            let _ = write!(line, "{}i", v);
        }
        InferredValue::Float(v) => {
            let _ = write!(line, "{}", v);
        }
        InferredValue::Str(v) => {
            line.push('"');
            for ch in v.chars() {
                if ch == '"' || ch == '\\' {
                    line.push('\\');
                }
                line.push(ch);
            }
            line.push('"');
        }
    }
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
