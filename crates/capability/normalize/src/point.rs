use crate::BuildError;
use crate::infer::infer_value;
use crate::timestamp::convert_origin;
use domain::{InferredValue, Point, Reading, WritePrecision};
use std::collections::BTreeMap;

/// 序列键（measurement + tags）最大长度。
pub const MAX_SERIES_KEY_LEN: usize = 65_535;

/// 可写入的最早时间（纳秒）。
pub const MIN_NANO_TIME: i64 = i64::MIN + 2;
/// 可写入的最晚时间（纳秒）。
pub const MAX_NANO_TIME: i64 = i64::MAX - 1;

const ID_TAG: &str = "id";

/// 单条读数转换为时序点。
///
/// measurement = device，tags = {id}，fields = {name: 推断值}，timestamp = origin 换算。
/// 空 id 不写入 tag。
pub fn build_point(reading: &Reading) -> Result<Point, BuildError> {
    if reading.device.is_empty() {
        return Err(BuildError::EmptyMeasurement);
    }
    if reading.name.is_empty() {
        return Err(BuildError::EmptyFieldName);
    }
    if reading.name == "time" {
        return Err(BuildError::InvalidFieldName(reading.name.clone()));
    }
    check_identifier("device", &reading.device)?;
    check_identifier("name", &reading.name)?;
    check_identifier("id", &reading.id)?;

    let timestamp = convert_origin(reading.origin);
    let nanos = timestamp.in_precision(WritePrecision::Nanoseconds);
    if nanos < i128::from(MIN_NANO_TIME) || nanos > i128::from(MAX_NANO_TIME) {
        return Err(BuildError::TimeOutOfRange(nanos));
    }

    let value = infer_value(&reading.value);
    if let InferredValue::Float(v) = value {
        if !v.is_finite() {
            return Err(BuildError::NonFiniteFloat {
                field: reading.name.clone(),
                value: v,
            });
        }
    }

    let mut tags = BTreeMap::new();
    if !reading.id.is_empty() {
        tags.insert(ID_TAG.to_string(), reading.id.clone());
    }
    let key_len = series_key_len(&reading.device, &tags);
    if key_len > MAX_SERIES_KEY_LEN {
        return Err(BuildError::KeyTooLong(key_len));
    }

    let mut fields = BTreeMap::new();
    fields.insert(reading.name.clone(), value);

    Ok(Point {
        measurement: reading.device.clone(),
        tags,
        fields,
        timestamp,
    })
}

/// 行协议无法转义换行，结尾的反斜杠会吞掉后面的分隔符。
fn check_identifier(part: &'static str, value: &str) -> Result<(), BuildError> {
    if value.contains(['\n', '\r']) || value.ends_with('\\') {
        return Err(BuildError::UnrepresentableIdentifier {
            part,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn series_key_len(measurement: &str, tags: &BTreeMap<String, String>) -> usize {
    tags.iter().fold(measurement.len(), |len, (key, value)| {
        len + 2 + key.len() + value.len()
    })
}
