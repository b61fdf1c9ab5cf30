use base64::{Engine as _, engine::general_purpose::STANDARD};
use domain::{InferredValue, Reading, Timestamp};
use edgex_normalize::{BuildError, MAX_NANO_TIME, MAX_SERIES_KEY_LEN, MIN_NANO_TIME, build_point};

fn reading(device: &str, name: &str, id: &str, value: &str, origin: i64) -> Reading {
    Reading {
        device: device.to_string(),
        name: name.to_string(),
        id: id.to_string(),
        value: value.to_string(),
        origin,
    }
}

#[test]
fn builds_integer_point() {
    let point = build_point(&reading("sensorA", "temp", "r1", "23", 1000)).expect("point");
    assert_eq!(point.measurement, "sensorA");
    assert_eq!(point.tags.get("id").map(String::as_str), Some("r1"));
    assert_eq!(point.tags.len(), 1);
    assert_eq!(point.fields.get("temp"), Some(&InferredValue::Int(23)));
    assert_eq!(point.fields.len(), 1);
    assert_eq!(point.timestamp, Timestamp::new(1, 0));
}

#[test]
fn string_field_keeps_raw_value() {
    let point = build_point(&reading("cam", "status", "r2", " idle ", 1500)).expect("point");
    assert_eq!(
        point.fields.get("status"),
        Some(&InferredValue::Str(" idle ".to_string()))
    );
    assert_eq!(point.timestamp, Timestamp::new(1, 500_000_000));
}

#[test]
fn empty_device_is_rejected() {
    let err = build_point(&reading("", "temp", "r1", "23", 1000)).expect_err("no measurement");
    assert_eq!(err, BuildError::EmptyMeasurement);
}

#[test]
fn empty_or_reserved_field_name_is_rejected() {
    assert_eq!(
        build_point(&reading("sensorA", "", "r1", "1", 0)).expect_err("empty"),
        BuildError::EmptyFieldName
    );
    assert_eq!(
        build_point(&reading("sensorA", "time", "r1", "1", 0)).expect_err("reserved"),
        BuildError::InvalidFieldName("time".to_string())
    );
}

#[test]
fn non_finite_float_is_rejected() {
    let nan = STANDARD.encode(f64::NAN.to_be_bytes());
    let err = build_point(&reading("sensorA", "temp", "r1", &nan, 0)).expect_err("nan");
    assert!(matches!(err, BuildError::NonFiniteFloat { ref field, .. } if field == "temp"));

    let inf = STANDARD.encode(f32::INFINITY.to_be_bytes());
    assert!(build_point(&reading("sensorA", "temp", "r1", &inf, 0)).is_err());
}

#[test]
fn empty_id_omits_tag() {
    let point = build_point(&reading("sensorA", "temp", "", "1", 0)).expect("point");
    assert!(point.tags.is_empty());
}

#[test]
fn oversized_series_key_is_rejected() {
    let device = "d".repeat(MAX_SERIES_KEY_LEN);
    let err = build_point(&reading(&device, "temp", "r1", "1", 0)).expect_err("too long");
    assert!(matches!(err, BuildError::KeyTooLong(len) if len > MAX_SERIES_KEY_LEN));
}

#[test]
fn line_breaks_in_identifiers_are_rejected() {
    let err = build_point(&reading("sensorA", "temp", "r1\nevil f=666i", "23", 1000))
        .expect_err("newline in id");
    assert_eq!(
        err,
        BuildError::UnrepresentableIdentifier {
            part: "id",
            value: "r1\nevil f=666i".to_string(),
        }
    );
    assert!(build_point(&reading("sensor\rA", "temp", "r1", "23", 1000)).is_err());
    assert!(build_point(&reading("sensorA", "te\nmp", "r1", "23", 1000)).is_err());
}

#[test]
fn trailing_backslash_is_rejected() {
    for (device, name, id) in [
        ("sensorA", "temp", "r1\\"),
        ("sensorA\\", "temp", "r1"),
        ("sensorA", "temp\\", "r1"),
    ] {
        let err = build_point(&reading(device, name, id, "23", 1000)).expect_err("backslash");
        assert!(matches!(err, BuildError::UnrepresentableIdentifier { .. }));
    }
    // 中间的反斜杠可以被转义
    assert!(build_point(&reading("sensor\\A", "temp", "r\\1", "23", 1000)).is_ok());
}

#[test]
fn nanosecond_origin_is_out_of_range() {
    let err = build_point(&reading("sensorA", "temp", "r1", "23", 1_700_000_000_000_000_000))
        .expect_err("out of range");
    assert!(matches!(err, BuildError::TimeOutOfRange(ns) if ns > i128::from(i64::MAX)));
}

#[test]
fn time_range_bounds() {
    let last_ms = MAX_NANO_TIME / 1_000_000;
    assert!(build_point(&reading("sensorA", "temp", "r1", "1", last_ms)).is_ok());
    assert!(build_point(&reading("sensorA", "temp", "r1", "1", last_ms + 1)).is_err());

    let first_ms = MIN_NANO_TIME / 1_000_000;
    assert!(build_point(&reading("sensorA", "temp", "r1", "1", first_ms)).is_ok());
    assert!(build_point(&reading("sensorA", "temp", "r1", "1", first_ms - 1)).is_err());
}
