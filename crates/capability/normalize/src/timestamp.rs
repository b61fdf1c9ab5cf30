use domain::Timestamp;

const MILLIS_PER_SECOND: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;

/// 毫秒级 origin 转换为 (秒, 纳秒)，向下取整，纳秒恒非负。
pub fn convert_origin(origin_ms: i64) -> Timestamp {
    Timestamp::new(
        origin_ms.div_euclid(MILLIS_PER_SECOND),
        origin_ms.rem_euclid(MILLIS_PER_SECOND) * NANOS_PER_MILLI,
    )
}
