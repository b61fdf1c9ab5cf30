use base64::{Engine as _, engine::general_purpose::STANDARD};
use domain::InferredValue;

/// 推断读数值类型。
///
/// 优先级：布尔 > 十进制 i64 > base64 编码的大端 IEEE-754 浮点（4 或 8 字节）> 原始字符串。
/// 布尔与整数在去空白、转小写后的副本上判断；base64 与字符串兜底使用原始值。
pub fn infer_value(raw: &str) -> InferredValue {
    let fixed = raw.trim().to_lowercase();
    match fixed.as_str() {
        "true" => return InferredValue::Bool(true),
        "false" => return InferredValue::Bool(false),
        _ => {}
    }

    if let Ok(value) = fixed.parse::<i64>() {
        return InferredValue::Int(value);
    }

    if let Some(value) = decode_base64_float(raw) {
        return InferredValue::Float(value);
    }

    InferredValue::Str(raw.to_string())
}

fn decode_base64_float(raw: &str) -> Option<f64> {
    let bytes = STANDARD.decode(raw).ok()?;
    match bytes.len() {
        4 => {
            let bits: [u8; 4] = bytes.as_slice().try_into().ok()?;
            Some(f64::from(f32::from_be_bytes(bits)))
        }
        8 => {
            let bits: [u8; 8] = bytes.as_slice().try_into().ok()?;
            Some(f64::from_be_bytes(bits))
        }
        _ => None,
    }
}
