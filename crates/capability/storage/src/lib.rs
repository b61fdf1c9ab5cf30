//! # EdgeX Storage 模块
//!
//! 时序存储抽象层，负责把 [`domain::Batch`] 写入时序数据库。
//!
//! ## 模块说明
//!
//! - [`traits`]：存储接口定义（`TimeSeriesStore::write_batch`）
//! - [`error`]：存储错误类型定义
//! - [`line_protocol`]：InfluxDB 行协议编码
//! - [`influx`]：InfluxDB 1.x HTTP `/write` 实现（生产环境使用）
//! - [`in_memory`]：内存实现（用于测试和本地演示）
//!
//! ## 设计约束
//!
//! - 存储实现必须可并发调用（`Send + Sync`），流水线会在多个任务中共享同一实例
//! - 时间戳已是 UTC，存储层只做精度换算，不做时区处理
//! - 写入失败只返回错误，不做重试

pub mod error;
pub mod in_memory;
pub mod influx;
pub mod line_protocol;
pub mod traits;

pub use error::*;
pub use in_memory::InMemoryTimeSeriesStore;
pub use influx::{InfluxConfig, InfluxHttpStore};
pub use line_protocol::{encode_batch, encode_point};
pub use traits::*;
