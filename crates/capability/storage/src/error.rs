//! 存储层错误类型
//!
//! - 网络/连接错误
//! - 后端拒绝写入（非 2xx）
//! - 客户端构造与地址错误

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("write rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
