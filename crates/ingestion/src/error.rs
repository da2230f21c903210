//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 入口缓冲区已关闭
    #[error("ingress closed while reading stream {stream}")]
    StreamClosed {
        /// 流名称
        stream: String,
    },

    /// 数据源解析失败
    #[error("failed to parse {stream} line {line}: {message}")]
    ParseFailed {
        /// 流名称
        stream: String,
        /// 行号 (从 1 开始)
        line: u64,
        /// 错误消息
        message: String,
    },

    /// 流接收错误
    #[error("stream error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_stream() {
        let closed = IngestionError::StreamClosed {
            stream: "telemetry".into(),
        };
        assert_eq!(
            closed.to_string(),
            "ingress closed while reading stream telemetry"
        );

        let parse = IngestionError::ParseFailed {
            stream: "stdin".into(),
            line: 7,
            message: "expected value".into(),
        };
        assert_eq!(
            parse.to_string(),
            "failed to parse stdin line 7: expected value"
        );
    }
}
