//! 事务错误类型

use std::time::Instant;
use thiserror::Error;

/// 事务错误类型
#[derive(Error, Debug, Clone)]
pub enum TransactionError {
    #[error("没有可用的事务: {message}")]
    NoTransaction { message: String },

    #[error("事务已超时")]
    TimedOut { deadline: Instant },

    #[error("刷新事务资源失败: {message}")]
    FlushFailed { message: String },
}

/// 结果类型别名
pub type TransactionResult<T> = Result<T, TransactionError>;
