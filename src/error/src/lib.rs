//! 游戏化引擎错误处理模块
//!
//! 处理统计更新、成就目录、等级表、存档系统中可能出现的各种错误。

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

/// 引擎运行过程中可能出现的错误类型
#[derive(Debug, Error)]
pub enum GamificationError {
    /// 调用方传入的参数无效
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 不存在的统计项
    #[error("Unknown stat key: {0}")]
    UnknownStat(String),

    /// 不存在的成就
    #[error("Unknown achievement id: {0}")]
    UnknownAchievement(String),

    /// 经验值增量为负数
    #[error("Experience delta must not be negative (got {0})")]
    NegativeExperience(i64),

    /// 存档系统错误
    #[error("Persistence error: {0}")]
    Persistence(#[from] anyhow::Error),

    /// IO操作错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 反序列化错误
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// 存档数据损坏
    #[error("Corrupted save data")]
    CorruptedSave,

    /// 存档版本不兼容
    #[error("Incompatible save version: {0}")]
    VersionMismatch(u32),

    /// 成就目录或等级表不一致（启动时致命）
    #[error("Catalog integrity violation: {0}")]
    CatalogIntegrity(String),

    /// 配置文件错误
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 引擎统一的结果类型
pub type GamificationResult<T> = Result<T, GamificationError>;

impl GamificationError {
    /// 调用方误用（开发期断言类错误）
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            GamificationError::InvalidInput(_)
                | GamificationError::UnknownStat(_)
                | GamificationError::UnknownAchievement(_)
                | GamificationError::NegativeExperience(_)
        )
    }

    /// 存档读写失败，引擎可以继续在内存中运行
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            GamificationError::Persistence(_)
                | GamificationError::Io(_)
                | GamificationError::Serialization(_)
                | GamificationError::Deserialization(_)
                | GamificationError::CorruptedSave
                | GamificationError::VersionMismatch(_)
        )
    }

    /// 启动时的配置错误，不可恢复
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GamificationError::CatalogIntegrity(_) | GamificationError::Config(_)
        )
    }
}

impl From<DecodeError> for GamificationError {
    fn from(err: DecodeError) -> Self {
        // 二进制存档里出现非法UTF-8通常意味着文件被截断或篡改
        if err.to_string().contains("invalid utf-8 sequence") {
            GamificationError::CorruptedSave
        } else {
            GamificationError::Deserialization(err.to_string())
        }
    }
}

impl From<EncodeError> for GamificationError {
    fn from(err: EncodeError) -> Self {
        GamificationError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for GamificationError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() {
            GamificationError::CorruptedSave
        } else if err.is_io() {
            GamificationError::Serialization(err.to_string())
        } else {
            GamificationError::Deserialization(err.to_string())
        }
    }
}

/// 将错误转换为面向用户的提示信息
pub fn user_message(error: &GamificationError) -> String {
    match error {
        GamificationError::CorruptedSave => {
            "Saved progress is corrupted and could not be loaded".to_string()
        }
        GamificationError::VersionMismatch(v) => {
            format!("Saved progress was written by a newer version (format {})", v)
        }
        GamificationError::Io(e) => match e.kind() {
            std::io::ErrorKind::NotFound => "No saved progress found".to_string(),
            std::io::ErrorKind::PermissionDenied => {
                "Permission denied while accessing saved progress".to_string()
            }
            _ => format!("IO error: {}", e),
        },
        GamificationError::Persistence(e) => {
            format!("Saved progress could not be accessed: {:#}", e)
        }
        _ => error.to_string(),
    }
}
