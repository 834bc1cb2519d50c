//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },

    #[error("配置类型转换失败: {message}")]
    TypeConversionError { message: String },

    #[error("配置重载失败: {message}")]
    ReloadError { message: String },
}

impl ConfigError {
    /// 是否为配置键不存在
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

/// 容器错误类型
///
/// 实现 `Clone`，失败的单例解析结果会被缓存并在后续查找中原样返回。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BeansError {
    #[error("名称冲突: {name}, 原因: {message}")]
    Conflict { name: String, message: String },

    #[error("未找到: {name}, 原因: {message}")]
    NotFound { name: String, message: String },

    #[error("检测到循环依赖: {chain}")]
    CircularDependency { bean_name: String, chain: String },

    #[error("依赖不唯一: 类型 {type_name} 存在多个候选 {candidates:?}")]
    AmbiguousDependency {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("非法状态: {message}")]
    IllegalState { message: String },

    #[error("Bean 定义无效: {message}")]
    Configuration { message: String },

    #[error("Bean 定义是抽象的，不能实例化: {bean_name}")]
    BeanIsAbstract { bean_name: String },

    #[error("Bean 类型不匹配: {bean_name}, 期望 {required_type}, 实际 {actual_type}")]
    BeanNotOfRequiredType {
        bean_name: String,
        required_type: String,
        actual_type: String,
    },

    #[error("Bean 创建失败: {bean_name}, 原因: {message}")]
    CreationFailed { bean_name: String, message: String },
}

impl BeansError {
    /// 创建名称冲突错误
    pub fn conflict(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            name: name.into(),
            message: message.into(),
        }
    }

    /// 创建未找到错误
    pub fn not_found(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            message: message.into(),
        }
    }

    /// 创建非法状态错误
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// 创建定义无效错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// 创建实例化失败错误
    pub fn creation_failed(bean_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CreationFailed {
            bean_name: bean_name.into(),
            message: message.into(),
        }
    }

    /// 是否为未找到错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// 是否为循环依赖错误
    pub fn is_circular_dependency(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("容器错误: {source}")]
    BeansError {
        #[from]
        source: BeansError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },

    #[error("基础设施关闭失败: {message}")]
    ShutdownFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type BeansResult<T> = Result<T, BeansError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beans_error_is_cloneable_and_comparable() {
        let error = BeansError::creation_failed("dataSource", "连接被拒绝");
        let cached = error.clone();
        assert_eq!(error, cached);
        assert_eq!(
            cached.to_string(),
            "Bean 创建失败: dataSource, 原因: 连接被拒绝"
        );
    }

    #[test]
    fn infrastructure_error_wraps_beans_error() {
        let error: InfrastructureError = BeansError::illegal_state("上下文已关闭").into();
        assert!(matches!(error, InfrastructureError::BeansError { .. }));
    }
}
