//! 事务管理配置选择
//!
//! 根据导入方的 `mode` 属性决定导入哪些配置：
//!
//! | mode | 导入 |
//! |---|---|
//! | `PROXY` | [`AUTO_PROXY_REGISTRAR`], [`PROXY_TRANSACTION_MANAGEMENT_CONFIGURATION`] |
//! | `ASPECTJ` | 类路径上有 JTA 事务注解时为 [`JTA_TRANSACTION_ASPECT_CONFIGURATION`]，否则为 [`TRANSACTION_ASPECT_CONFIGURATION`] |
//! | 其他 | 不导入 |

use di_abstractions::{ImportMetadata, ImportSelector};
use infrastructure_common::BeansResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// 自动代理注册器的配置标识
pub const AUTO_PROXY_REGISTRAR: &str = "AutoProxyRegistrar";
/// 代理模式事务配置的标识
pub const PROXY_TRANSACTION_MANAGEMENT_CONFIGURATION: &str = "ProxyTransactionManagementConfiguration";
/// AspectJ 模式事务切面配置的标识
pub const TRANSACTION_ASPECT_CONFIGURATION: &str = "AspectJTransactionManagementConfiguration";
/// AspectJ 模式 JTA 事务切面配置的标识
pub const JTA_TRANSACTION_ASPECT_CONFIGURATION: &str = "AspectJJtaTransactionManagementConfiguration";
/// JTA 事务注解类型
pub const JTA_TRANSACTIONAL_TYPE: &str = "javax.transaction.Transactional";
/// 导入元数据中的模式属性
pub const MODE_ATTRIBUTE: &str = "mode";

/// 通知模式
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AdviceMode {
    /// 基于代理
    Proxy,
    /// 基于 AspectJ 织入
    AspectJ,
    /// 不认识的模式，原样保留
    Other(String),
}

impl Default for AdviceMode {
    fn default() -> Self {
        Self::Proxy
    }
}

impl From<&str> for AdviceMode {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "PROXY" => Self::Proxy,
            "ASPECTJ" => Self::AspectJ,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl From<String> for AdviceMode {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<AdviceMode> for String {
    fn from(mode: AdviceMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for AdviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proxy => f.write_str("PROXY"),
            Self::AspectJ => f.write_str("ASPECTJ"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

impl AdviceMode {
    /// 从导入元数据读取模式，没有 `mode` 属性时为 [`AdviceMode::Proxy`]
    pub fn from_metadata(metadata: &ImportMetadata) -> Self {
        match metadata.attributes.get(MODE_ATTRIBUTE) {
            None => Self::default(),
            Some(serde_json::Value::String(mode)) => Self::from(mode.as_str()),
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

/// 类路径探测，判断某个类型是否可用
pub trait ClassPathProbe: Send + Sync {
    /// 类型是否存在
    fn is_present(&self, type_name: &str) -> bool;
}

/// 固定类型集合的类路径
#[derive(Debug, Clone, Default)]
pub struct StaticClassPath {
    types: HashSet<String>,
}

impl StaticClassPath {
    /// 空类路径
    pub fn new() -> Self {
        Self::default()
    }

    /// 由类型名称集合创建
    pub fn with_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    /// 添加类型
    pub fn add(&mut self, type_name: impl Into<String>) {
        self.types.insert(type_name.into());
    }
}

impl ClassPathProbe for StaticClassPath {
    fn is_present(&self, type_name: &str) -> bool {
        self.types.contains(type_name)
    }
}

/// 事务管理配置选择器
pub struct TransactionManagementConfigurationSelector {
    class_path: Box<dyn ClassPathProbe>,
}

impl fmt::Debug for TransactionManagementConfigurationSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManagementConfigurationSelector")
            .field("jta_present", &self.class_path.is_present(JTA_TRANSACTIONAL_TYPE))
            .finish()
    }
}

impl Default for TransactionManagementConfigurationSelector {
    fn default() -> Self {
        Self::new(StaticClassPath::new())
    }
}

impl TransactionManagementConfigurationSelector {
    /// 使用指定的类路径探测创建选择器
    pub fn new(class_path: impl ClassPathProbe + 'static) -> Self {
        Self {
            class_path: Box::new(class_path),
        }
    }

    /// 按模式选择配置标识
    pub fn select_for_mode(&self, mode: &AdviceMode) -> Vec<String> {
        match mode {
            AdviceMode::Proxy => vec![
                AUTO_PROXY_REGISTRAR.to_string(),
                PROXY_TRANSACTION_MANAGEMENT_CONFIGURATION.to_string(),
            ],
            AdviceMode::AspectJ => vec![self.determine_transaction_aspect().to_string()],
            AdviceMode::Other(value) => {
                warn!("不支持的通知模式 '{}'，不导入任何事务配置", value);
                Vec::new()
            }
        }
    }

    fn determine_transaction_aspect(&self) -> &'static str {
        if self.class_path.is_present(JTA_TRANSACTIONAL_TYPE) {
            JTA_TRANSACTION_ASPECT_CONFIGURATION
        } else {
            TRANSACTION_ASPECT_CONFIGURATION
        }
    }
}

impl ImportSelector for TransactionManagementConfigurationSelector {
    fn select_imports(&self, metadata: &ImportMetadata) -> BeansResult<Vec<String>> {
        let mode = AdviceMode::from_metadata(metadata);
        let imports = self.select_for_mode(&mode);
        debug!(
            "{} 的事务管理模式 {}，导入 {:?}",
            metadata.importing_class, mode, imports
        );
        Ok(imports)
    }
}
