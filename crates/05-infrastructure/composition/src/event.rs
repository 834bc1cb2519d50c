//! 应用事件
//!
//! 上下文在刷新完成和关闭时发布内置事件，应用也可以发布自定义事件。
//! 监听器按注册顺序同步调用，调用期间不持有监听器列表的锁。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use infrastructure_common::BeansResult;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// 事件种类
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApplicationEventKind {
    /// 上下文刷新完成
    ContextRefreshed,
    /// 上下文已关闭
    ContextClosed,
    /// 应用自定义事件
    Custom {
        /// 事件名称
        name: String,
        /// 事件数据
        payload: Value,
    },
}

/// 应用事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationEvent {
    /// 发布方，通常是上下文的显示名称
    pub source: String,
    /// 发布时间
    pub timestamp: DateTime<Utc>,
    /// 事件种类
    pub kind: ApplicationEventKind,
}

impl ApplicationEvent {
    /// 创建事件
    pub fn new(source: impl Into<String>, kind: ApplicationEventKind) -> Self {
        Self {
            source: source.into(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// 创建自定义事件
    pub fn custom(source: impl Into<String>, name: impl Into<String>, payload: Value) -> Self {
        Self::new(
            source,
            ApplicationEventKind::Custom {
                name: name.into(),
                payload,
            },
        )
    }

    /// 事件名称
    pub fn name(&self) -> &str {
        match &self.kind {
            ApplicationEventKind::ContextRefreshed => "context_refreshed",
            ApplicationEventKind::ContextClosed => "context_closed",
            ApplicationEventKind::Custom { name, .. } => name,
        }
    }
}

/// 事件监听器
#[async_trait]
pub trait ApplicationListener: Send + Sync {
    /// 处理事件
    async fn on_application_event(&self, event: &ApplicationEvent) -> BeansResult<()>;

    /// 是否关心该事件
    fn supports(&self, _event: &ApplicationEvent) -> bool {
        true
    }

    /// 监听器名称，用于日志
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// 事件发布
#[async_trait]
pub trait ApplicationEventPublisher: Send + Sync {
    /// 发布事件，任何监听器失败都会返回给调用方
    async fn publish_event(&self, event: ApplicationEvent) -> BeansResult<()>;
}

/// 简单事件广播器
#[derive(Default)]
pub struct SimpleApplicationEventMulticaster {
    listeners: RwLock<Vec<Arc<dyn ApplicationListener>>>,
}

impl std::fmt::Debug for SimpleApplicationEventMulticaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleApplicationEventMulticaster")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl SimpleApplicationEventMulticaster {
    /// 创建广播器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加监听器
    pub fn add_listener(&self, listener: Arc<dyn ApplicationListener>) {
        debug!("添加事件监听器: {}", listener.name());
        self.listeners.write().push(listener);
    }

    /// 移除全部监听器
    pub fn remove_all_listeners(&self) {
        self.listeners.write().clear();
    }

    /// 监听器数量
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// 把事件分发给所有关心它的监听器
    pub async fn multicast_event(&self, event: &ApplicationEvent) -> BeansResult<()> {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .filter(|listener| listener.supports(event))
            .cloned()
            .collect();

        debug!("分发事件 {} 给 {} 个监听器", event.name(), listeners.len());
        for listener in listeners {
            if let Err(err) = listener.on_application_event(event).await {
                error!(
                    "监听器 {} 处理事件 {} 失败: {}",
                    listener.name(),
                    event.name(),
                    err
                );
                return Err(err);
            }
        }
        Ok(())
    }
}
