//! 事务对象
//!
//! [`SmartTransactionObject`] 能报告内部的回滚标记并刷新底层会话。
//! [`ResourceHolder`] 保存一个事务资源的同步状态，[`HolderTransactionObject`]
//! 在它之上实现 [`SmartTransactionObject`]。

use crate::error::{TransactionError, TransactionResult};
use infrastructure_common::{BeanCapability, BeanInstance, CapabilityRegistry};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// 可报告回滚状态的事务对象
pub trait SmartTransactionObject: Send + Sync {
    /// 事务是否已被内部标记为只能回滚
    fn is_rollback_only(&self) -> bool;

    /// 把底层会话的变更刷新到存储
    fn flush(&self) -> TransactionResult<()>;
}

/// 在能力表中登记事务对象类型
pub fn declare_transaction_object<T: SmartTransactionObject + 'static>(capabilities: &CapabilityRegistry) {
    capabilities.declare::<T>(BeanCapability::SmartTransactionObject);
}

/// 实例是否登记为事务对象
pub fn is_transaction_object(capabilities: &CapabilityRegistry, bean: &BeanInstance) -> bool {
    capabilities.instance_has(bean, BeanCapability::SmartTransactionObject)
}

/// 事务资源的同步状态
#[derive(Debug, Default)]
pub struct ResourceHolder {
    synchronized_with_transaction: AtomicBool,
    rollback_only: AtomicBool,
    reference_count: AtomicUsize,
    deadline: Mutex<Option<Instant>>,
    void: AtomicBool,
}

impl ResourceHolder {
    /// 创建资源持有者
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记资源已与事务同步
    pub fn set_synchronized_with_transaction(&self, synchronized: bool) {
        self.synchronized_with_transaction
            .store(synchronized, Ordering::SeqCst);
    }

    /// 是否已与事务同步
    pub fn is_synchronized_with_transaction(&self) -> bool {
        self.synchronized_with_transaction.load(Ordering::SeqCst)
    }

    /// 标记为只能回滚
    pub fn set_rollback_only(&self) {
        self.rollback_only.store(true, Ordering::SeqCst);
    }

    /// 清除回滚标记
    pub fn reset_rollback_only(&self) {
        self.rollback_only.store(false, Ordering::SeqCst);
    }

    /// 是否只能回滚
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::SeqCst)
    }

    /// 设置超时
    pub fn set_timeout(&self, timeout: Duration) {
        *self.deadline.lock() = Some(Instant::now() + timeout);
    }

    /// 是否设置了超时
    pub fn has_timeout(&self) -> bool {
        self.deadline.lock().is_some()
    }

    /// 剩余时间，没有超时返回 `None`
    ///
    /// 已经超时时把资源标记为只能回滚，并返回超时错误。
    pub fn time_to_live(&self) -> TransactionResult<Option<Duration>> {
        let Some(deadline) = *self.deadline.lock() else {
            return Ok(None);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            self.set_rollback_only();
            return Err(TransactionError::TimedOut { deadline });
        }
        Ok(Some(remaining))
    }

    /// 有调用方请求了该资源
    pub fn requested(&self) {
        self.reference_count.fetch_add(1, Ordering::SeqCst);
    }

    /// 调用方释放了该资源
    pub fn released(&self) {
        // 不会减到 0 以下
        let _ = self
            .reference_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| count.checked_sub(1));
    }

    /// 是否仍有调用方持有
    pub fn is_open(&self) -> bool {
        self.reference_count.load(Ordering::SeqCst) > 0
    }

    /// 清除事务状态，保留引用计数
    pub fn clear(&self) {
        self.synchronized_with_transaction
            .store(false, Ordering::SeqCst);
        self.rollback_only.store(false, Ordering::SeqCst);
        *self.deadline.lock() = None;
    }

    /// 解除绑定后标记为失效
    pub fn unbound(&self) {
        self.void.store(true, Ordering::SeqCst);
    }

    /// 是否已失效
    pub fn is_void(&self) -> bool {
        self.void.load(Ordering::SeqCst)
    }
}

/// 刷新底层会话的回调
pub type FlushCallback = Box<dyn Fn() -> TransactionResult<()> + Send + Sync>;

/// 基于 [`ResourceHolder`] 的事务对象
pub struct HolderTransactionObject {
    holder: Arc<ResourceHolder>,
    new_holder: bool,
    flush: Option<FlushCallback>,
}

impl fmt::Debug for HolderTransactionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HolderTransactionObject")
            .field("holder", &self.holder)
            .field("new_holder", &self.new_holder)
            .field("has_flush", &self.flush.is_some())
            .finish()
    }
}

impl HolderTransactionObject {
    /// 包装资源持有者，`new_holder` 表示资源是否由本事务创建
    pub fn new(holder: Arc<ResourceHolder>, new_holder: bool) -> Self {
        Self {
            holder,
            new_holder,
            flush: None,
        }
    }

    /// 设置刷新回调
    pub fn with_flush<F>(mut self, flush: F) -> Self
    where
        F: Fn() -> TransactionResult<()> + Send + Sync + 'static,
    {
        self.flush = Some(Box::new(flush));
        self
    }

    /// 资源持有者
    pub fn holder(&self) -> &Arc<ResourceHolder> {
        &self.holder
    }

    /// 资源是否由本事务创建
    pub fn is_new_holder(&self) -> bool {
        self.new_holder
    }

    /// 标记为只能回滚
    pub fn set_rollback_only(&self) {
        self.holder.set_rollback_only();
    }
}

impl SmartTransactionObject for HolderTransactionObject {
    fn is_rollback_only(&self) -> bool {
        self.holder.is_rollback_only()
    }

    fn flush(&self) -> TransactionResult<()> {
        if self.holder.is_void() {
            return Err(TransactionError::NoTransaction {
                message: "资源已经解除绑定".to_string(),
            });
        }
        match &self.flush {
            Some(flush) => {
                debug!("刷新事务资源");
                flush()
            }
            None => Ok(()),
        }
    }
}
