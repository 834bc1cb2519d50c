//! 可监听的异步结果
//!
//! [`SettableListenableFuture`] 在完成时恰好触发一次已注册的回调（成功与失败互斥）。
//! 完成后再注册的回调会在注册线程上同步立即执行。回调总是在释放内部锁之后执行，
//! 因此回调中可以安全地再次访问同一个 future 或容器。

use parking_lot::{Condvar, Mutex};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

/// 异步结果的失败原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FutureError {
    #[error("任务已取消")]
    Cancelled,

    #[error("任务执行失败: {message}")]
    Failed { message: String },

    #[error("等待结果超时: {timeout:?}")]
    Timeout { timeout: Duration },
}

impl FutureError {
    /// 从任意错误创建失败原因
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed {
            message: error.to_string(),
        }
    }
}

/// 成功回调
pub type SuccessCallback<T> = Box<dyn FnOnce(&T) + Send>;

/// 失败回调
pub type FailureCallback = Box<dyn FnOnce(&FutureError) + Send>;

/// 对象形式的回调
pub trait ListenableFutureCallback<T>: Send {
    /// 成功时调用
    fn on_success(&self, value: &T);

    /// 失败时调用
    fn on_failure(&self, error: &FutureError);
}

/// 可监听的异步结果
pub trait ListenableFuture<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// 注册一对成功/失败回调
    fn add_callback(&self, success: SuccessCallback<T>, failure: FailureCallback);

    /// 注册对象形式的回调
    fn add_listener(&self, listener: Box<dyn ListenableFutureCallback<T>>) {
        let listener = Arc::new(Mutex::new(Some(listener)));
        let on_failure = Arc::clone(&listener);
        self.add_callback(
            Box::new(move |value| {
                if let Some(listener) = listener.lock().take() {
                    listener.on_success(value);
                }
            }),
            Box::new(move |error| {
                if let Some(listener) = on_failure.lock().take() {
                    listener.on_failure(error);
                }
            }),
        );
    }

    /// 是否已完成（成功、失败或取消）
    fn is_done(&self) -> bool;

    /// 是否已取消
    fn is_cancelled(&self) -> bool;

    /// 取消任务，已完成时返回 false
    fn cancel(&self) -> bool;

    /// 适配为标准的 Rust `Future`
    fn completable(&self) -> CompletableFuture<T>
    where
        T: Clone,
    {
        let (sender, receiver) = oneshot::channel();
        let sender = Arc::new(Mutex::new(Some(sender)));
        let on_failure = Arc::clone(&sender);
        self.add_callback(
            Box::new(move |value: &T| {
                if let Some(sender) = sender.lock().take() {
                    let _ = sender.send(Ok(value.clone()));
                }
            }),
            Box::new(move |error: &FutureError| {
                if let Some(sender) = on_failure.lock().take() {
                    let _ = sender.send(Err(error.clone()));
                }
            }),
        );
        CompletableFuture { receiver }
    }
}

/// [`ListenableFuture::completable`] 返回的 future
#[derive(Debug)]
pub struct CompletableFuture<T> {
    receiver: oneshot::Receiver<Result<T, FutureError>>,
}

impl<T> Future for CompletableFuture<T> {
    type Output = Result<T, FutureError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // 发送端在未完成时被丢弃
            Poll::Ready(Err(_)) => Poll::Ready(Err(FutureError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// 一对已注册的回调
struct Registered<T>(SuccessCallback<T>, FailureCallback);

enum FutureState<T> {
    Pending(Vec<Registered<T>>),
    Succeeded(Arc<T>),
    Failed(FutureError),
}

struct Shared<T> {
    state: Mutex<FutureState<T>>,
    completed: Condvar,
}

/// 可由外部设置结果的 [`ListenableFuture`] 实现
pub struct SettableListenableFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SettableListenableFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for SettableListenableFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.shared.state.lock() {
            FutureState::Pending(callbacks) => format!("pending({} callbacks)", callbacks.len()),
            FutureState::Succeeded(_) => "succeeded".to_string(),
            FutureState::Failed(error) => format!("failed({error})"),
        };
        f.debug_struct("SettableListenableFuture")
            .field("state", &state)
            .finish()
    }
}

impl<T> Default for SettableListenableFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SettableListenableFuture<T> {
    /// 创建未完成的 future
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(FutureState::Pending(Vec::new())),
                completed: Condvar::new(),
            }),
        }
    }

    /// 以成功结果完成，已完成时返回 false
    pub fn set(&self, value: T) -> bool {
        let value = Arc::new(value);
        let callbacks = {
            let mut state = self.shared.state.lock();
            let FutureState::Pending(callbacks) = &mut *state else {
                return false;
            };
            let callbacks = std::mem::take(callbacks);
            *state = FutureState::Succeeded(Arc::clone(&value));
            self.shared.completed.notify_all();
            callbacks
        };

        for Registered(success, _) in callbacks {
            success(&value);
        }
        true
    }

    /// 以失败结果完成，已完成时返回 false
    pub fn set_error(&self, error: FutureError) -> bool {
        let callbacks = {
            let mut state = self.shared.state.lock();
            let FutureState::Pending(callbacks) = &mut *state else {
                return false;
            };
            let callbacks = std::mem::take(callbacks);
            *state = FutureState::Failed(error.clone());
            self.shared.completed.notify_all();
            callbacks
        };

        for Registered(_, failure) in callbacks {
            failure(&error);
        }
        true
    }

    /// 阻塞等待结果
    pub fn get(&self) -> Result<Arc<T>, FutureError> {
        let mut state = self.shared.state.lock();
        loop {
            match &*state {
                FutureState::Pending(_) => self.shared.completed.wait(&mut state),
                FutureState::Succeeded(value) => return Ok(Arc::clone(value)),
                FutureState::Failed(error) => return Err(error.clone()),
            }
        }
    }

    /// 阻塞等待结果，最多等待 `timeout`
    pub fn get_timeout(&self, timeout: Duration) -> Result<Arc<T>, FutureError> {
        let deadline = std::time::Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            match &*state {
                FutureState::Pending(_) => {
                    if self
                        .shared
                        .completed
                        .wait_until(&mut state, deadline)
                        .timed_out()
                        && matches!(&*state, FutureState::Pending(_))
                    {
                        return Err(FutureError::Timeout { timeout });
                    }
                }
                FutureState::Succeeded(value) => return Ok(Arc::clone(value)),
                FutureState::Failed(error) => return Err(error.clone()),
            }
        }
    }
}

impl<T> ListenableFuture<T> for SettableListenableFuture<T>
where
    T: Send + Sync + 'static,
{
    fn add_callback(&self, success: SuccessCallback<T>, failure: FailureCallback) {
        enum Ready<T> {
            Value(Arc<T>),
            Error(FutureError),
        }

        let ready = {
            let mut state = self.shared.state.lock();
            match &mut *state {
                FutureState::Pending(callbacks) => {
                    callbacks.push(Registered(success, failure));
                    return;
                }
                FutureState::Succeeded(value) => Ready::Value(Arc::clone(value)),
                FutureState::Failed(error) => Ready::Error(error.clone()),
            }
        };

        match ready {
            Ready::Value(value) => success(&value),
            Ready::Error(error) => failure(&error),
        }
    }

    fn is_done(&self) -> bool {
        !matches!(&*self.shared.state.lock(), FutureState::Pending(_))
    }

    fn is_cancelled(&self) -> bool {
        matches!(
            &*self.shared.state.lock(),
            FutureState::Failed(FutureError::Cancelled)
        )
    }

    fn cancel(&self) -> bool {
        let cancelled = self.set_error(FutureError::Cancelled);
        if cancelled {
            debug!("异步任务已取消");
        }
        cancelled
    }
}
