//! 容器生命周期状态

use serde::{Deserialize, Serialize};

/// 应用上下文生命周期状态
///
/// 状态转换是单向的: `Uninitialized -> Active -> Closed`，
/// 刷新失败时也可以直接从 `Uninitialized` 进入 `Closed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextState {
    /// 尚未刷新
    Uninitialized,
    /// 已刷新，可以访问 Bean
    Active,
    /// 已关闭
    Closed,
}

impl Default for ContextState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl ContextState {
    /// 检查是否允许转换到目标状态
    pub fn can_transition_to(self, target: ContextState) -> bool {
        matches!(
            (self, target),
            (Self::Uninitialized, Self::Active)
                | (Self::Uninitialized, Self::Closed)
                | (Self::Active, Self::Closed)
        )
    }

    /// 是否处于活动状态
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// 是否已关闭
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// 单个 Bean 名称的解析状态
///
/// `Unseen -> Resolving -> (Resolved | Failed)`，后两者为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionState {
    /// 尚未请求
    Unseen,
    /// 正在创建
    Resolving,
    /// 已创建并缓存
    Resolved,
    /// 创建失败，失败结果被缓存
    Failed,
}

impl Default for ResolutionState {
    fn default() -> Self {
        Self::Unseen
    }
}

impl ResolutionState {
    /// 是否为终态
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_state_transitions_are_one_way() {
        assert!(ContextState::Uninitialized.can_transition_to(ContextState::Active));
        assert!(ContextState::Active.can_transition_to(ContextState::Closed));
        assert!(!ContextState::Closed.can_transition_to(ContextState::Active));
        assert!(!ContextState::Active.can_transition_to(ContextState::Uninitialized));
        assert!(!ContextState::Closed.can_transition_to(ContextState::Closed));
    }

    #[test]
    fn resolution_terminal_states() {
        assert!(!ResolutionState::Unseen.is_terminal());
        assert!(!ResolutionState::Resolving.is_terminal());
        assert!(ResolutionState::Resolved.is_terminal());
        assert!(ResolutionState::Failed.is_terminal());
    }
}
