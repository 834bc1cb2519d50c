//! 消息解析
//!
//! 语言环境使用 `zh_CN` 这种形式。查找顺序为完整语言环境、语言部分、默认（空字符串），
//! 模板中的 `{0}`、`{1}` 依次替换为参数。

use dashmap::DashMap;
use infrastructure_common::{BeansError, BeansResult};
use tracing::debug;

/// 默认语言环境
pub const DEFAULT_LOCALE: &str = "";

/// 消息源
pub trait MessageSource: Send + Sync {
    /// 解析消息
    ///
    /// 找不到消息时使用 `default_message`（同样替换参数），两者都没有时返回未找到错误。
    fn get_message(
        &self,
        code: &str,
        args: &[String],
        default_message: Option<&str>,
        locale: &str,
    ) -> BeansResult<String>;
}

/// 把 `{0}` 形式的占位替换为参数
pub fn format_message(template: &str, args: &[String]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |text, (index, arg)| {
            text.replace(&format!("{{{index}}}"), arg)
        })
}

/// 语言环境的查找链，例如 `zh_CN` -> [`zh_CN`, `zh`, ``]
fn locale_chain(locale: &str) -> Vec<&str> {
    let mut chain = Vec::with_capacity(3);
    if !locale.is_empty() {
        chain.push(locale);
        if let Some((language, _)) = locale.split_once(['_', '-']) {
            chain.push(language);
        }
    }
    chain.push(DEFAULT_LOCALE);
    chain
}

/// 代码中直接登记消息的消息源
#[derive(Debug, Default)]
pub struct StaticMessageSource {
    /// (代码, 语言环境) -> 模板
    messages: DashMap<(String, String), String>,
}

impl StaticMessageSource {
    /// 创建空的消息源
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记消息模板
    pub fn add_message(&self, code: &str, locale: &str, template: &str) {
        debug!("登记消息: {} [{}]", code, locale);
        self.messages
            .insert((code.to_string(), locale.to_string()), template.to_string());
    }

    /// 已登记消息数量
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// 是否没有任何消息
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 按查找链取模板
    pub fn resolve_template(&self, code: &str, locale: &str) -> Option<String> {
        locale_chain(locale).into_iter().find_map(|candidate| {
            self.messages
                .get(&(code.to_string(), candidate.to_string()))
                .map(|entry| entry.value().clone())
        })
    }
}

impl MessageSource for StaticMessageSource {
    fn get_message(
        &self,
        code: &str,
        args: &[String],
        default_message: Option<&str>,
        locale: &str,
    ) -> BeansResult<String> {
        match self.resolve_template(code, locale).as_deref().or(default_message) {
            Some(template) => Ok(format_message(template, args)),
            None => Err(BeansError::not_found(
                code,
                format!("语言环境 '{locale}' 下没有该消息"),
            )),
        }
    }
}
