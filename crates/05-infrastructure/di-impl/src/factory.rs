//! 默认 Bean 工厂实现
//!
//! [`DefaultListableBeanFactory`] 同时是 Bean 定义注册表、别名注册表和可按类型装配的
//! 分层 Bean 工厂。
//!
//! 单例按名称持有一个 [`tokio::sync::OnceCell`] 槽位：并发的首次请求中只有一个调用方执行
//! 创建，其余调用方等待同一结果，失败结果同样被缓存。进入槽位之前先用解析路径检查同一
//! 任务内的循环，再用静态依赖图检查跨任务的循环，避免互相等待。
//!
//! [`DefaultListableBeanFactory::close`] 之后工厂拒绝一切获取；关闭时仍在创建的单例
//! 完成后立即销毁，调用方得到非法状态错误。

use crate::alias::SimpleAliasRegistry;
use crate::instantiator::DefaultInstantiator;
use async_trait::async_trait;
use dashmap::DashMap;
use di_abstractions::{
    AliasRegistry, AutowireCapableBeanFactory, BeanDefinition, BeanDefinitionRegistry,
    BeanFactory, BeanPostProcessor, BeanScope, BeanValue, CircularDependencyDetector,
    ConfigurableBeanFactory, ContainerConfig, ContainerStats, DefaultCircularDependencyDetector,
    DependencyGraphNode, HierarchicalBeanFactory, InstantiationRequest, Instantiator,
    ListableBeanFactory, ResolveContext, ResolvedArguments, ResolvedValue, Scope,
};
use futures::future::BoxFuture;
use infrastructure_common::{
    BeanInstance, BeansError, BeansResult, CapabilityRegistry, ResolutionState, TypeInfo,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// 单例槽位
struct SingletonSlot {
    cell: OnceCell<BeansResult<BeanInstance>>,
    /// 是否通过 `register_singleton` 手动注册
    manual: bool,
    /// 手动注册实例的类型名称
    type_name: Option<String>,
    destroy_method: Option<String>,
    /// 实例是否已交给销毁流程
    destroyed: AtomicBool,
}

impl SingletonSlot {
    fn pending(destroy_method: Option<String>) -> Self {
        Self {
            cell: OnceCell::new(),
            manual: false,
            type_name: None,
            destroy_method,
            destroyed: AtomicBool::new(false),
        }
    }

    fn manual(instance: BeanInstance, type_name: Option<String>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Ok(instance))),
            manual: true,
            type_name,
            destroy_method: None,
            destroyed: AtomicBool::new(false),
        }
    }

    fn state(&self) -> ResolutionState {
        match self.cell.get() {
            None => ResolutionState::Resolving,
            Some(Ok(_)) => ResolutionState::Resolved,
            Some(Err(_)) => ResolutionState::Failed,
        }
    }

    fn instance(&self) -> Option<&BeanInstance> {
        match self.cell.get() {
            Some(Ok(instance)) => Some(instance),
            _ => None,
        }
    }

    /// 领取待销毁的实例，每个槽位至多一次
    fn claim_for_destruction(&self) -> Option<&BeanInstance> {
        let instance = self.instance()?;
        (!self.destroyed.swap(true, Ordering::AcqRel)).then_some(instance)
    }
}

#[derive(Default)]
struct DefinitionTable {
    definitions: HashMap<String, Arc<BeanDefinition>>,
    /// 注册顺序
    names: Vec<String>,
}

#[derive(Default)]
struct FactoryCounters {
    singletons_created: AtomicUsize,
    prototypes_created: AtomicUsize,
    resolution_errors: AtomicUsize,
}

/// 默认 Bean 工厂
pub struct DefaultListableBeanFactory {
    config: ContainerConfig,
    table: RwLock<DefinitionTable>,
    /// 合并定义缓存，任何定义变化时整体失效
    merged: DashMap<String, Arc<BeanDefinition>>,
    aliases: SimpleAliasRegistry,
    singletons: DashMap<String, Arc<SingletonSlot>>,
    /// 单例完成创建的顺序
    creation_order: Mutex<Vec<String>>,
    /// 被依赖者 -> 依赖它的 Bean
    dependents: DashMap<String, HashSet<String>>,
    parent: RwLock<Option<Arc<dyn AutowireCapableBeanFactory>>>,
    instantiator: Arc<dyn Instantiator>,
    post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
    scopes: DashMap<String, Arc<dyn BeanScope>>,
    capabilities: Arc<CapabilityRegistry>,
    detector: Box<dyn CircularDependencyDetector>,
    counters: FactoryCounters,
    closed: AtomicBool,
}

impl std::fmt::Debug for DefaultListableBeanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultListableBeanFactory")
            .field("config", &self.config)
            .field("definitions", &self.table.read().names)
            .field("singletons", &self.singletons.len())
            .field("has_parent", &self.parent.read().is_some())
            .finish()
    }
}

impl Default for DefaultListableBeanFactory {
    fn default() -> Self {
        Self::new(ContainerConfig::default())
    }
}

impl DefaultListableBeanFactory {
    /// 使用默认实例化器创建工厂
    pub fn new(config: ContainerConfig) -> Self {
        Self::with_instantiator(config, Arc::new(DefaultInstantiator::new()))
    }

    /// 使用指定实例化器创建工厂
    pub fn with_instantiator(config: ContainerConfig, instantiator: Arc<dyn Instantiator>) -> Self {
        Self {
            aliases: SimpleAliasRegistry::new(config.allow_alias_overriding),
            config,
            table: RwLock::new(DefinitionTable::default()),
            merged: DashMap::new(),
            singletons: DashMap::new(),
            creation_order: Mutex::new(Vec::new()),
            dependents: DashMap::new(),
            parent: RwLock::new(None),
            instantiator,
            post_processors: RwLock::new(Vec::new()),
            scopes: DashMap::new(),
            capabilities: Arc::new(CapabilityRegistry::new()),
            detector: Box::new(DefaultCircularDependencyDetector),
            counters: FactoryCounters::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// 设置父工厂，设置后不能更换
    pub fn set_parent_bean_factory(
        &self,
        parent: Arc<dyn AutowireCapableBeanFactory>,
    ) -> BeansResult<()> {
        let mut slot = self.parent.write();
        if slot.is_some() {
            return Err(BeansError::illegal_state("父工厂已经设置，不能更换"));
        }
        *slot = Some(parent);
        Ok(())
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 注册自定义作用域
    pub fn register_scope(&self, name: &str, scope: Arc<dyn BeanScope>) -> BeansResult<()> {
        if matches!(Scope::from(name), Scope::Singleton | Scope::Prototype) {
            return Err(BeansError::configuration(format!(
                "不能替换内置作用域 '{name}'"
            )));
        }
        if self.scopes.insert(name.to_string(), scope).is_some() {
            warn!("替换已注册的作用域: {}", name);
        } else {
            info!("注册作用域: {}", name);
        }
        Ok(())
    }

    /// 已注册的作用域名称
    pub fn registered_scope_names(&self) -> Vec<String> {
        self.scopes.iter().map(|entry| entry.key().clone()).collect()
    }

    /// 单例的解析状态
    pub fn singleton_state(&self, name: &str) -> ResolutionState {
        let name = self.aliases.canonical_name(name);
        self.singletons
            .get(&name)
            .map_or(ResolutionState::Unseen, |slot| slot.state())
    }

    /// 按名称的完整别名列表
    pub fn get_aliases_of(&self, name: &str) -> Vec<String> {
        let canonical = self.aliases.canonical_name(name);
        let mut result = Vec::new();
        if canonical != name {
            result.push(canonical.clone());
        }
        result.extend(
            self.aliases
                .get_aliases(&canonical)
                .into_iter()
                .filter(|alias| alias != name),
        );
        result
    }

    /// 统计信息
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            registered_definitions: self.table.read().definitions.len(),
            registered_aliases: self.aliases.len(),
            active_singletons: self
                .singletons
                .iter()
                .filter(|entry| entry.value().instance().is_some())
                .count(),
            singletons_created: self.counters.singletons_created.load(Ordering::Relaxed),
            prototypes_created: self.counters.prototypes_created.load(Ordering::Relaxed),
            resolution_errors: self.counters.resolution_errors.load(Ordering::Relaxed),
        }
    }

    /// 校验全部定义：合并结果有效，依赖图（含按类型装配可确定的依赖）无环
    pub fn validate_dependencies(&self) -> BeansResult<()> {
        let names = self.table.read().names.clone();
        let mut definitions = Vec::with_capacity(names.len());
        for name in &names {
            definitions.push((name.clone(), self.merged_definition(name)?));
        }
        let graph = self.dependency_graph(&definitions);
        self.detector.detect_circular_dependencies(&graph)
    }

    /// 实例化全部非抽象、非懒加载的单例，按注册顺序
    pub async fn pre_instantiate_singletons(&self) -> BeansResult<()> {
        if self.config.enable_dependency_validation {
            self.validate_dependencies()?;
        }

        let names = self.table.read().names.clone();
        info!("预实例化单例，共 {} 个 Bean 定义", names.len());
        for name in names {
            let definition = self.merged_definition(&name)?;
            if definition.is_abstract() || !definition.is_singleton() || definition.is_lazy_init() {
                continue;
            }
            if let Err(err) = self.get_bean(&name).await {
                error!("预实例化单例失败: {}, 错误: {}", name, err);
                return Err(err);
            }
        }
        Ok(())
    }

    /// 关闭工厂并销毁全部单例，之后的获取返回非法状态错误
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Bean 工厂已经关闭");
            return;
        }
        self.destroy_singletons();
    }

    /// 工厂是否已经关闭
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 按创建顺序的逆序销毁全部单例，依赖方先于被依赖方
    pub fn destroy_singletons(&self) {
        let order = self.creation_order.lock().clone();
        info!("销毁单例，共 {} 个", order.len());
        for name in order.iter().rev() {
            self.destroy_singleton(name);
        }
        // 创建失败或仍在等待的槽位
        self.singletons.clear();
        self.creation_order.lock().clear();
        self.dependents.clear();
    }

    /// 销毁单个单例，先销毁依赖它的单例
    pub fn destroy_singleton(&self, name: &str) {
        let Some((_, slot)) = self.singletons.remove(name) else {
            return;
        };
        self.creation_order.lock().retain(|n| n != name);

        if let Some((_, dependents)) = self.dependents.remove(name) {
            for dependent in dependents {
                self.destroy_singleton(&dependent);
            }
        }

        self.destroy_slot(name, &slot);
    }

    fn destroy_slot(&self, name: &str, slot: &SingletonSlot) {
        let Some(instance) = slot.claim_for_destruction() else {
            return;
        };
        if let Some(method) = slot.destroy_method.as_deref() {
            match self.instantiator.invoke_destroy_method(name, instance, method) {
                Ok(()) => debug!("已调用销毁方法: {}.{}", name, method),
                // 销毁失败不影响其他单例
                Err(err) => warn!("销毁方法执行失败: {}.{}, 错误: {}", name, method, err),
            }
        }
        info!("销毁单例: {}", name);
    }

    fn assert_open(&self, name: &str) -> BeansResult<()> {
        if self.is_closed() {
            return Err(BeansError::illegal_state(format!(
                "Bean 工厂已经关闭，不能获取 Bean '{name}'"
            )));
        }
        Ok(())
    }

    fn parent(&self) -> Option<Arc<dyn AutowireCapableBeanFactory>> {
        self.parent.read().clone()
    }

    fn local_definition(&self, name: &str) -> Option<Arc<BeanDefinition>> {
        self.table.read().definitions.get(name).cloned()
    }

    /// 合并后的定义，`name` 必须是规范名称
    fn merged_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>> {
        if let Some(merged) = self.merged.get(name) {
            return Ok(Arc::clone(merged.value()));
        }

        let mut visited = Vec::new();
        let merged = Arc::new(self.merge_chain(name, &mut visited)?);
        merged.validate(name)?;
        self.merged.insert(name.to_string(), Arc::clone(&merged));
        Ok(merged)
    }

    fn merge_chain(&self, name: &str, visited: &mut Vec<String>) -> BeansResult<BeanDefinition> {
        if visited.iter().any(|n| n == name) {
            visited.push(name.to_string());
            return Err(BeansError::configuration(format!(
                "父定义形成循环: {}",
                visited.join(" -> ")
            )));
        }
        visited.push(name.to_string());

        let definition = self
            .local_definition(name)
            .ok_or_else(|| BeansError::not_found(name, "没有该名称的 Bean 定义"))?;

        let Some(parent_name) = definition.parent_name.as_deref() else {
            return Ok(definition.as_ref().clone());
        };

        let parent_name = self.aliases.canonical_name(parent_name);
        let parent = self.merge_chain(&parent_name, visited).map_err(|err| match err {
            BeansError::NotFound { .. } => BeansError::configuration(format!(
                "Bean '{name}' 的父定义 '{parent_name}' 不存在"
            )),
            other => other,
        })?;
        Ok(definition.merge_from_parent(&parent))
    }

    fn invalidate_merged(&self) {
        self.merged.clear();
    }

    fn register_dependent(&self, dependency: &str, dependent: &str) {
        self.dependents
            .entry(dependency.to_string())
            .or_default()
            .insert(dependent.to_string());
    }

    /// 依赖图：名称引用按规范名称，按类型装配的引用取可确定的唯一候选
    fn dependency_graph(
        &self,
        definitions: &[(String, Arc<BeanDefinition>)],
    ) -> Vec<DependencyGraphNode> {
        let mut graph = self.detector.build_dependency_graph(definitions);
        for (node, (_, definition)) in graph.iter_mut().zip(definitions) {
            let mut dependencies: Vec<String> = node
                .dependencies
                .iter()
                .map(|dep| self.aliases.canonical_name(dep))
                .collect();
            let autowired = definition
                .constructor_arguments
                .values()
                .chain(definition.property_values.iter().map(|pv| &pv.value))
                .filter_map(|value| match value {
                    BeanValue::Autowired(type_name) => Some(type_name.as_str()),
                    _ => None,
                });
            for type_name in autowired {
                if let Ok(Some(candidate)) =
                    self.determine_local_candidate(type_name, Some(node.name.as_str()))
                {
                    if !dependencies.contains(&candidate) {
                        dependencies.push(candidate);
                    }
                }
            }
            node.dependencies = dependencies;
        }
        graph
    }

    /// 检查从 `name` 可达的依赖子图是否有环
    fn check_reachable_cycles(&self, name: &str) -> BeansResult<()> {
        let mut graph = Vec::new();
        let mut seen = HashSet::from([name.to_string()]);
        let mut queue = VecDeque::from([name.to_string()]);

        while let Some(current) = queue.pop_front() {
            // 不在本地的名称视为叶子节点
            let Ok(definition) = self.merged_definition(&current) else {
                continue;
            };
            for node in self.dependency_graph(&[(current, definition)]) {
                for dep in &node.dependencies {
                    if seen.insert(dep.clone()) {
                        queue.push_back(dep.clone());
                    }
                }
                graph.push(node);
            }
        }

        self.detector.detect_circular_dependencies(&graph)
    }

    /// 本地候选名称：产出类型匹配、非抽象、参与自动装配
    fn autowire_candidates(&self, type_name: &str, requesting: Option<&str>) -> Vec<String> {
        let names = self.table.read().names.clone();
        let mut candidates: Vec<String> = names
            .into_iter()
            .filter(|name| Some(name.as_str()) != requesting)
            .filter(|name| {
                self.merged_definition(name).is_ok_and(|def| {
                    !def.is_abstract() && def.autowire_candidate && def.matches_type(type_name)
                })
            })
            .collect();

        for entry in &self.singletons {
            let slot = entry.value();
            if slot.manual
                && Some(entry.key().as_str()) != requesting
                && !candidates.contains(entry.key())
                && slot
                    .type_name
                    .as_deref()
                    .is_some_and(|t| TypeInfo::from_name(t).matches(type_name))
            {
                candidates.push(entry.key().clone());
            }
        }
        candidates
    }

    /// 按优先规则确定唯一候选，没有候选时返回 `None`
    fn determine_local_candidate(
        &self,
        type_name: &str,
        requesting: Option<&str>,
    ) -> BeansResult<Option<String>> {
        let candidates = self.autowire_candidates(type_name, requesting);
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.into_iter().next()),
            _ => {
                let primaries: Vec<&String> = candidates
                    .iter()
                    .filter(|name| {
                        self.merged_definition(name)
                            .is_ok_and(|def| def.primary)
                    })
                    .collect();
                if primaries.len() == 1 {
                    return Ok(Some(primaries[0].clone()));
                }
                Err(BeansError::AmbiguousDependency {
                    type_name: type_name.to_string(),
                    candidates,
                })
            }
        }
    }

    fn resolve_dependency_in<'a>(
        &'a self,
        type_name: &'a str,
        ctx: &'a ResolveContext,
        requesting: Option<&'a str>,
    ) -> BoxFuture<'a, BeansResult<(String, BeanInstance)>> {
        Box::pin(async move {
            match self.determine_local_candidate(type_name, requesting)? {
                Some(name) => {
                    debug!("按类型 {} 装配: {}", type_name, name);
                    let instance = self.do_get_bean(&name, ctx).await?;
                    Ok((name, instance))
                }
                None => match self.parent() {
                    Some(parent) => parent.resolve_dependency(type_name).await,
                    None => Err(BeansError::not_found(
                        type_name,
                        "没有该类型的自动装配候选",
                    )),
                },
            }
        })
    }

    fn do_get_bean<'a>(
        &'a self,
        name: &'a str,
        ctx: &'a ResolveContext,
    ) -> BoxFuture<'a, BeansResult<BeanInstance>> {
        Box::pin(async move {
            self.assert_open(name)?;
            let canonical = self.aliases.canonical_name(name);

            let cached = self.singletons.get(&canonical).map(|slot| Arc::clone(slot.value()));
            if let Some(result) = cached.as_ref().and_then(|slot| slot.cell.get()) {
                return result.clone();
            }

            let definition = match self.merged_definition(&canonical) {
                Ok(definition) => definition,
                Err(local) if local.is_not_found() => {
                    let Some(parent) = self.parent() else {
                        return Err(local);
                    };
                    debug!("本地不存在 Bean '{}'，委托父工厂", name);
                    return match parent.get_bean(name).await {
                        Err(err) if err.is_not_found() => Err(local),
                        other => other,
                    };
                }
                Err(err) => return Err(err),
            };

            if definition.is_abstract() {
                return Err(BeansError::BeanIsAbstract {
                    bean_name: canonical,
                });
            }

            let ctx = ctx.enter(&canonical)?;

            match definition.scope() {
                Scope::Singleton => self.get_singleton(&canonical, &definition, &ctx).await,
                Scope::Prototype => {
                    let bean = self.create_bean(&canonical, &definition, &ctx).await?;
                    self.counters.prototypes_created.fetch_add(1, Ordering::Relaxed);
                    debug!("创建原型 Bean: {}", canonical);
                    Ok(bean)
                }
                Scope::Custom(scope_name) => {
                    let scope = self
                        .scopes
                        .get(&scope_name)
                        .map(|entry| Arc::clone(entry.value()))
                        .ok_or_else(|| {
                            BeansError::illegal_state(format!(
                                "Bean '{canonical}' 使用的作用域 '{scope_name}' 未注册"
                            ))
                        })?;
                    scope
                        .get(
                            &canonical,
                            Box::pin(self.create_bean(&canonical, &definition, &ctx)),
                        )
                        .await
                }
            }
        })
    }

    async fn get_singleton(
        &self,
        name: &str,
        definition: &Arc<BeanDefinition>,
        ctx: &ResolveContext,
    ) -> BeansResult<BeanInstance> {
        let existing = self.singletons.get(name).map(|slot| Arc::clone(slot.value()));
        let initialized = existing.as_ref().is_some_and(|slot| slot.cell.initialized());
        // 其他任务可能正持有该槽位并等待本任务持有的槽位
        if !initialized {
            self.check_reachable_cycles(name)?;
        }

        let slot = match existing {
            Some(slot) => slot,
            None => {
                let entry = self.singletons.entry(name.to_string()).or_insert_with(|| {
                    Arc::new(SingletonSlot::pending(definition.destroy_method_name.clone()))
                });
                Arc::clone(entry.value())
            }
        };

        let result = slot
            .cell
            .get_or_init(|| async {
                debug!("创建单例 Bean: {}", name);
                let result = self.create_bean(name, definition, ctx).await;
                match &result {
                    Ok(_) => {
                        let mut order = self.creation_order.lock();
                        if !self.is_closed() {
                            order.push(name.to_string());
                        }
                        self.counters.singletons_created.fetch_add(1, Ordering::Relaxed);
                        info!("单例 Bean 创建完成: {}", name);
                    }
                    Err(err) => warn!("单例 Bean 创建失败: {}, 错误: {}", name, err),
                }
                result
            })
            .await;

        if self.is_closed() {
            // 销毁流程没有领取到的实例在这里销毁
            self.singletons.remove_if(name, |_, current| Arc::ptr_eq(current, &slot));
            self.destroy_slot(name, &slot);
            return Err(BeansError::illegal_state(format!(
                "Bean 工厂在创建 '{name}' 期间关闭"
            )));
        }
        result.clone()
    }

    async fn create_bean(
        &self,
        name: &str,
        definition: &BeanDefinition,
        ctx: &ResolveContext,
    ) -> BeansResult<BeanInstance> {
        for dependency in &definition.depends_on {
            let dependency = self.aliases.canonical_name(dependency);
            self.register_dependent(&dependency, name);
            self.do_get_bean(&dependency, ctx).await?;
        }

        let (factory_bean, factory_bean_type) = match definition.factory_bean_name.as_deref() {
            Some(factory_name) => {
                let factory_name = self.aliases.canonical_name(factory_name);
                self.register_dependent(&factory_name, name);
                let instance = self.do_get_bean(&factory_name, ctx).await?;
                (Some(instance), self.get_type(&factory_name).ok().flatten())
            }
            None => (None, None),
        };

        let arguments = self.resolve_arguments(name, definition, ctx).await?;
        let request = InstantiationRequest {
            bean_name: name,
            definition,
            arguments,
            factory_bean,
            factory_bean_type,
        };
        let mut bean = self.instantiator.instantiate(&request)?;

        let processors = self.post_processors.read().clone();
        for processor in &processors {
            bean = processor.post_process_before_initialization(bean, name, definition)?;
        }

        if let Some(method) = definition.init_method_name.as_deref() {
            debug!("调用初始化方法: {}.{}", name, method);
            self.instantiator.invoke_init_method(name, &bean, method)?;
        }

        for processor in &processors {
            bean = processor.post_process_after_initialization(bean, name, definition)?;
        }

        Ok(bean)
    }

    async fn resolve_arguments(
        &self,
        name: &str,
        definition: &BeanDefinition,
        ctx: &ResolveContext,
    ) -> BeansResult<ResolvedArguments> {
        let mut arguments = ResolvedArguments::new(name);
        for (index, value) in &definition.constructor_arguments.indexed {
            let resolved = self.resolve_value(name, value, ctx).await?;
            arguments.indexed.insert(*index, resolved);
        }
        for (arg_name, value) in &definition.constructor_arguments.named {
            let resolved = self.resolve_value(name, value, ctx).await?;
            arguments.named.insert(arg_name.clone(), resolved);
        }
        for property in definition.property_values.iter() {
            let resolved = self.resolve_value(name, &property.value, ctx).await?;
            arguments.properties.push((property.name.clone(), resolved));
        }
        Ok(arguments)
    }

    async fn resolve_value(
        &self,
        name: &str,
        value: &BeanValue,
        ctx: &ResolveContext,
    ) -> BeansResult<ResolvedValue> {
        match value {
            BeanValue::Literal(literal) => Ok(ResolvedValue::Value(literal.clone())),
            BeanValue::Reference(reference) => {
                let reference = self.aliases.canonical_name(reference);
                self.register_dependent(&reference, name);
                let instance = self.do_get_bean(&reference, ctx).await?;
                Ok(ResolvedValue::Bean {
                    name: reference,
                    instance,
                })
            }
            BeanValue::Autowired(type_name) => {
                let (candidate, instance) =
                    self.resolve_dependency_in(type_name, ctx, Some(name)).await?;
                self.register_dependent(&candidate, name);
                Ok(ResolvedValue::Bean {
                    name: candidate,
                    instance,
                })
            }
        }
    }

    fn record_error<T>(&self, result: BeansResult<T>) -> BeansResult<T> {
        if result.is_err() {
            self.counters.resolution_errors.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        info!("添加 Bean 后处理器: {}", processor.name());
        let mut processors = self.post_processors.write();
        processors.push(processor);
        processors.sort_by_key(|p| p.order());
    }

    fn bean_post_processor_count(&self) -> usize {
        self.post_processors.read().len()
    }

    fn register_singleton_instance(
        &self,
        name: &str,
        instance: BeanInstance,
        type_name: Option<String>,
    ) -> BeansResult<()> {
        if name.is_empty() {
            return Err(BeansError::configuration("单例名称不能为空"));
        }
        self.assert_open(name)?;
        let name = self.aliases.canonical_name(name);
        match self.singletons.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(BeansError::conflict(&name, "该名称已经存在单例实例"));
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(SingletonSlot::manual(instance, type_name)));
            }
        }
        self.creation_order.lock().push(name.clone());
        info!("注册单例实例: {}", name);
        Ok(())
    }

    fn capabilities(&self) -> Arc<CapabilityRegistry> {
        Arc::clone(&self.capabilities)
    }
}

impl AliasRegistry for DefaultListableBeanFactory {
    fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()> {
        if name != alias && self.table.read().definitions.contains_key(alias) {
            return Err(BeansError::conflict(
                alias,
                "别名与已注册的 Bean 定义名称相同",
            ));
        }
        self.aliases.register_alias(name, alias)
    }

    fn remove_alias(&self, alias: &str) -> BeansResult<()> {
        self.aliases.remove_alias(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.aliases.is_alias(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        self.aliases.get_aliases(name)
    }

    fn canonical_name(&self, name: &str) -> String {
        self.aliases.canonical_name(name)
    }
}

impl BeanDefinitionRegistry for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()> {
        if name.is_empty() {
            return Err(BeansError::configuration("Bean 名称不能为空"));
        }
        definition.validate(name)?;
        if self.aliases.is_alias(name) {
            return Err(BeansError::conflict(name, "名称已被别名占用"));
        }

        let mut table = self.table.write();
        let existing_class = table
            .definitions
            .get(name)
            .map(|existing| existing.bean_class_name.clone());
        if let Some(existing_class) = existing_class {
            if !self.config.allow_bean_definition_overriding {
                return Err(BeansError::conflict(
                    name,
                    "已存在同名 Bean 定义，且不允许覆盖",
                ));
            }

            let live = self
                .singletons
                .get(name)
                .is_some_and(|slot| !slot.manual && slot.instance().is_some());
            if live {
                if !self.config.allow_live_singleton_override {
                    return Err(BeansError::conflict(
                        name,
                        "该单例已经实例化，覆盖其定义会使现有实例失效",
                    ));
                }
                warn!("覆盖已实例化单例的定义: {}", name);
                drop(table);
                self.destroy_singleton(name);
                table = self.table.write();
            } else {
                info!(
                    "覆盖 Bean 定义: {} ({:?} -> {:?})",
                    name, existing_class, definition.bean_class_name
                );
            }
        }

        // 缓存的失败结果随旧定义一起失效
        if self
            .singletons
            .get(name)
            .is_some_and(|slot| slot.state() == ResolutionState::Failed)
        {
            self.singletons.remove(name);
        }

        if table
            .definitions
            .insert(name.to_string(), Arc::new(definition))
            .is_none()
        {
            table.names.push(name.to_string());
        }
        drop(table);
        self.invalidate_merged();
        info!("注册 Bean 定义: {}", name);
        Ok(())
    }

    fn replace_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()> {
        definition.validate(name)?;
        if self
            .singletons
            .get(name)
            .is_some_and(|slot| slot.instance().is_some())
        {
            return Err(BeansError::conflict(
                name,
                "该单例已经实例化，不能替换其定义",
            ));
        }
        {
            let mut table = self.table.write();
            let Some(slot) = table.definitions.get_mut(name) else {
                return Err(BeansError::not_found(name, "没有该名称的 Bean 定义"));
            };
            *slot = Arc::new(definition);
        }
        self.invalidate_merged();
        debug!("替换 Bean 定义: {}", name);
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> BeansResult<()> {
        {
            let mut table = self.table.write();
            if table.definitions.remove(name).is_none() {
                return Err(BeansError::not_found(name, "没有该名称的 Bean 定义"));
            }
            table.names.retain(|n| n != name);
        }
        self.destroy_singleton(name);
        self.invalidate_merged();
        info!("移除 Bean 定义: {}", name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>> {
        let canonical = self.aliases.canonical_name(name);
        self.local_definition(&canonical)
            .ok_or_else(|| BeansError::not_found(name, "没有该名称的 Bean 定义"))
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.table.read().definitions.contains_key(name)
    }
}

#[async_trait]
impl BeanFactory for DefaultListableBeanFactory {
    async fn get_bean(&self, name: &str) -> BeansResult<BeanInstance> {
        let ctx = ResolveContext::new(self.config.max_resolution_depth);
        let result = self.do_get_bean(name, &ctx).await;
        self.record_error(result)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.contains_local_bean(name)
            || self.parent().is_some_and(|parent| parent.contains_bean(name))
    }

    fn is_singleton(&self, name: &str) -> BeansResult<bool> {
        let canonical = self.aliases.canonical_name(name);
        if self.singletons.get(&canonical).is_some_and(|slot| slot.manual) {
            return Ok(true);
        }
        match self.merged_definition(&canonical) {
            Ok(definition) => Ok(definition.is_singleton()),
            Err(local) if local.is_not_found() => match self.parent() {
                Some(parent) => parent
                    .is_singleton(name)
                    .map_err(|err| if err.is_not_found() { local } else { err }),
                None => Err(local),
            },
            Err(err) => Err(err),
        }
    }

    fn is_prototype(&self, name: &str) -> BeansResult<bool> {
        let canonical = self.aliases.canonical_name(name);
        if self.singletons.get(&canonical).is_some_and(|slot| slot.manual) {
            return Ok(false);
        }
        match self.merged_definition(&canonical) {
            Ok(definition) => Ok(definition.is_prototype()),
            Err(local) if local.is_not_found() => match self.parent() {
                Some(parent) => parent
                    .is_prototype(name)
                    .map_err(|err| if err.is_not_found() { local } else { err }),
                None => Err(local),
            },
            Err(err) => Err(err),
        }
    }

    fn get_type(&self, name: &str) -> BeansResult<Option<String>> {
        let canonical = self.aliases.canonical_name(name);
        if let Some(slot) = self.singletons.get(&canonical) {
            if slot.manual {
                return Ok(slot.type_name.clone());
            }
        }
        match self.merged_definition(&canonical) {
            Ok(definition) => Ok(definition.resolved_type_name().map(str::to_string)),
            Err(local) if local.is_not_found() => match self.parent() {
                Some(parent) => parent
                    .get_type(name)
                    .map_err(|err| if err.is_not_found() { local } else { err }),
                None => Err(local),
            },
            Err(err) => Err(err),
        }
    }
}

impl HierarchicalBeanFactory for DefaultListableBeanFactory {
    fn parent_bean_factory(&self) -> Option<Arc<dyn AutowireCapableBeanFactory>> {
        self.parent()
    }

    fn contains_local_bean(&self, name: &str) -> bool {
        let canonical = self.aliases.canonical_name(name);
        self.contains_bean_definition(&canonical) || self.singletons.contains_key(&canonical)
    }
}

#[async_trait]
impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_definition_names(&self) -> Vec<String> {
        self.table.read().names.clone()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.table.read().definitions.len()
    }

    fn get_bean_names_for_type(
        &self,
        type_name: &str,
        include_non_singletons: bool,
    ) -> Vec<String> {
        let names = self.get_bean_definition_names();
        let mut result: Vec<String> = names
            .into_iter()
            .filter(|name| {
                self.merged_definition(name).is_ok_and(|def| {
                    !def.is_abstract()
                        && (include_non_singletons || def.is_singleton())
                        && def.matches_type(type_name)
                })
            })
            .collect();

        for entry in &self.singletons {
            let slot = entry.value();
            if slot.manual
                && !result.contains(entry.key())
                && slot
                    .type_name
                    .as_deref()
                    .is_some_and(|t| TypeInfo::from_name(t).matches(type_name))
            {
                result.push(entry.key().clone());
            }
        }
        result
    }

    async fn get_beans_of_type(&self, type_name: &str) -> BeansResult<Vec<(String, BeanInstance)>> {
        let names = self.get_bean_names_for_type(type_name, true);
        let mut beans = Vec::with_capacity(names.len());
        for name in names {
            let instance = self.get_bean(&name).await?;
            beans.push((name, instance));
        }
        Ok(beans)
    }

    fn get_merged_bean_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>> {
        let canonical = self.aliases.canonical_name(name);
        self.merged_definition(&canonical)
    }
}

#[async_trait]
impl AutowireCapableBeanFactory for DefaultListableBeanFactory {
    async fn resolve_dependency(&self, type_name: &str) -> BeansResult<(String, BeanInstance)> {
        let ctx = ResolveContext::new(self.config.max_resolution_depth);
        let result = self.resolve_dependency_in(type_name, &ctx, None).await;
        self.record_error(result)
    }
}
