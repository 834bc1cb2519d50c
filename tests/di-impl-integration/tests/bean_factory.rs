//! Bean 工厂集成测试：别名、作用域、循环依赖、并发单例、自动装配与父子工厂

use anyhow::Result;
use di_abstractions::{
    AliasRegistry, AutowireCapableBeanFactory, AutowireCapableBeanFactoryExt, BeanDefinition,
    BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, BeanPostProcessor, BeanValue,
    ConfigurableBeanFactory, ContainerConfig, HierarchicalBeanFactory, Instantiator, ListableBeanFactory,
    ListableBeanFactoryExt,
};
use di_impl::{DefaultInstantiator, DefaultListableBeanFactory};
use infrastructure_common::{BeanInstance, BeansError, BeansResult, ResolutionState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct DataSource {
    url: String,
}

#[derive(Debug)]
struct OrderRepository {
    data_source: Arc<DataSource>,
}

#[derive(Debug)]
struct Node;

/// 记录事件顺序的日志
#[derive(Debug, Default, Clone)]
struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

fn new_factory(instantiator: &Arc<DefaultInstantiator>) -> DefaultListableBeanFactory {
    DefaultListableBeanFactory::with_instantiator(
        ContainerConfig::default(),
        Arc::clone(instantiator) as Arc<dyn Instantiator>,
    )
}

fn node_factory() -> (DefaultListableBeanFactory, Arc<DefaultInstantiator>) {
    let instantiator = Arc::new(DefaultInstantiator::new());
    instantiator.register_constructor("test::Node", |_| Ok(Arc::new(Node) as BeanInstance));
    (new_factory(&instantiator), instantiator)
}

#[tokio::test]
async fn alias_registration_and_removal() -> Result<()> {
    let (factory, _) = node_factory();
    factory.register_bean_definition("dataSource", BeanDefinition::new("test::Node"))?;
    factory.register_alias("dataSource", "ds")?;

    assert!(factory.get_aliases("dataSource").contains(&"ds".to_string()));
    let by_alias = factory.get_bean("ds").await?;
    let by_name = factory.get_bean("dataSource").await?;
    assert!(Arc::ptr_eq(&by_alias, &by_name));

    factory.remove_alias("ds")?;
    assert!(!factory.is_alias("ds"));
    assert!(factory.get_bean("ds").await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn depends_on_cycle_fails_instead_of_hanging() {
    let (factory, _) = node_factory();
    factory
        .register_bean_definition("a", BeanDefinition::new("test::Node").with_depends_on(["x"]))
        .unwrap();
    factory
        .register_bean_definition("x", BeanDefinition::new("test::Node").with_depends_on(["a"]))
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), factory.get_bean("a"))
        .await
        .expect("循环依赖解析不应挂起");
    let err = result.unwrap_err();
    assert!(err.is_circular_dependency(), "意外的错误: {err}");

    assert!(factory.validate_dependencies().unwrap_err().is_circular_dependency());
}

#[tokio::test]
async fn reference_cycle_is_detected_on_the_resolution_path_without_validation() {
    let instantiator = Arc::new(DefaultInstantiator::new());
    instantiator.register_constructor("test::Node", |_| Ok(Arc::new(Node) as BeanInstance));
    let factory = DefaultListableBeanFactory::with_instantiator(
        ContainerConfig {
            enable_dependency_validation: false,
            ..ContainerConfig::default()
        },
        Arc::clone(&instantiator) as Arc<dyn Instantiator>,
    );
    factory
        .register_bean_definition(
            "left",
            BeanDefinition::new("test::Node").with_property("peer", BeanValue::reference("right")),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "right",
            BeanDefinition::new("test::Node")
                .prototype()
                .with_constructor_arg(0, BeanValue::reference("left")),
        )
        .unwrap();

    match factory.get_bean("left").await.unwrap_err() {
        BeansError::CircularDependency { chain, .. } => {
            assert_eq!(chain, "left -> right -> left");
        }
        other => panic!("意外的错误: {other}"),
    }
}

#[tokio::test]
async fn singleton_is_shared_and_prototype_is_fresh() -> Result<()> {
    let (factory, _) = node_factory();
    factory.register_bean_definition("shared", BeanDefinition::new("test::Node"))?;
    factory.register_bean_definition("fresh", BeanDefinition::new("test::Node").prototype())?;

    let first = factory.get_bean("shared").await?;
    let second = factory.get_bean("shared").await?;
    assert!(Arc::ptr_eq(&first, &second));

    let first = factory.get_bean("fresh").await?;
    let second = factory.get_bean("fresh").await?;
    assert!(!Arc::ptr_eq(&first, &second));

    let stats = factory.stats();
    assert_eq!(stats.singletons_created, 1);
    assert_eq!(stats.prototypes_created, 2);
    assert_eq!(factory.singleton_state("fresh"), ResolutionState::Unseen);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_first_requests_construct_once() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructions);
    let instantiator = Arc::new(DefaultInstantiator::new());
    instantiator.register_type::<DataSource, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        Ok(DataSource {
            url: "postgres://primary".to_string(),
        })
    });
    let factory = Arc::new(new_factory(&instantiator));
    factory
        .register_bean_definition("dataSource", BeanDefinition::for_type::<DataSource>())
        .unwrap();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let factory = Arc::clone(&factory);
            tokio::spawn(async move { factory.get_bean("dataSource").await })
        })
        .collect();

    let mut instances = Vec::new();
    for handle in handles {
        instances.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|bean| Arc::ptr_eq(bean, &instances[0])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cross_task_reference_cycle_does_not_deadlock() {
    let (factory, _) = node_factory();
    let factory = Arc::new(factory);
    factory
        .register_bean_definition(
            "ping",
            BeanDefinition::new("test::Node").with_property("next", BeanValue::reference("pong")),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "pong",
            BeanDefinition::new("test::Node").with_property("next", BeanValue::reference("ping")),
        )
        .unwrap();

    let ping = tokio::spawn({
        let factory = Arc::clone(&factory);
        async move { factory.get_bean("ping").await }
    });
    let pong = tokio::spawn({
        let factory = Arc::clone(&factory);
        async move { factory.get_bean("pong").await }
    });

    let (ping, pong) = tokio::time::timeout(Duration::from_secs(5), async {
        (ping.await.unwrap(), pong.await.unwrap())
    })
    .await
    .expect("并发解析循环依赖不应死锁");
    assert!(ping.unwrap_err().is_circular_dependency());
    assert!(pong.unwrap_err().is_circular_dependency());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cross_task_cycle_fails_with_validation_disabled() {
    let instantiator = Arc::new(DefaultInstantiator::new());
    instantiator.register_constructor("test::Node", |_| Ok(Arc::new(Node) as BeanInstance));
    instantiator.register_constructor("test::Slow", |_| {
        std::thread::sleep(Duration::from_millis(100));
        Ok(Arc::new(Node) as BeanInstance)
    });
    let factory = Arc::new(DefaultListableBeanFactory::with_instantiator(
        ContainerConfig {
            enable_dependency_validation: false,
            ..ContainerConfig::default()
        },
        Arc::clone(&instantiator) as Arc<dyn Instantiator>,
    ));
    for name in ["slowA", "slowB"] {
        factory
            .register_bean_definition(name, BeanDefinition::new("test::Slow"))
            .unwrap();
    }
    factory
        .register_bean_definition(
            "ping",
            BeanDefinition::new("test::Node")
                .with_depends_on(["slowA"])
                .with_property("next", BeanValue::reference("pong")),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "pong",
            BeanDefinition::new("test::Node")
                .with_depends_on(["slowB"])
                .with_property("next", BeanValue::reference("ping")),
        )
        .unwrap();

    let ping = tokio::spawn({
        let factory = Arc::clone(&factory);
        async move { factory.get_bean("ping").await }
    });
    let pong = tokio::spawn({
        let factory = Arc::clone(&factory);
        async move { factory.get_bean("pong").await }
    });

    let (ping, pong) = tokio::time::timeout(Duration::from_secs(5), async {
        (ping.await.unwrap(), pong.await.unwrap())
    })
    .await
    .expect("关闭依赖检查后并发解析循环依赖也不应死锁");
    assert!(ping.unwrap_err().is_circular_dependency());
    assert!(pong.unwrap_err().is_circular_dependency());
    assert_eq!(factory.singleton_state("ping"), ResolutionState::Unseen);
}

fn data_source_factory() -> (DefaultListableBeanFactory, Arc<DefaultInstantiator>) {
    let instantiator = Arc::new(DefaultInstantiator::new());
    instantiator.register_type::<DataSource, _>(|args| {
        Ok(DataSource {
            url: args.value(0)?,
        })
    });
    instantiator.register_type::<OrderRepository, _>(|args| {
        Ok(OrderRepository {
            data_source: args.named_bean("dataSource")?,
        })
    });
    (new_factory(&instantiator), instantiator)
}

fn data_source(url: &str) -> BeanDefinition {
    BeanDefinition::for_type::<DataSource>().with_constructor_arg(0, BeanValue::literal(url))
}

#[tokio::test]
async fn primary_candidate_wins_type_based_lookup() -> Result<()> {
    let (factory, _) = data_source_factory();
    factory.register_bean_definition("replica", data_source("postgres://replica"))?;
    factory.register_bean_definition(
        "primary",
        data_source("postgres://primary").with_primary(true),
    )?;
    factory.register_bean_definition(
        "orders",
        BeanDefinition::for_type::<OrderRepository>()
            .with_named_arg("dataSource", BeanValue::autowired::<DataSource>()),
    )?;

    let (name, _) = factory
        .resolve_dependency(std::any::type_name::<DataSource>())
        .await?;
    assert_eq!(name, "primary");

    let orders = factory.get_bean_typed::<OrderRepository>("orders").await?;
    assert_eq!(orders.data_source.url, "postgres://primary");

    let all = factory.get_beans_of::<DataSource>().await?;
    assert_eq!(all.len(), 2);
    Ok(())
}

#[tokio::test]
async fn zero_or_multiple_primaries_are_ambiguous() {
    let (factory, _) = data_source_factory();
    factory
        .register_bean_definition("a", data_source("postgres://a"))
        .unwrap();
    factory
        .register_bean_definition("b", data_source("postgres://b"))
        .unwrap();

    let err = factory.get_bean_of_type::<DataSource>().await.unwrap_err();
    match err {
        BeansError::AmbiguousDependency { candidates, .. } => {
            assert_eq!(candidates, vec!["a", "b"]);
        }
        other => panic!("意外的错误: {other}"),
    }

    factory
        .register_bean_definition("a", data_source("postgres://a").with_primary(true))
        .unwrap();
    factory
        .register_bean_definition("b", data_source("postgres://b").with_primary(true))
        .unwrap();
    assert!(matches!(
        factory.get_bean_of_type::<DataSource>().await.unwrap_err(),
        BeansError::AmbiguousDependency { .. }
    ));
}

#[tokio::test]
async fn non_candidates_are_skipped_by_type_but_reachable_by_name() -> Result<()> {
    let (factory, _) = data_source_factory();
    factory.register_bean_definition("main", data_source("postgres://main"))?;
    factory.register_bean_definition(
        "audit",
        data_source("postgres://audit").with_autowire_candidate(false),
    )?;

    let by_type = factory.get_bean_of_type::<DataSource>().await?;
    assert_eq!(by_type.url, "postgres://main");

    let by_name = factory.get_bean_typed::<DataSource>("audit").await?;
    assert_eq!(by_name.url, "postgres://audit");
    Ok(())
}

#[tokio::test]
async fn child_definitions_shadow_parent_definitions() -> Result<()> {
    let (parent, _) = data_source_factory();
    parent.register_bean_definition("dataSource", data_source("postgres://parent"))?;
    parent.register_bean_definition("parentOnly", data_source("postgres://shared"))?;
    let parent = Arc::new(parent);

    let (child, _) = data_source_factory();
    child.register_bean_definition("dataSource", data_source("postgres://child"))?;
    child.set_parent_bean_factory(Arc::clone(&parent) as Arc<dyn AutowireCapableBeanFactory>)?;

    assert!(child.contains_local_bean("dataSource"));
    assert!(parent.contains_local_bean("dataSource"));
    assert!(!child.contains_local_bean("parentOnly"));
    assert!(child.contains_bean("parentOnly"));

    let local = child.get_bean_typed::<DataSource>("dataSource").await?;
    assert_eq!(local.url, "postgres://child");

    let inherited = child.get_bean_typed::<DataSource>("parentOnly").await?;
    let from_parent = parent.get_bean_typed::<DataSource>("parentOnly").await?;
    assert!(Arc::ptr_eq(&inherited, &from_parent));

    match child.get_bean("missing").await.unwrap_err() {
        BeansError::NotFound { name, .. } => assert_eq!(name, "missing"),
        other => panic!("意外的错误: {other}"),
    }
    assert!(child.parent_bean_factory().is_some());
    Ok(())
}

#[tokio::test]
async fn autowiring_falls_back_to_parent_factory() -> Result<()> {
    let (parent, _) = data_source_factory();
    parent.register_bean_definition("dataSource", data_source("postgres://parent"))?;

    let (child, _) = data_source_factory();
    child.set_parent_bean_factory(Arc::new(parent))?;
    child.register_bean_definition(
        "orders",
        BeanDefinition::for_type::<OrderRepository>()
            .with_named_arg("dataSource", BeanValue::autowired::<DataSource>()),
    )?;

    let orders = child.get_bean_typed::<OrderRepository>("orders").await?;
    assert_eq!(orders.data_source.url, "postgres://parent");
    Ok(())
}

#[tokio::test]
async fn depends_on_orders_initialization_and_reverse_destruction() -> Result<()> {
    #[derive(Debug)]
    struct Step(&'static str);

    let log = EventLog::default();
    let instantiator = Arc::new(DefaultInstantiator::new());
    for name in ["schema", "cache", "app"] {
        let log = log.clone();
        instantiator.register_constructor(format!("test::{name}"), move |_| {
            log.push(format!("create:{name}"));
            Ok(Arc::new(Step(name)) as BeanInstance)
        });
    }
    let destroy_log = log.clone();
    instantiator.register_destroy_method::<Step, _>("close", move |step| {
        destroy_log.push(format!("destroy:{}", step.0));
        Ok(())
    });

    let factory = new_factory(&instantiator);
    factory.register_bean_definition(
        "app",
        BeanDefinition::new("test::app")
            .with_depends_on(["schema", "cache"])
            .with_destroy_method("close"),
    )?;
    factory.register_bean_definition(
        "cache",
        BeanDefinition::new("test::cache")
            .with_depends_on(["schema"])
            .with_destroy_method("close"),
    )?;
    factory.register_bean_definition(
        "schema",
        BeanDefinition::new("test::schema").with_destroy_method("close"),
    )?;

    factory.pre_instantiate_singletons().await?;
    factory.destroy_singletons();

    assert_eq!(
        log.events(),
        vec![
            "create:schema",
            "create:cache",
            "create:app",
            "destroy:app",
            "destroy:cache",
            "destroy:schema",
        ]
    );
    assert_eq!(factory.stats().active_singletons, 0);
    Ok(())
}

#[tokio::test]
async fn lazy_singletons_are_created_on_first_request() -> Result<()> {
    let (factory, _) = node_factory();
    factory.register_bean_definition("eager", BeanDefinition::new("test::Node"))?;
    factory.register_bean_definition(
        "lazy",
        BeanDefinition::new("test::Node").with_lazy_init(true),
    )?;

    factory.pre_instantiate_singletons().await?;
    assert_eq!(factory.singleton_state("eager"), ResolutionState::Resolved);
    assert_eq!(factory.singleton_state("lazy"), ResolutionState::Unseen);

    factory.get_bean("lazy").await?;
    assert_eq!(factory.singleton_state("lazy"), ResolutionState::Resolved);
    Ok(())
}

#[tokio::test]
async fn post_processors_wrap_around_init_method() -> Result<()> {
    struct Recording {
        log: EventLog,
        order: i32,
        tag: &'static str,
    }

    impl BeanPostProcessor for Recording {
        fn post_process_before_initialization(
            &self,
            bean: BeanInstance,
            bean_name: &str,
            _definition: &BeanDefinition,
        ) -> BeansResult<BeanInstance> {
            self.log.push(format!("{}:before:{bean_name}", self.tag));
            Ok(bean)
        }

        fn post_process_after_initialization(
            &self,
            bean: BeanInstance,
            bean_name: &str,
            _definition: &BeanDefinition,
        ) -> BeansResult<BeanInstance> {
            self.log.push(format!("{}:after:{bean_name}", self.tag));
            Ok(bean)
        }

        fn order(&self) -> i32 {
            self.order
        }
    }

    let log = EventLog::default();
    let (factory, instantiator) = node_factory();
    let init_log = log.clone();
    instantiator.register_init_method::<Node, _>("start", move |_| {
        init_log.push("init:service");
        Ok(())
    });
    factory.add_bean_post_processor(Arc::new(Recording {
        log: log.clone(),
        order: 10,
        tag: "late",
    }));
    factory.add_bean_post_processor(Arc::new(Recording {
        log: log.clone(),
        order: -10,
        tag: "early",
    }));
    factory.register_bean_definition(
        "service",
        BeanDefinition::new("test::Node").with_init_method("start"),
    )?;

    factory.get_bean("service").await?;
    assert_eq!(
        log.events(),
        vec![
            "early:before:service",
            "late:before:service",
            "init:service",
            "early:after:service",
            "late:after:service",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn parent_definition_template_is_merged() -> Result<()> {
    let (factory, _) = data_source_factory();
    factory.register_bean_definition(
        "baseDataSource",
        data_source("postgres://template").with_abstract(true),
    )?;
    factory.register_bean_definition("tenantDataSource", BeanDefinition::child_of("baseDataSource"))?;
    factory.register_bean_definition(
        "reportDataSource",
        BeanDefinition::child_of("baseDataSource")
            .with_constructor_arg(0, BeanValue::literal("postgres://reports")),
    )?;

    let tenant = factory
        .get_bean_typed::<DataSource>("tenantDataSource")
        .await?;
    assert_eq!(tenant.url, "postgres://template");
    let reports = factory
        .get_bean_typed::<DataSource>("reportDataSource")
        .await?;
    assert_eq!(reports.url, "postgres://reports");

    assert!(matches!(
        factory.get_bean("baseDataSource").await.unwrap_err(),
        BeansError::BeanIsAbstract { .. }
    ));
    assert_eq!(
        factory.get_bean_names_for_type("DataSource", true),
        vec!["tenantDataSource", "reportDataSource"]
    );
    Ok(())
}

#[tokio::test]
async fn factory_bean_method_produces_declared_type() -> Result<()> {
    #[derive(Debug)]
    struct ConnectionFactory {
        prefix: String,
    }

    let (factory, instantiator) = data_source_factory();
    instantiator.register_type::<ConnectionFactory, _>(|args| {
        Ok(ConnectionFactory {
            prefix: args.value(0)?,
        })
    });
    instantiator.register_factory_method::<ConnectionFactory, DataSource, _>(
        "open",
        |factory, args| {
            let database: String = args.value(0)?;
            Ok(DataSource {
                url: format!("{}/{}", factory.prefix, database),
            })
        },
    );

    factory.register_bean_definition(
        "connectionFactory",
        BeanDefinition::for_type::<ConnectionFactory>()
            .with_constructor_arg(0, BeanValue::literal("postgres://cluster")),
    )?;
    factory.register_bean_definition(
        "billing",
        BeanDefinition::default()
            .with_factory_bean("connectionFactory", "open")
            .with_target_type(std::any::type_name::<DataSource>())
            .with_constructor_arg(0, BeanValue::literal("billing")),
    )?;

    let billing = factory.get_bean_typed::<DataSource>("billing").await?;
    assert_eq!(billing.url, "postgres://cluster/billing");
    assert!(factory.is_type_match("billing", "DataSource")?);
    Ok(())
}

#[tokio::test]
async fn mistyped_lookup_reports_actual_type() {
    let (factory, _) = data_source_factory();
    factory
        .register_bean_definition("dataSource", data_source("postgres://main"))
        .unwrap();
    match factory
        .get_bean_typed::<OrderRepository>("dataSource")
        .await
        .unwrap_err()
    {
        BeansError::BeanNotOfRequiredType { actual_type, .. } => {
            assert!(actual_type.ends_with("DataSource"));
        }
        other => panic!("意外的错误: {other}"),
    }
}
