use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use kiln::{
    Arguments, Config, Constructor, Container, Enumerable, Func, Inject, InjectAll, InjectFunc, InjectLazy, InstantiateErrorKind,
    Lazy, Parameter, ResolveErrorKind, TypeDescriptor, TypeKey, Value,
};
use tracing_test::traced_test;

struct Service(usize);

fn counted_service(counter: Arc<AtomicUsize>) -> TypeDescriptor {
    TypeDescriptor::of::<Service>().with_instantiator(move || Ok::<_, InstantiateErrorKind>(Service(counter.fetch_add(1, Ordering::SeqCst))))
}

#[test]
#[traced_test]
fn test_func_creates_on_each_call() {
    let counter = Arc::new(AtomicUsize::new(0));

    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(counted_service(counter.clone()));
        })
        .unwrap();

    let func = container
        .locate_as::<Func>(&TypeKey::func([], TypeKey::of::<Service>()), None)
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(func.arity(), 0);

    for expected in 0..3 {
        let service = func.invoke_as::<Service>(Vec::new()).unwrap();
        assert_eq!(service.0, expected);
    }
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    assert!(matches!(
        func.invoke(vec![Arc::new(1_i32) as Value]),
        Err(ResolveErrorKind::Instantiate(InstantiateErrorKind::ArgumentCount { expected: 0, actual: 1 }))
    ));
}

struct Order {
    product: Arc<String>,
    count: Arc<i32>,
    service: Value,
}

fn order() -> TypeDescriptor {
    TypeDescriptor::of::<Order>().with_constructor(Constructor::new(
        [
            Parameter::new("product", TypeKey::of::<String>()),
            Parameter::new("count", TypeKey::of::<i32>()),
            Parameter::new("service", TypeKey::of::<Service>()),
        ],
        |arguments: Arguments| {
            Ok::<_, InstantiateErrorKind>(Order {
                product: arguments.get(0)?,
                count: arguments.get(1)?,
                service: arguments.value(2).cloned().ok_or(InstantiateErrorKind::ArgumentCount { expected: 3, actual: 2 })?,
            })
        },
    ))
}

#[test]
#[traced_test]
fn test_func_with_arguments() {
    let counter = Arc::new(AtomicUsize::new(0));

    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(counted_service(counter.clone()));
            registry.export(order());
            registry.export_value(100_i32);
        })
        .unwrap();

    let func_type = TypeKey::func([TypeKey::of::<String>(), TypeKey::of::<i32>()], TypeKey::of::<Order>());
    let func = container.locate_as::<Func>(&func_type, None).unwrap();
    assert_eq!(func.argument_types(), &[TypeKey::of::<String>(), TypeKey::of::<i32>()]);

    let order = func
        .invoke_as::<Order>(vec![Arc::new(String::from("apple")) as Value, Arc::new(3_i32)])
        .unwrap();
    assert_eq!(order.product.as_str(), "apple");
    assert_eq!(*order.count, 3);
    assert!(order.service.is::<Service>());

    let order = func
        .invoke_as::<Order>(vec![Arc::new(String::from("pear")) as Value, Arc::new(5_i32)])
        .unwrap();
    assert_eq!(order.product.as_str(), "pear");
    assert_eq!(*order.count, 5);

    assert_eq!(*container.get::<i32>().unwrap(), 100);
}

#[test]
#[traced_test]
fn test_func_after_scope_disposed() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(counted_service(Arc::new(AtomicUsize::new(0))));
        })
        .unwrap();

    let scope = container.begin_lifetime_scope(None);
    let func = scope
        .locate_as::<Func>(&TypeKey::func([], TypeKey::of::<Service>()), None)
        .unwrap();
    assert!(func.call().is_ok());

    drop(scope);
    assert!(matches!(func.call(), Err(ResolveErrorKind::ScopeDisposed)));
}

#[test]
#[traced_test]
fn test_lazy() {
    let counter = Arc::new(AtomicUsize::new(0));

    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(counted_service(counter.clone()));
        })
        .unwrap();

    let lazy = container
        .locate_as::<Lazy>(&TypeKey::lazy(TypeKey::of::<Service>()), None)
        .unwrap();
    assert!(!lazy.is_value_created());
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    let first = lazy.value_as::<Service>().unwrap();
    let second = lazy.value_as::<Service>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(lazy.is_value_created());
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let other = container
        .locate_as::<Lazy>(&TypeKey::lazy(TypeKey::of::<Service>()), None)
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &other.value_as::<Service>().unwrap()));
}

#[test]
#[traced_test]
fn test_lazy_of_unknown_type() {
    struct Unknown;

    let container = Container::new();
    let result = container.locate(&TypeKey::lazy(TypeKey::of::<Unknown>()), None);
    assert!(matches!(result, Err(ResolveErrorKind::Unresolvable { .. })));
}

struct Plugin(&'static str);

fn plugin(name: &'static str) -> TypeDescriptor {
    TypeDescriptor::of::<Plugin>().with_instantiator(move || Ok::<_, InstantiateErrorKind>(Plugin(name)))
}

struct Host {
    plugins: Vec<Arc<Plugin>>,
    create: Arc<Func>,
    lazy: Arc<Lazy>,
    first: Arc<Plugin>,
}

#[test]
#[traced_test]
fn test_inject_wrappers() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(plugin("first"));
            registry.export(plugin("second"));
            registry.export(plugin("third"));
            registry.export(TypeDescriptor::of::<Host>().with_instantiator(
                |all: InjectAll<Plugin>, create: InjectFunc<Plugin>, lazy: InjectLazy<Plugin>, Inject(first): Inject<Plugin>| {
                    Ok::<_, InstantiateErrorKind>(Host {
                        plugins: all.instances()?,
                        create: create.into_inner(),
                        lazy: lazy.into_inner(),
                        first,
                    })
                },
            ));
        })
        .unwrap();

    let host = container.get::<Host>().unwrap();
    let names: Vec<_> = host.plugins.iter().map(|plugin| plugin.0).collect();
    assert_eq!(names, ["first", "second", "third"]);

    assert_eq!(host.first.0, "third");
    assert_eq!(host.create.invoke_as::<Plugin>(Vec::new()).unwrap().0, "third");
    assert_eq!(host.lazy.value_as::<Plugin>().unwrap().0, "third");
}

#[test]
#[traced_test]
fn test_locate_all() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(plugin("first"));
            registry.export(plugin("second")).with_priority(10);
            registry.export(plugin("keyed")).as_keyed(TypeKey::of::<Plugin>(), "A");
        })
        .unwrap();

    let all = container.locate_all(&TypeKey::of::<Plugin>(), None).unwrap();
    let names: Vec<_> = all
        .into_iter()
        .map(|value| value.downcast::<Plugin>().unwrap().0)
        .collect();
    assert_eq!(names, ["first", "second"]);

    let enumerable = container
        .locate_as::<Enumerable>(&TypeKey::enumerable(TypeKey::of::<Plugin>()), None)
        .unwrap();
    assert_eq!(enumerable.len(), 2);
    assert_eq!(enumerable.downcast_all::<Plugin>().unwrap()[1].0, "second");

    let keyed = container.locate_all(&TypeKey::of::<Plugin>(), Some("A".into())).unwrap();
    assert_eq!(keyed.len(), 1);

    struct Missing;
    assert!(container.locate_all(&TypeKey::of::<Missing>(), None).unwrap().is_empty());
}

#[test]
#[traced_test]
fn test_enumerable_of_wrapped_element() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(plugin("first"));
        })
        .unwrap();

    let all = container
        .locate_all(&TypeKey::func([], TypeKey::of::<Plugin>()), None)
        .unwrap();
    assert_eq!(all.len(), 1);

    let func = all[0].clone().downcast::<Func>().unwrap();
    assert_eq!(func.invoke_as::<Plugin>(Vec::new()).unwrap().0, "first");
}

#[test]
#[traced_test]
fn test_custom_enumerable_creator() {
    let config = Config::default().with_enumerable_creator(|_: &TypeKey, items: Vec<Value>| Arc::new(items.len()) as Value);
    let container = Container::with_config(config).unwrap();
    container
        .configure(|registry| {
            registry.export(plugin("first"));
            registry.export(plugin("second"));
        })
        .unwrap();

    let count = container
        .locate_as::<usize>(&TypeKey::enumerable(TypeKey::of::<Plugin>()), None)
        .unwrap();
    assert_eq!(*count, 2);

    assert_eq!(container.locate_all(&TypeKey::of::<Plugin>(), None).unwrap().len(), 2);
}
