use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc, Arc, Barrier,
    },
    thread,
    time::Duration,
};

use kiln::{Container, Disposable, Inject, InstantiateErrorKind, ResolveErrorKind, TypeDescriptor};
use tracing_test::traced_test;

#[derive(Default)]
struct Service {
    disposed: AtomicBool,
}

impl Disposable for Service {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

fn service() -> TypeDescriptor {
    TypeDescriptor::of::<Service>()
        .with_instantiator(|| Ok::<_, InstantiateErrorKind>(Service::default()))
        .disposable::<Service>()
}

#[test]
#[traced_test]
fn test_transient() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(service());
        })
        .unwrap();

    let first = container.get::<Service>().unwrap();
    let second = container.get::<Service>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    container.dispose();
    assert!(first.disposed.load(Ordering::SeqCst));
    assert!(second.disposed.load(Ordering::SeqCst));
}

#[test]
#[traced_test]
fn test_singleton() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(service()).singleton();
        })
        .unwrap();

    let instance = container.get::<Service>().unwrap();
    assert!(Arc::ptr_eq(&instance, &container.get::<Service>().unwrap()));

    let scope = container.begin_lifetime_scope(None);
    assert!(Arc::ptr_eq(&instance, &scope.get::<Service>().unwrap()));

    drop(scope);
    assert!(!instance.disposed.load(Ordering::SeqCst));

    container.dispose();
    assert!(instance.disposed.load(Ordering::SeqCst));
}

#[test]
#[traced_test]
fn test_singleton_per_container() {
    let configure = |container: &Container| {
        container
            .configure(|registry| {
                registry.export(service()).singleton();
            })
            .unwrap();
    };

    let first = Container::new();
    let second = Container::new();
    configure(&first);
    configure(&second);

    assert!(!Arc::ptr_eq(&first.get::<Service>().unwrap(), &second.get::<Service>().unwrap()));
}

#[test]
#[traced_test]
fn test_singleton_concurrent_creation() {
    static CREATED: AtomicUsize = AtomicUsize::new(0);

    struct Slow;

    let container = Container::new();
    container
        .configure(|registry| {
            registry
                .export(TypeDescriptor::of::<Slow>().with_instantiator(|| {
                    CREATED.fetch_add(1, Ordering::SeqCst);
                    thread::yield_now();
                    Ok::<_, InstantiateErrorKind>(Slow)
                }))
                .singleton();
        })
        .unwrap();

    let instances: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let container = container.clone();
                scope.spawn(move || container.get::<Slow>().unwrap())
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|instance| Arc::ptr_eq(instance, &instances[0])));
}

struct Gate;
struct RootScoped;
struct SharedSingleton(Arc<Gate>, Arc<RootScoped>);
struct ScopedConsumer(Arc<Gate>, Arc<SharedSingleton>);

#[test]
#[traced_test]
fn test_singleton_and_root_scoped_first_resolution_on_two_threads() {
    let barrier = Arc::new(Barrier::new(2));

    let container = Container::new();
    container
        .configure(|registry| {
            let barrier = barrier.clone();
            registry.export(TypeDescriptor::of::<Gate>().with_instantiator(move || {
                barrier.wait();
                Ok::<_, InstantiateErrorKind>(Gate)
            }));
            registry
                .export(TypeDescriptor::of::<RootScoped>().with_instantiator(|| Ok::<_, InstantiateErrorKind>(RootScoped)))
                .scoped();
            registry
                .export(TypeDescriptor::of::<SharedSingleton>().with_instantiator(
                    |Inject(gate): Inject<Gate>, Inject(scoped): Inject<RootScoped>| {
                        Ok::<_, InstantiateErrorKind>(SharedSingleton(gate, scoped))
                    },
                ))
                .singleton();
            registry
                .export(TypeDescriptor::of::<ScopedConsumer>().with_instantiator(
                    |Inject(gate): Inject<Gate>, Inject(singleton): Inject<SharedSingleton>| {
                        Ok::<_, InstantiateErrorKind>(ScopedConsumer(gate, singleton))
                    },
                ))
                .scoped();
        })
        .unwrap();

    let (sender, receiver) = mpsc::channel();
    let singleton_thread = {
        let container = container.clone();
        let sender = sender.clone();
        thread::spawn(move || {
            let singleton = container.get::<SharedSingleton>().unwrap();
            sender.send(singleton).unwrap();
        })
    };
    let consumer_thread = {
        let container = container.clone();
        thread::spawn(move || {
            let consumer = container.get::<ScopedConsumer>().unwrap();
            sender.send(consumer.1.clone()).unwrap();
        })
    };

    let first = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
    let second = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
    singleton_thread.join().unwrap();
    consumer_thread.join().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.1, &container.get::<RootScoped>().unwrap()));
}

#[test]
#[traced_test]
fn test_scoped() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(service()).scoped();
        })
        .unwrap();

    let first_scope = container.begin_lifetime_scope(None);
    let second_scope = container.begin_lifetime_scope(None);

    let first = first_scope.get::<Service>().unwrap();
    assert!(Arc::ptr_eq(&first, &first_scope.get::<Service>().unwrap()));

    let second = second_scope.get::<Service>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    let root = container.get::<Service>().unwrap();
    assert!(Arc::ptr_eq(&root, &container.get::<Service>().unwrap()));
    assert!(!Arc::ptr_eq(&root, &first));

    drop(first_scope);
    assert!(first.disposed.load(Ordering::SeqCst));
    assert!(!second.disposed.load(Ordering::SeqCst));
    assert!(!root.disposed.load(Ordering::SeqCst));
}

#[test]
#[traced_test]
fn test_singleton_per_named_scope() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(service()).singleton_per_named_scope("request");
        })
        .unwrap();

    let first = container.begin_lifetime_scope(Some("request"));
    let nested = first.begin_lifetime_scope(None);
    let second = container.begin_lifetime_scope(Some("request"));

    let instance = first.get::<Service>().unwrap();
    let other = second.get::<Service>().unwrap();
    assert!(Arc::ptr_eq(&instance, &nested.get::<Service>().unwrap()));
    assert!(!Arc::ptr_eq(&instance, &other));

    drop(nested);
    assert!(!instance.disposed.load(Ordering::SeqCst));

    drop(first);
    assert!(instance.disposed.load(Ordering::SeqCst));
    assert!(!other.disposed.load(Ordering::SeqCst));
    assert!(Arc::ptr_eq(&other, &second.get::<Service>().unwrap()));

    drop(second);
    assert!(other.disposed.load(Ordering::SeqCst));
}

#[test]
#[traced_test]
fn test_singleton_per_named_scope_concurrent_creation() {
    const THREADS: usize = 8;

    let created = Arc::new(AtomicUsize::new(0));

    let container = Container::new();
    container
        .configure(|registry| {
            let created = created.clone();
            registry
                .export(TypeDescriptor::of::<Service>().with_instantiator(move || {
                    created.fetch_add(1, Ordering::SeqCst);
                    thread::yield_now();
                    Ok::<_, InstantiateErrorKind>(Service::default())
                }))
                .singleton_per_named_scope("request");
        })
        .unwrap();

    let request = container.begin_lifetime_scope(Some("request"));
    let barrier = Barrier::new(THREADS);

    let instances: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let nested = request.begin_lifetime_scope(None);
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    nested.get::<Service>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|instance| Arc::ptr_eq(instance, &instances[0])));
}

#[test]
#[traced_test]
fn test_singleton_per_named_scope_not_found() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(service()).singleton_per_named_scope("request");
        })
        .unwrap();

    let scope = container.begin_lifetime_scope(Some("other"));
    let result = scope.get::<Service>();
    assert!(matches!(result, Err(ResolveErrorKind::NamedScopeNotFound { name }) if &*name == "request"));
    assert!(logs_contain("Could not find scope named"));
}

#[test]
#[traced_test]
fn test_externally_owned() {
    let container = Container::new();
    container
        .configure(|registry| {
            registry.export(service()).externally_owned();
        })
        .unwrap();

    let instance = container.get::<Service>().unwrap();
    container.dispose();
    assert!(!instance.disposed.load(Ordering::SeqCst));
}
