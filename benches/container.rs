#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, Criterion};
use kiln::{Container, Inject, InstantiateErrorKind, RegistryBuilder, TypeDescriptor, TypeKey};
use std::sync::Arc;

struct A(Arc<B>, Arc<C>);
struct B(i32);
struct C(Arc<CA>);
struct CA(Arc<CAA>);
struct CAA(Arc<CAAA>);
struct CAAA(Arc<CAAAA>);
struct CAAAA(Arc<CAAAAA>);
struct CAAAAA;

fn register(registry: &mut RegistryBuilder, with_finalizers: bool) {
    let descriptors = [
        TypeDescriptor::of::<CAAAAA>()
            .with_instantiator(|| Ok::<_, InstantiateErrorKind>(CAAAAA))
            .with_finalizer(|_: Arc<CAAAAA>| {}),
        TypeDescriptor::of::<CAAAA>()
            .with_instantiator(|Inject(caaaaa): Inject<CAAAAA>| Ok::<_, InstantiateErrorKind>(CAAAA(caaaaa)))
            .with_finalizer(|_: Arc<CAAAA>| {}),
        TypeDescriptor::of::<CAAA>()
            .with_instantiator(|Inject(caaaa): Inject<CAAAA>| Ok::<_, InstantiateErrorKind>(CAAA(caaaa)))
            .with_finalizer(|_: Arc<CAAA>| {}),
        TypeDescriptor::of::<CAA>()
            .with_instantiator(|Inject(caaa): Inject<CAAA>| Ok::<_, InstantiateErrorKind>(CAA(caaa)))
            .with_finalizer(|_: Arc<CAA>| {}),
        TypeDescriptor::of::<CA>()
            .with_instantiator(|Inject(caa): Inject<CAA>| Ok::<_, InstantiateErrorKind>(CA(caa)))
            .with_finalizer(|_: Arc<CA>| {}),
        TypeDescriptor::of::<C>()
            .with_instantiator(|Inject(ca): Inject<CA>| Ok::<_, InstantiateErrorKind>(C(ca)))
            .with_finalizer(|_: Arc<C>| {}),
        TypeDescriptor::of::<B>()
            .with_instantiator(|| Ok::<_, InstantiateErrorKind>(B(2)))
            .with_finalizer(|_: Arc<B>| {}),
        TypeDescriptor::of::<A>()
            .with_instantiator(|Inject(b): Inject<B>, Inject(c): Inject<C>| Ok::<_, InstantiateErrorKind>(A(b, c)))
            .with_finalizer(|_: Arc<A>| {}),
    ];
    for descriptor in descriptors {
        let export = registry.export(descriptor).scoped();
        if !with_finalizers {
            export.externally_owned();
        }
    }
}

#[inline]
fn container_new(with_finalizers: bool) -> Container {
    let container = Container::new();
    container
        .configure(|registry| register(registry, with_finalizers))
        .unwrap();
    container
}

#[inline]
fn container_child_scopes(container: &Container) {
    let app = container.begin_lifetime_scope(Some("app"));
    let session = app.begin_lifetime_scope(Some("session"));
    let request = session.begin_lifetime_scope(Some("request"));
    let action = request.begin_lifetime_scope(None);
    let _ = action.begin_lifetime_scope(None);
}

#[inline]
fn container_get(container: &Container) {
    let _ = container.get::<A>().unwrap();
}

#[inline]
fn container_dispose(container: &Container) {
    let scope = container.begin_lifetime_scope(None);
    let _ = scope.get::<A>().unwrap();

    scope.dispose();
}

#[inline]
fn container_func(container: &Container) {
    let func = container
        .locate_as::<kiln::Func>(&TypeKey::func([], TypeKey::of::<A>()), None)
        .unwrap();
    let _ = func.call().unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let container_1 = container_new(true);
    let container_2 = container_new(false);

    c.bench_function("container_new_and_configure", |b| b.iter(|| container_new(true)))
        .bench_function("container_child_scopes", |b| b.iter(|| container_child_scopes(&container_1)))
        .bench_function("container_get_in_new_scope", |b| {
            b.iter(|| container_get(&container_1.begin_lifetime_scope(None)))
        })
        .bench_function("container_get_with_cache", |b| {
            let scope = container_1.begin_lifetime_scope(None);
            b.iter(|| container_get(&scope))
        })
        .bench_function("container_dispose", |b| b.iter(|| container_dispose(&container_1)))
        .bench_function("container_dispose_without_finalizers", |b| {
            b.iter(|| container_dispose(&container_2))
        })
        .bench_function("container_func", |b| b.iter(|| container_func(&container_1)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
