use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use veil_engine::compiler::SourceCompiler;
use veil_engine::proxy::ProxyTarget;
use veil_engine::vm::{MethodBuilder, TypeBuilder, TypeRef};
use veil_engine::{handler, MethodRef, ObjectRef, ProxyFactory, TypeUniverse, Value};

fn universe_with_methods(count: usize) -> TypeUniverse {
    let universe = TypeUniverse::new();
    let mut subject = TypeBuilder::interface("bench.Subject");
    for i in 0..count {
        subject = subject.method(
            MethodBuilder::new(format!("op{}", i))
                .param("String")
                .returns(TypeRef::Int),
        );
    }
    subject.define(&universe).unwrap();
    universe
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for count in [1, 8, 32] {
        let factory = ProxyFactory::new(&universe_with_methods(count));
        let target = ProxyTarget::interfaces(["bench.Subject"]);
        group.bench_with_input(BenchmarkId::new("methods", count), &target, |b, target| {
            b.iter(|| factory.render(black_box(target)).unwrap());
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for count in [1, 8, 32] {
        let universe = universe_with_methods(count);
        let factory = ProxyFactory::new(&universe);
        let (_, unit) = factory
            .render(&ProxyTarget::interfaces(["bench.Subject"]))
            .unwrap();
        group.bench_with_input(BenchmarkId::new("methods", count), &unit, |b, unit| {
            b.iter(|| {
                SourceCompiler::new(&universe)
                    .compile(&unit.file_name, black_box(&unit.source))
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_new_proxy_instance(c: &mut Criterion) {
    let universe = universe_with_methods(8);
    let factory = ProxyFactory::new(&universe);

    c.bench_function("new_proxy_instance", |b| {
        b.iter(|| {
            factory
                .new_proxy_instance(
                    ["bench.Subject"],
                    handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Int(0))),
                )
                .unwrap()
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let universe = universe_with_methods(8);
    let proxy = ProxyFactory::new(&universe)
        .new_proxy_instance(
            ["bench.Subject"],
            handler(|_: &ObjectRef, _: &MethodRef, args: &[Value]| {
                Ok(Value::Int(args.len() as i32))
            }),
        )
        .unwrap();
    let params = [TypeRef::string()];
    let args = [Value::from("payload")];

    c.bench_function("forwarded_call", |b| {
        b.iter(|| proxy.call("op3", &params, black_box(&args)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_render,
    bench_compile,
    bench_new_proxy_instance,
    bench_dispatch
);
criterion_main!(benches);
