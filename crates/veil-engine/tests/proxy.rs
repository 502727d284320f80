//! End-to-end proxy creation and dispatch

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use veil_engine::compiler::SourceCompiler;
use veil_engine::proxy::{ProxyTarget, ProxyStage};
use veil_engine::vm::{MethodBuilder, TypeBuilder, TypeRef};
use veil_engine::{
    handler, ClassProxy, Delegate, DynamicTypeLoader, MethodRef, ObjectRef, ProxyConfig, ProxyError,
    ProxyFactory, Throwable, TypeUniverse, Value,
};

fn subject_universe() -> TypeUniverse {
    let universe = TypeUniverse::new();
    TypeBuilder::interface("demo.Subject")
        .method(MethodBuilder::new("doOperation"))
        .method(MethodBuilder::new("doOperation").param("String"))
        .method(MethodBuilder::new("count").returns(TypeRef::Int))
        .method(MethodBuilder::new("identity").returns("demo.Subject"))
        .define(&universe)
        .unwrap();
    TypeBuilder::class("demo.RealSubject")
        .implements("demo.Subject")
        .field("calls", TypeRef::Int)
        .method(MethodBuilder::new("doOperation").native(|this, _| bump(this)))
        .method(MethodBuilder::new("doOperation").param("String").native(|this, _| bump(this)))
        .method(
            MethodBuilder::new("count").returns(TypeRef::Int).native(|this, _| {
                let obj = this.as_object().unwrap();
                Ok(obj.get_field("calls").unwrap_or(Value::Int(0)))
            }),
        )
        .method(
            MethodBuilder::new("identity")
                .returns("demo.Subject")
                .native(|this, _| Ok(this.clone())),
        )
        .define(&universe)
        .unwrap();
    universe
}

fn bump(this: &Value) -> Result<Value, Throwable> {
    let obj = this.as_object().unwrap();
    let calls = obj.get_field("calls").and_then(|v| v.as_int()).unwrap_or(0);
    obj.set_field("calls", Value::Int(calls + 1));
    Ok(Value::Null)
}

fn throwing(thrown: Throwable) -> veil_engine::HandlerRef {
    handler(move |_: &ObjectRef, _: &MethodRef, _: &[Value]| Err(thrown.clone()))
}

#[test]
fn test_before_after_delegation() {
    let universe = subject_universe();
    let real = universe.instantiate("demo.RealSubject", &[]).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner = Delegate::new(real.clone());
    let events = log.clone();
    let proxy = ProxyFactory::new(&universe)
        .new_proxy_instance(
            ["demo.Subject"],
            handler(move |proxy: &ObjectRef, method: &MethodRef, args: &[Value]| {
                events.lock().push(format!("before {}", method.overload_key()));
                let result = veil_engine::InvocationHandler::invoke(&inner, proxy, method, args);
                events.lock().push(format!("after {}", method.overload_key()));
                result
            }),
        )
        .unwrap();

    assert!(proxy.is_instance_of("demo.Subject"));
    assert!(proxy.is_instance_of("veil.ProxyBase"));
    assert!(proxy.class_name().starts_with("demo.$Proxy"));

    proxy.call("doOperation", &[], &[]).unwrap();
    proxy
        .call("doOperation", &[TypeRef::string()], &[Value::from("payload")])
        .unwrap();
    assert_eq!(proxy.call("count", &[], &[]).unwrap(), Value::Int(2));

    assert_eq!(
        *log.lock(),
        vec![
            "before doOperation()",
            "after doOperation()",
            "before doOperation(String)",
            "after doOperation(String)",
            "before count()",
            "after count()",
        ]
    );
    assert_eq!(real.get_field("calls"), Some(Value::Int(2)));
}

#[test]
fn test_handler_sees_proxy_method_and_arguments() {
    let universe = subject_universe();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let proxy = ProxyFactory::new(&universe)
        .new_proxy_instance(
            ["demo.Subject"],
            handler(move |proxy: &ObjectRef, method: &MethodRef, args: &[Value]| {
                record.lock().push((method.declaring_type.clone(), method.overload_key(), args.to_vec()));
                if method.name == "identity" {
                    return Ok(Value::Object(proxy.clone()));
                }
                Ok(Value::Null)
            }),
        )
        .unwrap();

    proxy
        .call("doOperation", &[TypeRef::string()], &[Value::from("x")])
        .unwrap();
    let returned = proxy.call("identity", &[], &[]).unwrap();
    assert!(Arc::ptr_eq(returned.as_object().unwrap(), &proxy));

    let seen = seen.lock();
    assert_eq!(seen[0].0, "demo.Subject");
    assert_eq!(seen[0].1, "doOperation(String)");
    assert_eq!(seen[0].2, vec![Value::from("x")]);
    assert!(seen[1].2.is_empty());
}

#[test]
fn test_return_values_are_cast() {
    let universe = subject_universe();
    let factory = ProxyFactory::new(&universe);

    let answer = factory
        .new_proxy_instance(
            ["demo.Subject"],
            handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Int(42))),
        )
        .unwrap();
    assert_eq!(answer.call("count", &[], &[]).unwrap(), Value::Int(42));
    // void forwarders ignore the handler result
    assert_eq!(answer.call("doOperation", &[], &[]).unwrap(), Value::Null);

    let wrong = factory
        .new_proxy_instance(
            ["demo.Subject"],
            handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::from("nope"))),
        )
        .unwrap();
    let err = wrong.call("count", &[], &[]).unwrap_err();
    assert_eq!(err.class_name(), "ClassCastException");

    let null = factory
        .new_proxy_instance(
            ["demo.Subject"],
            handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Null)),
        )
        .unwrap();
    assert_eq!(null.call("count", &[], &[]).unwrap_err().class_name(), "NullPointerException");
    assert_eq!(null.call("identity", &[], &[]).unwrap(), Value::Null);
}

#[test]
fn test_unchecked_throwables_pass_through() {
    let universe = subject_universe();
    let factory = ProxyFactory::new(&universe);

    let runtime = factory
        .new_proxy_instance(
            ["demo.Subject"],
            throwing(Throwable::unchecked("demo.BoomException", "boom")),
        )
        .unwrap();
    let err = runtime.call("doOperation", &[], &[]).unwrap_err();
    assert_eq!(err.class_name(), "demo.BoomException");
    assert_eq!(err.message(), Some("boom"));

    let fatal = factory
        .new_proxy_instance(["demo.Subject"], throwing(Throwable::error("demo.FatalError", "fatal")))
        .unwrap();
    let err = fatal.call("count", &[], &[]).unwrap_err();
    assert_eq!(err.class_name(), "demo.FatalError");
    assert!(err.cause().is_none());
}

#[test]
fn test_checked_throwables_are_wrapped() {
    let universe = subject_universe();
    let proxy = ProxyFactory::new(&universe)
        .new_proxy_instance(
            ["demo.Subject"],
            throwing(Throwable::checked("demo.IoException", "disk")),
        )
        .unwrap();

    let err = proxy.call("doOperation", &[], &[]).unwrap_err();
    assert_eq!(err.class_name(), "UndeclaredThrowableException");
    assert!(err.is_unchecked());
    let cause = err.cause().unwrap();
    assert_eq!(cause.class_name(), "demo.IoException");
    assert_eq!(cause.message(), Some("disk"));
}

#[test]
fn test_recursive_handler_overflows_on_default_stack() {
    let universe = subject_universe();
    let proxy = ProxyFactory::new(&universe)
        .new_proxy_instance(
            ["demo.Subject"],
            handler(|proxy: &ObjectRef, _: &MethodRef, _: &[Value]| proxy.call("doOperation", &[], &[])),
        )
        .unwrap();

    let err = thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || proxy.call("doOperation", &[], &[]))
        .unwrap()
        .join()
        .unwrap()
        .unwrap_err();
    assert_eq!(err.class_name(), "StackOverflowError");
    assert!(err.is_error());
}

fn sealed_universe() -> TypeUniverse {
    let universe = TypeUniverse::new();
    TypeBuilder::class("demo.Sealed")
        .as_final()
        .method(MethodBuilder::new("doOperation").native(|_, _| Ok(Value::Null)))
        .method(
            MethodBuilder::new("doOperation")
                .param("String")
                .native(|_, _| Ok(Value::Null)),
        )
        .method(
            MethodBuilder::new("describe")
                .param("demo.Sealed")
                .returns("String")
                .native(|_, _| Ok(Value::from("real"))),
        )
        .method(
            MethodBuilder::new("describe")
                .param("String")
                .returns("String")
                .native(|_, _| Ok(Value::from("real"))),
        )
        .define(&universe)
        .unwrap();
    universe
}

#[test]
fn test_final_class_overloads_dispatch_by_name() {
    let universe = sealed_universe();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let record = calls.clone();
    let proxy = ProxyFactory::new(&universe)
        .new_class_proxy(
            "demo.Sealed",
            handler(move |_: &ObjectRef, method: &MethodRef, args: &[Value]| {
                record.lock().push(method.overload_key());
                Ok(args.first().cloned().unwrap_or(Value::Null))
            }),
        )
        .unwrap();

    assert!(proxy.is_sealed());
    let base = proxy.as_sealed().unwrap();
    assert!(base.object().is_instance_of("veil.ProxyBase"));
    assert!(!base.object().is_instance_of("demo.Sealed"));
    assert!(base.handler().is_some());
    assert_eq!(base.methods().len(), 4);

    assert_eq!(base.invoke("doOperation", &[]).unwrap(), Value::Null);
    base.invoke("doOperation", &[Value::from("x")]).unwrap();
    assert_eq!(
        base.invoke("describe", &[Value::from("text")]).unwrap(),
        Value::from("text")
    );
    assert_eq!(
        *calls.lock(),
        vec!["doOperation()", "doOperation(String)", "describe(String)"]
    );

    // null matches both describe overloads
    let err = base.invoke("describe", &[Value::Null]).unwrap_err();
    assert_eq!(err.class_name(), "IllegalArgumentException");

    let err = base.invoke("doOperation", &[Value::Int(1)]).unwrap_err();
    assert_eq!(err.class_name(), "NoSuchMethodException");
    let err = base.invoke("missing", &[]).unwrap_err();
    assert_eq!(err.class_name(), "NoSuchMethodException");
}

#[test]
fn test_open_class_proxy_is_a_subclass() {
    let universe = TypeUniverse::new();
    TypeBuilder::class("demo.Service")
        .method(
            MethodBuilder::new("greet")
                .param("String")
                .returns("String")
                .native(|_, args| Ok(Value::from(format!("hello {}", args[0].as_str().unwrap_or("?"))))),
        )
        .method(
            MethodBuilder::new("version")
                .returns(TypeRef::Int)
                .as_final()
                .native(|_, _| Ok(Value::Int(1))),
        )
        .define(&universe)
        .unwrap();

    let proxy = ProxyFactory::new(&universe)
        .new_class_proxy(
            "demo.Service",
            handler(|_: &ObjectRef, method: &MethodRef, args: &[Value]| {
                Ok(Value::from(format!("{} intercepted {}", method.name, args.len())))
            }),
        )
        .unwrap();

    let ClassProxy::Subclass(object) = &proxy else {
        panic!("expected a subclass proxy");
    };
    assert!(object.is_instance_of("demo.Service"));
    assert_eq!(
        object.call("greet", &[TypeRef::string()], &[Value::from("bob")]).unwrap(),
        Value::from("greet intercepted 1")
    );
    // final methods are inherited, not forwarded
    assert_eq!(object.call("version", &[], &[]).unwrap(), Value::Int(1));
    assert_eq!(
        proxy.invoke("greet", &[Value::from("bob")]).unwrap(),
        Value::from("greet intercepted 1")
    );
}

fn service_universe() -> TypeUniverse {
    let universe = TypeUniverse::new();
    TypeBuilder::class("demo.Service")
        .method(
            MethodBuilder::new("greet")
                .param("String")
                .returns("String")
                .native(|_, _| Ok(Value::from("real"))),
        )
        .define(&universe)
        .unwrap();
    universe
}

#[test]
fn test_subclass_proxy_throwables() {
    let universe = service_universe();
    let factory = ProxyFactory::new(&universe);
    let greet = |proxy: &ClassProxy| {
        proxy
            .object()
            .call("greet", &[TypeRef::string()], &[Value::from("bob")])
            .unwrap_err()
    };

    let unchecked = factory
        .new_class_proxy("demo.Service", throwing(Throwable::unchecked("demo.BoomException", "boom")))
        .unwrap();
    assert!(!unchecked.is_sealed());
    let err = greet(&unchecked);
    assert_eq!(err.class_name(), "demo.BoomException");
    assert!(err.cause().is_none());

    let fatal = factory
        .new_class_proxy("demo.Service", throwing(Throwable::error("demo.FatalError", "fatal")))
        .unwrap();
    assert_eq!(greet(&fatal).class_name(), "demo.FatalError");

    let checked = factory
        .new_class_proxy("demo.Service", throwing(Throwable::checked("demo.IoException", "disk")))
        .unwrap();
    let err = greet(&checked);
    assert_eq!(err.class_name(), "UndeclaredThrowableException");
    assert_eq!(err.cause().unwrap().class_name(), "demo.IoException");

    let err = checked.invoke("greet", &[Value::from("bob")]).unwrap_err();
    assert_eq!(err.class_name(), "UndeclaredThrowableException");
    assert_eq!(err.cause().unwrap().message(), Some("disk"));
}

#[test]
fn test_package_types_do_not_shadow_runtime_names() {
    let universe = TypeUniverse::new();
    for name in ["demo.Error", "demo.String", "demo.Object", "demo.Throwable"] {
        TypeBuilder::class(name).define(&universe).unwrap();
    }
    TypeBuilder::class("demo.UndeclaredThrowableException")
        .as_abstract()
        .define(&universe)
        .unwrap();
    TypeBuilder::interface("demo.Api")
        .method(MethodBuilder::new("echo").param("String").returns("String"))
        .method(MethodBuilder::new("wrap").param("demo.Error").returns("Object"))
        .define(&universe)
        .unwrap();
    TypeBuilder::interface("Method")
        .method(MethodBuilder::new("run"))
        .define(&universe)
        .unwrap();
    let factory = ProxyFactory::new(&universe);

    let echo = factory
        .new_proxy_instance(
            ["demo.Api"],
            handler(|_: &ObjectRef, _: &MethodRef, args: &[Value]| Ok(args[0].clone())),
        )
        .unwrap();
    assert_eq!(
        echo.call("echo", &[TypeRef::string()], &[Value::from("x")]).unwrap(),
        Value::from("x")
    );
    assert_eq!(
        echo.call("wrap", &[TypeRef::named("demo.Error")], &[Value::Null]).unwrap(),
        Value::Null
    );

    let failing = factory
        .new_proxy_instance(["demo.Api"], throwing(Throwable::checked("demo.IoException", "disk")))
        .unwrap();
    let err = failing
        .call("echo", &[TypeRef::string()], &[Value::from("x")])
        .unwrap_err();
    assert_eq!(err.class_name(), "UndeclaredThrowableException");
    let err = factory
        .new_proxy_instance(["demo.Api"], throwing(Throwable::error("demo.FatalError", "fatal")))
        .unwrap()
        .call("echo", &[TypeRef::string()], &[Value::from("x")])
        .unwrap_err();
    assert_eq!(err.class_name(), "demo.FatalError");

    let top_level = factory
        .new_proxy_instance(
            ["Method"],
            handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Null)),
        )
        .unwrap();
    assert!(top_level.is_instance_of("Method"));
    assert!(!top_level.class_name().contains('.'));
    top_level.call("run", &[], &[]).unwrap();
}

#[test]
fn test_interface_as_class_target() {
    let universe = subject_universe();
    let proxy = ProxyFactory::new(&universe)
        .new_class_proxy(
            "demo.Subject",
            handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Null)),
        )
        .unwrap();
    assert!(!proxy.is_sealed());
    assert!(proxy.object().is_instance_of("demo.Subject"));
}

#[test]
fn test_multiple_interfaces() {
    let universe = subject_universe();
    TypeBuilder::interface("demo.Closeable")
        .method(MethodBuilder::new("close"))
        .method(MethodBuilder::new("doOperation"))
        .define(&universe)
        .unwrap();

    let owners = Arc::new(Mutex::new(Vec::new()));
    let record = owners.clone();
    let proxy = ProxyFactory::new(&universe)
        .new_proxy_instance(
            ["demo.Subject", "demo.Closeable"],
            handler(move |_: &ObjectRef, method: &MethodRef, _: &[Value]| {
                record.lock().push(format!("{}.{}", method.declaring_type, method.name));
                Ok(Value::Null)
            }),
        )
        .unwrap();

    assert!(proxy.is_instance_of("demo.Subject"));
    assert!(proxy.is_instance_of("demo.Closeable"));
    proxy.call("close", &[], &[]).unwrap();
    proxy.call("doOperation", &[], &[]).unwrap();
    // the first interface declaring doOperation() wins
    assert_eq!(*owners.lock(), vec!["demo.Closeable.close", "demo.Subject.doOperation"]);
}

#[test]
fn test_invalid_requests() {
    let universe = sealed_universe();
    let factory = ProxyFactory::new(&universe);
    let noop = || handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Null));

    let err = factory.new_proxy_instance(["demo.Missing"], noop()).unwrap_err();
    assert!(matches!(&err, ProxyError::UnknownType(name) if name == "demo.Missing"));
    assert_eq!(err.stage(), ProxyStage::SurfaceResolved);

    let err = factory.new_proxy_instance(["demo.Sealed"], noop()).unwrap_err();
    assert!(matches!(err, ProxyError::Malformed(_)));

    let err = factory.new_class_proxy("demo.Nowhere", noop()).unwrap_err();
    assert!(matches!(err, ProxyError::UnknownType(_)));
}

#[test]
fn test_unique_names_under_concurrency() {
    let universe = subject_universe();
    let factory = ProxyFactory::new(&universe);

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let factory = factory.clone();
            thread::spawn(move || {
                (0..4)
                    .map(|_| {
                        factory
                            .new_proxy_instance(
                                ["demo.Subject"],
                                handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Int(7))),
                            )
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut names = HashSet::new();
    for worker in workers {
        for proxy in worker.join().unwrap() {
            assert_eq!(proxy.call("count", &[], &[]).unwrap(), Value::Int(7));
            names.insert(proxy.class_name().to_string());
        }
    }
    assert_eq!(names.len(), 32);
}

#[test]
fn test_static_initializer_failure_surfaces_as_error() {
    let universe = subject_universe();
    let factory = ProxyFactory::new(&universe);
    let (_, unit) = factory.render(&ProxyTarget::interfaces(["demo.Subject"])).unwrap();

    // Point one method handle at a method the interface does not declare
    let broken = unit.source.replacen(
        "\"count\", new veil.String[] {}",
        "\"vanished\", new veil.String[] {}",
        1,
    );
    assert_ne!(broken, unit.source);

    let artifact = SourceCompiler::new(&universe)
        .compile(&unit.file_name, &broken)
        .unwrap();
    let loader = DynamicTypeLoader::define(&universe, artifact);
    let def = loader.load_type(&unit.type_name).unwrap();
    let noop = handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Null));

    let err = universe
        .instantiate_type(&def, &[Value::Handler(noop.clone())])
        .unwrap_err();
    assert_eq!(err.class_name(), "NoSuchMethodError");
    assert!(err.message().unwrap().contains("vanished"));

    let err = universe
        .instantiate_type(&def, &[Value::Handler(noop)])
        .unwrap_err();
    assert_eq!(err.class_name(), "NoClassDefFoundError");
    let cause = err.cause().unwrap();
    assert_eq!(cause.class_name(), "NoSuchMethodError");
    assert!(cause.message().unwrap().contains("vanished"));
}

#[test]
fn test_sources_are_dumped() {
    let dump = tempfile::tempdir().unwrap();
    let universe = subject_universe();
    let proxy = ProxyFactory::new(&universe)
        .with_config(ProxyConfig::new().with_dump_dir(dump.path()))
        .new_proxy_instance(
            ["demo.Subject"],
            handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Null)),
        )
        .unwrap();

    let simple_name = proxy.class().simple_name().to_string();
    let path = dump.path().join(format!("{}.veil", simple_name));
    let source = std::fs::read_to_string(path).unwrap();
    assert!(source.contains(&format!("public final class {} extends veil.ProxyBase", simple_name)));
}

#[test]
fn test_generated_types_are_loaded_once() {
    let universe = subject_universe();
    let factory = ProxyFactory::new(&universe);
    let noop = || handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Null));
    let first = factory.new_proxy_instance(["demo.Subject"], noop()).unwrap();
    let second = factory.new_proxy_instance(["demo.Subject"], noop()).unwrap();

    assert_ne!(first.class_name(), second.class_name());
    let def = universe.get(first.class_name()).unwrap();
    assert!(def.is_final());
    assert!(def.digest().is_some());
    assert!(def.is_initialized());
}
