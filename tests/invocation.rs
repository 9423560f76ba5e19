mod common;

use std::sync::{Arc, Weak};

use anyhow::{Result, anyhow};

use common::{Scripts, TAG, runtime_with_scripts};
use polycall::{
    BridgeError, NO_ARGS, ParamType, Runtime, Signature, Value, ValueError, ValueTag, metacall,
};

fn load(runtime: &Runtime, scripts: &Scripts, name: &str, source: &str) -> Result<usize> {
    let path = scripts.write(name, source);
    Ok(runtime.load_from_file(TAG, &[path])?)
}

#[test]
fn native_add_through_metacallv_and_macro() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    runtime.register(
        "native_add",
        |args: &[Value]| {
            let (Some(a), Some(b)) = (args[0].as_i32(), args[1].as_i32()) else {
                return Err(anyhow!("expected two i32 values"));
            };
            Ok(Value::I32(a + b))
        },
        ValueTag::I32,
        &[ValueTag::I32, ValueTag::I32],
    )?;

    assert_eq!(runtime.metacallv("native_add", &[Value::I32(3), Value::I32(4)])?, Value::I32(7));
    assert_eq!(metacall!(runtime, "native_add", 20, 22)?, Value::I32(42));
    Ok(())
}

#[test]
fn arity_mismatch_in_both_directions() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let scripts = Scripts::new();
    load(&runtime, &scripts, "math.script", "add add i32,i32 -> i32\n")?;

    let err = runtime.metacallv("add", &[Value::I32(1)]).unwrap_err();
    assert!(matches!(&err, BridgeError::ArityMismatch { expected, found: 1, .. } if expected == "2"));
    assert_eq!(err.code(), 5);

    let err = runtime
        .metacallv("add", &[Value::I32(1), Value::I32(2), Value::I32(3)])
        .unwrap_err();
    assert!(matches!(err, BridgeError::ArityMismatch { found: 3, .. }));
    Ok(())
}

#[test]
fn calls_beyond_args_size_are_rejected() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let scripts = Scripts::new();
    load(&runtime, &scripts, "sum.script", "sum add ... -> i32\n")?;

    let limit = runtime.args_size();
    let args = vec![Value::I32(1); limit];
    assert_eq!(runtime.metacallv("sum", &args)?, Value::I32(limit as i32));

    let args = vec![Value::I32(1); limit + 1];
    let err = runtime.metacallv("sum", &args).unwrap_err();
    assert!(matches!(err, BridgeError::ArityMismatch { expected, .. } if expected.starts_with("at most")));
    Ok(())
}

#[test]
fn registering_more_params_than_args_size_fails() {
    let (runtime, _live) = runtime_with_scripts();
    let params = vec![ValueTag::I32; runtime.args_size() + 1];
    let err = runtime
        .register("too_wide", |_: &[Value]| Ok(Value::Null), ValueTag::Null, &params)
        .unwrap_err();
    assert!(matches!(err, BridgeError::ArityMismatch { .. }));
    assert!(runtime.lookup("too_wide").is_err());
}

#[test]
fn unknown_function_is_not_found() {
    let (runtime, _live) = runtime_with_scripts();
    let err = runtime.metacallv("nope", NO_ARGS).unwrap_err();
    assert!(matches!(&err, BridgeError::FunctionNotFound(name) if name == "nope"));
    assert_eq!(err.code(), 4);
}

#[test]
fn name_collisions_resolve_to_the_latest_registration() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let scripts = Scripts::new();
    load(&runtime, &scripts, "a.script", "shared first - -> str\n")?;
    assert_eq!(runtime.metacallv("shared", NO_ARGS)?, Value::from("first"));

    load(&runtime, &scripts, "b.script", "shared second - -> str\n")?;
    assert_eq!(runtime.metacallv("shared", NO_ARGS)?, Value::from("second"));

    runtime.register("shared", |_: &[Value]| Ok(Value::from("native")), ValueTag::Str, &[])?;
    assert_eq!(runtime.metacallv("shared", NO_ARGS)?, Value::from("native"));

    let infos = runtime.inspect()?;
    let shared = infos.iter().filter(|info| info.name == "shared").collect::<Vec<_>>();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].loader, None);
    Ok(())
}

#[test]
fn arguments_are_coerced_to_declared_types() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let scripts = Scripts::new();
    load(&runtime, &scripts, "math.script", "add add i32,i32 -> i32\n")?;

    let sum = runtime.metacallv("add", &[Value::I64(40), Value::from("2")])?;
    assert_eq!(sum, Value::I32(42));

    let err = runtime
        .metacallv("add", &[Value::Array(vec![]), Value::I32(1)])
        .unwrap_err();
    match err {
        BridgeError::TypeMismatch { slot, source, .. } => {
            assert_eq!(slot, "argument 0");
            assert_eq!(
                source,
                ValueError::TypeMismatch {
                    from: ValueTag::Array,
                    to: ValueTag::I32
                }
            );
        }
        other => panic!("expected type mismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn results_are_coerced_to_the_declared_return_type() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let scripts = Scripts::new();
    load(
        &runtime,
        &scripts,
        "results.script",
        "answer stringly - -> i64\nvoid nothing - -> i32\nbroken first - -> i32\n",
    )?;

    assert_eq!(runtime.metacallv("answer", NO_ARGS)?, Value::I64(41));
    assert_eq!(runtime.metacallv("void", NO_ARGS)?, Value::Null);

    let err = runtime.metacallv("broken", NO_ARGS).unwrap_err();
    assert!(matches!(err, BridgeError::TypeMismatch { slot, .. } if slot == "return value"));
    Ok(())
}

#[test]
fn any_parameters_pass_through_untouched() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let scripts = Scripts::new();
    load(&runtime, &scripts, "echo.script", "echo echo any -> any\n")?;

    let buffer = Value::Buffer(vec![0, 1, 2]);
    assert_eq!(runtime.metacallv("echo", std::slice::from_ref(&buffer))?, buffer);
    Ok(())
}

#[test]
fn invocation_failures_propagate() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let scripts = Scripts::new();
    load(&runtime, &scripts, "fail.script", "explode fail - -> null\n")?;

    let err = runtime.metacallv("explode", NO_ARGS).unwrap_err();
    assert!(matches!(&err, BridgeError::InvocationFailure { name, message }
        if name == "explode" && message.contains("boom")));
    assert_eq!(err.code(), 7);

    runtime.register(
        "native_fail",
        |_: &[Value]| Err(anyhow!("host refused")),
        ValueTag::Null,
        &[],
    )?;
    let err = runtime.metacallv("native_fail", NO_ARGS).unwrap_err();
    assert!(err.to_string().contains("host refused"));
    Ok(())
}

#[test]
fn functions_can_be_passed_as_callbacks() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let runtime = Arc::new(runtime);
    let scripts = Scripts::new();
    load(&runtime, &scripts, "math.script", "add add i32,i32 -> i32\n")?;

    let weak: Weak<Runtime> = Arc::downgrade(&runtime);
    runtime.register_with_signature(
        "apply",
        Signature::new(
            vec![ParamType::Tag(ValueTag::Function), ParamType::Any, ParamType::Any],
            ParamType::Any,
        ),
        move |args: &[Value]| {
            let runtime = weak.upgrade().ok_or_else(|| anyhow!("runtime dropped"))?;
            let callback = args[0]
                .as_function()
                .ok_or_else(|| anyhow!("first argument must be a function"))?;
            Ok(runtime.call_function(callback, &args[1..])?)
        },
    )?;

    let add = runtime.function("add")?;
    assert_eq!(add.tag(), ValueTag::Function);
    let result = runtime.metacallv("apply", &[add, Value::I32(5), Value::I64(6)])?;
    assert_eq!(result, Value::I32(11));
    Ok(())
}

#[test]
fn inspect_reports_signatures_and_origins() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let scripts = Scripts::new();
    load(&runtime, &scripts, "mixed.script", "join concat str,str -> str\n")?;
    runtime.register("noop", |_: &[Value]| Ok(Value::Null), ValueTag::Null, &[])?;

    let infos = runtime.inspect()?;
    let names = infos.iter().map(|info| info.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["join", "noop"]);
    assert_eq!(infos[0].loader.as_deref(), Some(TAG));
    assert_eq!(infos[0].signature.to_string(), "(str, str) -> str");
    assert_eq!(infos[1].loader, None);
    Ok(())
}

#[test]
fn function_values_are_not_sent_to_wire_loaders() -> Result<()> {
    let (runtime, _live) = runtime_with_scripts();
    let scripts = Scripts::new();
    load(&runtime, &scripts, "echo.script", "echo echo any -> any\n")?;
    runtime.register("noop", |_: &[Value]| Ok(Value::Null), ValueTag::Null, &[])?;

    let nested = Value::Array(vec![Value::I32(1), runtime.function("noop")?]);
    let err = runtime.metacallv("echo", &[nested]).unwrap_err();
    assert!(matches!(&err, BridgeError::TypeMismatch { slot, source, .. }
        if slot == "argument 0" && *source == ValueError::Unserializable(ValueTag::Function)));
    Ok(())
}
