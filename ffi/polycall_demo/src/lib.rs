use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use abi_stable::std_types::{RString, RVec};
use polycall_loader::dylib::{StableExportSet, StableFunction};
use polycall_value::{ParamType, Value, ValueTag};

fn function(name: &str, params: &[ValueTag], result: ValueTag, variadic: bool) -> StableFunction {
    StableFunction {
        name: RString::from(format!("demo.{name}")),
        symbol: RString::from(name),
        params: params.iter().copied().map(ParamType::Tag).collect::<Vec<_>>().into(),
        result: ParamType::Tag(result),
        variadic,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn polycall_exports() -> StableExportSet {
    let functions = RVec::from(vec![
        function("add", &[ValueTag::F64, ValueTag::F64], ValueTag::F64, false),
        function("concat", &[ValueTag::Str, ValueTag::Str], ValueTag::Str, false),
        function("sum", &[], ValueTag::F64, true),
    ]);

    StableExportSet { functions }
}

fn call(symbol: &str, args: &[Value]) -> Result<Value, String> {
    match (symbol, args) {
        ("add", [a, b]) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::F64(a + b)),
            _ => Err("add expects two numbers".to_string()),
        },
        ("concat", [Value::Str(a), Value::Str(b)]) => Ok(Value::Str(format!("{a}{b}"))),
        ("sum", args) => args
            .iter()
            .map(|arg| match arg.cast(ValueTag::F64) {
                Ok(Value::F64(n)) => Ok(n),
                _ => Err(format!("cannot sum a {} value", arg.tag())),
            })
            .sum::<Result<f64, String>>()
            .map(Value::F64),
        _ => Err(format!("bad call to `{symbol}` with {} arguments", args.len())),
    }
}

/// # Safety
/// Both pointers must be NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_call_json(symbol: *const c_char, args: *const c_char) -> *mut c_char {
    let symbol = unsafe { CStr::from_ptr(symbol) }.to_string_lossy();
    let args = unsafe { CStr::from_ptr(args) }.to_string_lossy();

    let reply = serde_json::from_str::<Vec<Value>>(&args)
        .map_err(|err| format!("invalid arguments: {err}"))
        .and_then(|args| call(&symbol, &args));
    let reply = match reply {
        Ok(value) => serde_json::json!({ "ok": value }),
        Err(message) => serde_json::json!({ "error": message }),
    };

    CString::new(reply.to_string()).map_or(std::ptr::null_mut(), CString::into_raw)
}

/// # Safety
/// `reply` must come from `polycall_call_json` and be freed once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_free_string(reply: *mut c_char) {
    if !reply.is_null() {
        drop(unsafe { CString::from_raw(reply) });
    }
}
