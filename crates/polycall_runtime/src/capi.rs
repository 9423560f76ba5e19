//! C-compatible entry points over the [`global()`](crate::global) runtime.
//!
//! Values cross this boundary as `*mut Value` boxes. Values returned by these
//! functions are owned by the caller and must be released with
//! [`metacall_value_destroy`]. Argument values are only borrowed.

use std::ffi::{CStr, c_void};
use std::os::raw::{c_char, c_double, c_int, c_long};
use std::ptr;

use tracing::warn;

use polycall_symbol::Signature;
use polycall_value::{ParamType, Value, ValueTag};

use crate::error::{BridgeError, Result};
use crate::global::global;
use crate::runtime::info_text;

/// Host function registered through [`metacall_register`]: receives an array
/// of borrowed value pointers and returns an owned value pointer or null.
pub type NativeInvoke = extern "C" fn(args: *mut *mut c_void) -> *mut c_void;

/// One-slot null argument array for calls without arguments.
#[repr(transparent)]
pub struct NullArgs([*mut c_void; 1]);

// The only slot is a null pointer that is never written.
unsafe impl Sync for NullArgs {}

#[allow(non_upper_case_globals)]
#[unsafe(no_mangle)]
pub static metacall_null_args: NullArgs = NullArgs([ptr::null_mut()]);

fn status(result: Result<impl Sized>) -> c_int {
    match result {
        Ok(_) => 0,
        Err(err) => {
            warn!(error = %err, "polycall call failed");
            err.code()
        }
    }
}

unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidArgument(format!("{what} is null")));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| BridgeError::InvalidArgument(format!("{what} is not valid utf-8")))
}

/// Copies `count` borrowed values out of a pointer array.
unsafe fn read_args(args: *mut *mut c_void, count: usize) -> Result<Vec<Value>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if args.is_null() {
        return Err(BridgeError::InvalidArgument("argument array is null".to_string()));
    }
    let slots = unsafe { std::slice::from_raw_parts(args, count) };
    slots
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let value = (*slot).cast::<Value>();
            if value.is_null() {
                Err(BridgeError::InvalidArgument(format!("argument {index} is null")))
            } else {
                Ok(unsafe { (*value).clone() })
            }
        })
        .collect()
}

fn into_raw(result: Result<Value>) -> *mut c_void {
    match result {
        Ok(value) => Box::into_raw(Box::new(value)).cast(),
        Err(err) => {
            warn!(error = %err, "polycall invocation failed");
            ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn metacall_initialize() -> c_int {
    status(global().initialize())
}

#[unsafe(no_mangle)]
pub extern "C" fn metacall_args_size() -> usize {
    global().args_size()
}

/// # Safety
/// `tag` must be a NUL-terminated string and `paths` must point to `size`
/// NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_load_from_file(
    tag: *const c_char,
    paths: *const *const c_char,
    size: usize,
) -> c_int {
    let result = (|| {
        let tag = unsafe { c_str(tag, "tag") }?;
        if paths.is_null() || size == 0 {
            return Err(BridgeError::InvalidArgument("no paths given".to_string()));
        }
        let paths = unsafe { std::slice::from_raw_parts(paths, size) }
            .iter()
            .map(|path| unsafe { c_str(*path, "path") })
            .collect::<Result<Vec<_>>>()?;
        global().load_from_file(tag, &paths)
    })();
    status(result)
}

/// # Safety
/// `tag` must be a NUL-terminated string and `buffer` must point to `size`
/// readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_load_from_memory(
    tag: *const c_char,
    buffer: *const c_char,
    size: usize,
) -> c_int {
    let result = (|| {
        let tag = unsafe { c_str(tag, "tag") }?;
        if buffer.is_null() {
            return Err(BridgeError::InvalidArgument("buffer is null".to_string()));
        }
        let bytes = unsafe { std::slice::from_raw_parts(buffer.cast::<u8>(), size) };
        global().load_from_memory(tag, bytes)
    })();
    status(result)
}

/// # Safety
/// `tag` and `path` must be NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_load_from_package(
    tag: *const c_char,
    path: *const c_char,
) -> c_int {
    let result = (|| {
        let tag = unsafe { c_str(tag, "tag") }?;
        let path = unsafe { c_str(path, "path") }?;
        global().load_from_package(tag, path)
    })();
    status(result)
}

/// Calls `name`, reading as many argument pointers from `args` as the
/// function declares parameters. Returns null on any failure.
///
/// # Safety
/// `name` must be a NUL-terminated string; `args` must hold at least as many
/// valid value pointers as the function's declared arity.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacallv(name: *const c_char, args: *mut *mut c_void) -> *mut c_void {
    into_raw((|| {
        let name = unsafe { c_str(name, "function name") }?;
        let handle = global().lookup(name)?;
        let args = unsafe { read_args(args, handle.signature.arity()) }?;
        global().metacallv(name, &args)
    })())
}

/// Calls `name` with exactly `size` arguments. Returns null on any failure.
///
/// # Safety
/// `name` must be a NUL-terminated string and `args` must hold `size` valid
/// value pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacallv_s(
    name: *const c_char,
    args: *mut *mut c_void,
    size: usize,
) -> *mut c_void {
    into_raw((|| {
        let name = unsafe { c_str(name, "function name") }?;
        let args = unsafe { read_args(args, size) }?;
        global().metacallv(name, &args)
    })())
}

/// Registers a host function. `arg_types` holds `arg_size` value tag ids, or
/// is null to accept any value in every position.
///
/// # Safety
/// `name` must be a NUL-terminated string and `arg_types`, when not null,
/// must point to `arg_size` integers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_register(
    name: *const c_char,
    invoke: Option<NativeInvoke>,
    return_type: c_int,
    arg_size: usize,
    arg_types: *const c_int,
) -> c_int {
    let result = (|| {
        let name = unsafe { c_str(name, "function name") }?;
        let invoke = invoke
            .ok_or_else(|| BridgeError::InvalidArgument("invoke pointer is null".to_string()))?;
        let result = tag_from_id(return_type)?;
        let params = if arg_types.is_null() {
            vec![ParamType::Any; arg_size]
        } else {
            unsafe { std::slice::from_raw_parts(arg_types, arg_size) }
                .iter()
                .map(|id| tag_from_id(*id).map(ParamType::Tag))
                .collect::<Result<Vec<_>>>()?
        };

        global().register_with_signature(
            name,
            Signature::new(params, ParamType::Tag(result)),
            move |args: &[Value]| {
                let mut slots = args
                    .iter()
                    .map(|value| ptr::from_ref(value).cast_mut().cast::<c_void>())
                    .collect::<Vec<_>>();
                let raw = invoke(slots.as_mut_ptr());
                if raw.is_null() {
                    return Ok(Value::Null);
                }
                Ok(*unsafe { Box::from_raw(raw.cast::<Value>()) })
            },
        )
    })();
    status(result)
}

fn tag_from_id(id: c_int) -> Result<ValueTag> {
    ValueTag::from_id(id)
        .ok_or_else(|| BridgeError::InvalidArgument(format!("unknown value type id {id}")))
}

#[unsafe(no_mangle)]
pub extern "C" fn metacall_destroy() -> c_int {
    status(global().destroy())
}

#[unsafe(no_mangle)]
pub extern "C" fn metacall_print_info() -> *const c_char {
    concat!(info_text!(), "\0").as_ptr().cast()
}

#[unsafe(no_mangle)]
pub extern "C" fn metacall_value_create_bool(b: c_int) -> *mut c_void {
    Box::into_raw(Box::new(Value::Bool(b != 0))).cast()
}

#[unsafe(no_mangle)]
pub extern "C" fn metacall_value_create_int(i: c_int) -> *mut c_void {
    Box::into_raw(Box::new(Value::I32(i))).cast()
}

#[unsafe(no_mangle)]
pub extern "C" fn metacall_value_create_long(l: c_long) -> *mut c_void {
    Box::into_raw(Box::new(Value::I64(i64::from(l)))).cast()
}

#[unsafe(no_mangle)]
pub extern "C" fn metacall_value_create_double(d: c_double) -> *mut c_void {
    Box::into_raw(Box::new(Value::F64(d))).cast()
}

/// # Safety
/// `text` must point to `length` readable bytes of UTF-8.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_value_create_string(
    text: *const c_char,
    length: usize,
) -> *mut c_void {
    if text.is_null() {
        return ptr::null_mut();
    }
    let bytes = unsafe { std::slice::from_raw_parts(text.cast::<u8>(), length) };
    match std::str::from_utf8(bytes) {
        Ok(text) => Box::into_raw(Box::new(Value::from(text))).cast(),
        Err(_) => ptr::null_mut(),
    }
}

unsafe fn value_ref<'a>(value: *mut c_void) -> Option<&'a Value> {
    unsafe { value.cast::<Value>().as_ref() }
}

/// Tag id of `value`, or -1 for a null pointer.
///
/// # Safety
/// `value` must be null or a pointer obtained from this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_value_id(value: *mut c_void) -> c_int {
    unsafe { value_ref(value) }.map_or(-1, |value| value.tag().id())
}

/// # Safety
/// `value` must be null or a pointer obtained from this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_value_to_bool(value: *mut c_void) -> c_int {
    match unsafe { value_ref(value) }.map(|value| value.cast(ValueTag::Bool)) {
        Some(Ok(Value::Bool(true))) => 1,
        _ => 0,
    }
}

/// Converts with the usual cast rules; 0 when the conversion fails.
///
/// # Safety
/// `value` must be null or a pointer obtained from this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_value_to_int(value: *mut c_void) -> c_int {
    match unsafe { value_ref(value) }.map(|value| value.cast(ValueTag::I32)) {
        Some(Ok(Value::I32(n))) => n,
        _ => 0,
    }
}

/// # Safety
/// `value` must be null or a pointer obtained from this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_value_to_long(value: *mut c_void) -> c_long {
    match unsafe { value_ref(value) }.map(|value| value.cast(ValueTag::I64)) {
        Some(Ok(Value::I64(n))) => {
            c_long::try_from(n).unwrap_or(if n < 0 { c_long::MIN } else { c_long::MAX })
        }
        _ => 0,
    }
}

/// # Safety
/// `value` must be null or a pointer obtained from this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_value_to_double(value: *mut c_void) -> c_double {
    match unsafe { value_ref(value) }.map(|value| value.cast(ValueTag::F64)) {
        Some(Ok(Value::F64(n))) => n,
        _ => 0.0,
    }
}

/// Releases a value returned by this library. Returns non-zero for a null
/// pointer instead of crashing.
///
/// # Safety
/// `value` must be null or an owned pointer obtained from this library that
/// has not been destroyed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metacall_value_destroy(value: *mut c_void) -> c_int {
    if value.is_null() {
        return BridgeError::InvalidArgument("value is null".to_string()).code();
    }
    drop(unsafe { Box::from_raw(value.cast::<Value>()) });
    0
}
