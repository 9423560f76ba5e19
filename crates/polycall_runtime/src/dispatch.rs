use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, trace};

use polycall_loader::Loader;
use polycall_symbol::{FunctionHandle, Target};
use polycall_value::{FunctionRef, ParamType, Value};

use crate::error::{BridgeError, Result};
use crate::runtime::Runtime;

impl Runtime {
    /// Invokes the function registered as `name` with an explicit argument
    /// list. The returned value is owned by the caller.
    pub fn metacallv(&self, name: &str, args: &[Value]) -> Result<Value> {
        let handle = self.lookup(name)?;
        self.invoke_handle(&handle, args)
    }

    /// Invokes a function value, typically a callback received as an
    /// argument.
    pub fn call_function(&self, function: &FunctionRef, args: &[Value]) -> Result<Value> {
        let handle = function.downcast_ref::<FunctionHandle>().ok_or_else(|| {
            BridgeError::InvalidArgument(format!(
                "`{}` is not a function of this runtime",
                function.name()
            ))
        })?;
        self.invoke_handle(handle, args)
    }

    pub(crate) fn invoke_handle(&self, handle: &FunctionHandle, args: &[Value]) -> Result<Value> {
        self.check_arity(handle, args.len())?;

        match &handle.target {
            Target::Native(invoke) => {
                trace!(function = %handle.name, "invoking native function");
                invoke(args).map_err(|err| BridgeError::InvocationFailure {
                    name: handle.name.clone(),
                    message: format!("{err:#}"),
                })
            }
            Target::Loader { tag, symbol } => {
                let loader = self.loader_for(tag)?;
                let args = coerce_args(handle, args)?;
                if !loader.accepts_function_values() {
                    check_wire_args(handle, &args)?;
                }
                debug!(function = %handle.name, loader = %tag, "invoking");
                let result = loader.invoke(symbol, &args).map_err(|err| {
                    BridgeError::InvocationFailure {
                        name: handle.name.clone(),
                        message: format!("{err:#}"),
                    }
                })?;
                coerce_result(handle, result)
            }
        }
    }

    fn loader_for(&self, tag: &str) -> Result<Arc<dyn Loader>> {
        self.with_state(|state| {
            state
                .loaders
                .get(tag)
                .ok_or_else(|| BridgeError::LoaderNotFound(tag.to_string()))
        })
    }

    fn check_arity(&self, handle: &FunctionHandle, found: usize) -> Result<()> {
        let signature = &handle.signature;
        let limit = self.args_size();
        let expected = if found > limit {
            format!("at most {limit}")
        } else if signature.accepts(found) {
            return Ok(());
        } else if signature.variadic {
            format!("at least {}", signature.arity())
        } else {
            signature.arity().to_string()
        };

        Err(BridgeError::ArityMismatch {
            name: handle.name.clone(),
            expected,
            found,
        })
    }
}

/// Casts every argument with a declared tag to that tag. Arguments declared
/// `any` and variadic extras pass through untouched.
fn coerce_args<'a>(handle: &FunctionHandle, args: &'a [Value]) -> Result<Cow<'a, [Value]>> {
    let needs_cast = handle
        .signature
        .params
        .iter()
        .zip(args)
        .any(|(param, arg)| matches!(param, ParamType::Tag(tag) if *tag != arg.tag()));
    if !needs_cast {
        return Ok(Cow::Borrowed(args));
    }

    let mut coerced = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let value = match handle.signature.params.get(index).and_then(|p| p.tag()) {
            Some(tag) => arg.cast(tag).map_err(|source| BridgeError::TypeMismatch {
                name: handle.name.clone(),
                slot: format!("argument {index}"),
                source,
            })?,
            None => arg.clone(),
        };
        coerced.push(value);
    }
    Ok(Cow::Owned(coerced))
}

/// Rejects arguments the loader could not encode, before it is called.
fn check_wire_args(handle: &FunctionHandle, args: &[Value]) -> Result<()> {
    for (index, arg) in args.iter().enumerate() {
        arg.check_wire().map_err(|source| BridgeError::TypeMismatch {
            name: handle.name.clone(),
            slot: format!("argument {index}"),
            source,
        })?;
    }
    Ok(())
}

/// Null results (the callee returned nothing) are passed through; anything
/// else is cast to the declared return tag.
fn coerce_result(handle: &FunctionHandle, result: Value) -> Result<Value> {
    match handle.signature.result.tag() {
        Some(tag) if !result.is_null() && result.tag() != tag => {
            result.cast(tag).map_err(|source| BridgeError::TypeMismatch {
                name: handle.name.clone(),
                slot: "return value".to_string(),
                source,
            })
        }
        _ => Ok(result),
    }
}
