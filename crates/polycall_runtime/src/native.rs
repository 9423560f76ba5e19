use std::sync::Arc;

use polycall_symbol::{FunctionHandle, Signature};
use polycall_value::{Value, ValueTag};

use crate::error::{BridgeError, Result};
use crate::runtime::Runtime;

impl Runtime {
    /// Registers a host function under `name`, replacing any function of the
    /// same name.
    ///
    /// `result` and `params` document the function and fix its arity;
    /// arguments are handed over as given, without coercion.
    pub fn register<F>(&self, name: &str, invoke: F, result: ValueTag, params: &[ValueTag]) -> Result<()>
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register_with_signature(name, Signature::from_tags(params, result), invoke)
    }

    /// Like [`Runtime::register`], for signatures using `any` or variadic
    /// parameters.
    pub fn register_with_signature<F>(&self, name: &str, signature: Signature, invoke: F) -> Result<()>
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(BridgeError::InvalidArgument(
                "function name must not be empty".to_string(),
            ));
        }
        if signature.arity() > self.args_size() {
            return Err(BridgeError::ArityMismatch {
                name: name.to_string(),
                expected: format!("at most {}", self.args_size()),
                found: signature.arity(),
            });
        }

        let handle = FunctionHandle::native(name, signature, Arc::new(invoke));
        self.with_state_mut(|state| {
            state.registry.register(handle);
            Ok(())
        })
    }
}
