use std::any::Any;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use polycall_value::{Callable, FunctionRef, ParamType, Value, ValueTag};

/// Native implementation registered directly with the runtime.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<ParamType>,
    /// Accepts extra trailing arguments beyond `params`.
    #[serde(default)]
    pub variadic: bool,
    pub result: ParamType,
}

impl Signature {
    pub fn new(params: Vec<ParamType>, result: ParamType) -> Self {
        Self {
            params,
            variadic: false,
            result,
        }
    }

    pub fn variadic(params: Vec<ParamType>, result: ParamType) -> Self {
        Self {
            params,
            variadic: true,
            result,
        }
    }

    pub fn from_tags(params: &[ValueTag], result: ValueTag) -> Self {
        Self::new(
            params.iter().copied().map(ParamType::Tag).collect(),
            ParamType::Tag(result),
        )
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn accepts(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.params.len()
        } else {
            count == self.params.len()
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params = self
            .params
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        if self.variadic {
            params.push("...".to_string());
        }
        write!(f, "({}) -> {}", params.join(", "), self.result)
    }
}

/// Where an invocation is routed.
#[derive(Clone)]
pub enum Target {
    /// A symbol owned by the loader registered under `tag`.
    Loader { tag: String, symbol: String },
    Native(NativeFn),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Loader { tag, symbol } => f
                .debug_struct("Loader")
                .field("tag", tag)
                .field("symbol", symbol)
                .finish(),
            Target::Native(_) => f.write_str("Native"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FunctionHandle {
    pub name: String,
    pub signature: Signature,
    pub target: Target,
}

impl FunctionHandle {
    pub fn loader(
        name: impl Into<String>,
        signature: Signature,
        tag: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            target: Target::Loader {
                tag: tag.into(),
                symbol: symbol.into(),
            },
        }
    }

    pub fn native(name: impl Into<String>, signature: Signature, invoke: NativeFn) -> Self {
        Self {
            name: name.into(),
            signature,
            target: Target::Native(invoke),
        }
    }

    /// Tag of the owning loader, `None` for native registrations.
    pub fn loader_tag(&self) -> Option<&str> {
        match &self.target {
            Target::Loader { tag, .. } => Some(tag),
            Target::Native(_) => None,
        }
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        matches!(self.target, Target::Native(_))
    }

    /// Wraps a shared handle as a function value.
    pub fn to_value(self: &Arc<Self>) -> Value {
        Value::Function(FunctionRef::new(self.clone()))
    }
}

impl Callable for FunctionHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_display_and_arity() {
        let sig = Signature::from_tags(&[ValueTag::I32, ValueTag::Str], ValueTag::Bool);
        assert_eq!(sig.to_string(), "(i32, str) -> bool");
        assert!(sig.accepts(2));
        assert!(!sig.accepts(1));
        assert!(!sig.accepts(3));

        let variadic = Signature::variadic(vec![ParamType::Any], ParamType::Any);
        assert_eq!(variadic.to_string(), "(any, ...) -> any");
        assert!(variadic.accepts(1));
        assert!(variadic.accepts(4));
        assert!(!variadic.accepts(0));
    }

    #[test]
    fn function_value_downcasts_to_handle() {
        let handle = Arc::new(FunctionHandle::loader(
            "greet",
            Signature::new(vec![], ParamType::Tag(ValueTag::Str)),
            "dylib",
            "greet_impl",
        ));
        let value = handle.to_value();
        let func = value.as_function().unwrap();
        assert_eq!(func.name(), "greet");
        let back = func.downcast_ref::<FunctionHandle>().unwrap();
        assert_eq!(back.loader_tag(), Some("dylib"));
        assert_eq!(value, handle.to_value());
    }
}
