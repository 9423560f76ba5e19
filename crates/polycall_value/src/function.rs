use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Something the dispatcher knows how to invoke.
///
/// Implemented by the registry's function handles; the value system only needs
/// a name for display and a way back to the concrete type.
pub trait Callable: Any + Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// A callable wrapped as a value so it can travel as an argument or result.
///
/// Copies share the same underlying handle. Two references are equal only when
/// they point at the same handle.
#[derive(Clone)]
pub struct FunctionRef(Arc<dyn Callable>);

impl FunctionRef {
    pub fn new(callable: Arc<dyn Callable>) -> Self {
        Self(callable)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn downcast_ref<T: Callable>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn callable(&self) -> &Arc<dyn Callable> {
        &self.0
    }

    #[inline]
    pub fn ptr_eq(&self, other: &FunctionRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({})", self.name())
    }
}
