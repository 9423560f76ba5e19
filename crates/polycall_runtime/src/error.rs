use thiserror::Error;

use polycall_loader::LoaderError;
use polycall_value::ValueError;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("runtime initialization failed: {0}")]
    Initialization(String),
    #[error("no loader available for tag `{0}`")]
    LoaderNotFound(String),
    #[error("load into `{tag}` failed: {message}")]
    LoadFailure { tag: String, message: String },
    #[error("function `{0}` not found")]
    FunctionNotFound(String),
    #[error("`{name}` expects {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
    },
    #[error("`{name}` {slot}: {source}")]
    TypeMismatch {
        name: String,
        slot: String,
        #[source]
        source: ValueError,
    },
    #[error("`{name}` failed: {message}")]
    InvocationFailure { name: String, message: String },
    #[error("runtime is not initialized")]
    NotInitialized,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl BridgeError {
    /// Status code reported across the C boundary. `0` is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            BridgeError::Initialization(_) => 1,
            BridgeError::LoaderNotFound(_) => 2,
            BridgeError::LoadFailure { .. } => 3,
            BridgeError::FunctionNotFound(_) => 4,
            BridgeError::ArityMismatch { .. } => 5,
            BridgeError::TypeMismatch { .. } => 6,
            BridgeError::InvocationFailure { .. } => 7,
            BridgeError::NotInitialized => 8,
            BridgeError::InvalidArgument(_) => 9,
        }
    }
}

impl From<LoaderError> for BridgeError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::NotFound(tag) => BridgeError::LoaderNotFound(tag),
            LoaderError::Create { tag, source } | LoaderError::Load { tag, source } => {
                BridgeError::LoadFailure {
                    tag,
                    message: format!("{source:#}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_and_non_zero() {
        let errors = [
            BridgeError::Initialization(String::new()),
            BridgeError::LoaderNotFound(String::new()),
            BridgeError::LoadFailure {
                tag: String::new(),
                message: String::new(),
            },
            BridgeError::FunctionNotFound(String::new()),
            BridgeError::ArityMismatch {
                name: String::new(),
                expected: String::new(),
                found: 0,
            },
            BridgeError::TypeMismatch {
                name: String::new(),
                slot: String::new(),
                source: ValueError::UnknownTag(String::new()),
            },
            BridgeError::InvocationFailure {
                name: String::new(),
                message: String::new(),
            },
            BridgeError::NotInitialized,
            BridgeError::InvalidArgument(String::new()),
        ];
        let mut codes = errors.iter().map(BridgeError::code).collect::<Vec<_>>();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn loader_errors_keep_context_chain() {
        let source = anyhow::anyhow!("unexpected token").context("parsing main.script");
        let err = BridgeError::from(LoaderError::Load {
            tag: "script".into(),
            source,
        });
        assert_eq!(
            err.to_string(),
            "load into `script` failed: parsing main.script: unexpected token"
        );
    }
}
