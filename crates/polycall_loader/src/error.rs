use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("no loader available for tag `{0}`")]
    NotFound(String),
    #[error("failed to initialize loader `{tag}`: {source:#}")]
    Create {
        tag: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("load into `{tag}` failed: {source:#}")]
    Load {
        tag: String,
        #[source]
        source: anyhow::Error,
    },
}
