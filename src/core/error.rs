use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapgenError {
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: syn::Error,
    },

    #[error("invalid generator configuration: {0}")]
    Config(String),

    #[error("generated code is not valid Rust: {0}")]
    InvalidOutput(#[source] syn::Error),

    #[error("failed to write `{path}`: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
