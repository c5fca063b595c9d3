use std::path::PathBuf;
use thiserror::Error;
use vddkflow_core::BackendError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("could not read namespace file {}: {source}", .path.display())]
    NamespaceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file was empty: {}", .0.display())]
    NamespaceEmpty(PathBuf),

    #[error(
        "unable to load in-cluster configuration, KUBERNETES_SERVICE_HOST and KUBERNETES_SERVICE_PORT must be defined"
    )]
    NotInCluster,

    #[error("could not read service account token {}: {source}", .path.display())]
    Token {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CA bundle {}: {message}", .path.display())]
    CaCertificate { path: PathBuf, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid image tag: {tag}")]
    InvalidTag { tag: String },
}

impl BuildError {
    /// 失敗した段階ごとに BackendError へ振り分ける
    pub fn into_backend(self) -> BackendError {
        match self {
            BuildError::NamespaceUnreadable { .. } | BuildError::NamespaceEmpty(_) => {
                BackendError::Namespace(self.to_string())
            }
            BuildError::NotInCluster
            | BuildError::Token { .. }
            | BuildError::CaCertificate { .. } => BackendError::Config(self.to_string()),
            BuildError::HttpClient(_) | BuildError::InvalidTag { .. } => {
                BackendError::Client(self.to_string())
            }
        }
    }
}

impl From<BuildError> for BackendError {
    fn from(err: BuildError) -> Self {
        err.into_backend()
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
