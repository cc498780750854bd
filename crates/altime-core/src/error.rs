use thiserror::Error;

/// Failure of a single IME open-status call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImeError {
    #[error("failed to call GetGUIThreadInfo: {0}")]
    FocusLookup(String),

    #[error("no default IME window for the focused window")]
    NoImeWindow,

    #[error("IMC_SETOPENSTATUS returned {0}")]
    Rejected(isize),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to install keyboard hook: {0}")]
    HookInstall(String),

    #[error("ime call failed: {0}")]
    Ime(#[from] ImeError),

    #[error("invalid key token: {0:?}")]
    InvalidKeyToken(String),

    #[error("failed to persist settings: {0}")]
    Persist(String),

    #[error("failed to inject key: {0}")]
    Inject(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Persist(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Persist(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
