pub type MontageResult<T> = Result<T, MontageError>;

#[derive(thiserror::Error, Debug)]
pub enum MontageError {
    #[error("config error: {0}")]
    Config(String),

    #[error("no media items to place on the timeline")]
    EmptyInput,

    #[error("allocation error: {0}")]
    Allocation(String),

    #[error("timeline invariant violated: {0}")]
    Invariant(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MontageError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
