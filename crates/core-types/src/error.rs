use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("given type must be 'train', 'backtest' or 'live', is '{0}'")]
    InvalidKind(String),

    #[error("invalid instance query '{0}': expected 'kind:label'")]
    InvalidQuery(String),

    #[error("invalid instance label '{0}'")]
    InvalidLabel(String),

    #[error("invalid status positiveness {0}: expected -1, 0 or 1")]
    InvalidPositiveness(i8),
}
