use thiserror::Error;

/// Errors raised while loading external data (booster files, ground maps,
/// body configuration). The numerical core never returns these.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed booster json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("config line {line}: {msg}")]
    Cfg { line: usize, msg: String },
    #[error("invalid booster: {0}")]
    InvalidBooster(String),
    #[error("propellant {0} has no density and is not in the density table")]
    UnknownPropellant(String),
    #[error("unknown body {0}")]
    UnknownBody(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
