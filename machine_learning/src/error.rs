use std::{
    collections::TryReserveError,
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    /// Two buffers that must agree in length don't.
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A hyperparameter or a combination of them makes the run meaningless.
    InvalidConfig(&'static str),
    /// Training was requested over a dataset without examples.
    EmptyDataset,
    /// A loss or a gradient stopped being a finite number.
    NonFinite { what: &'static str },
    /// A parameter distribution could not be built.
    Distribution(String),
    /// The host memory for the candidate iterates could not be reserved.
    Allocation { bytes: usize, source: TryReserveError },
    /// More candidate iterates were pushed than the arena was sized for.
    ArenaFull { capacity: usize },
    /// An outer epoch ended without a single inner iterate to pick the next snapshot from.
    NoIterates,
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}: got {got}, expected {expected}"),
            MlErr::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            MlErr::EmptyDataset => write!(f, "the dataset has no examples"),
            MlErr::NonFinite { what } => write!(f, "the {what} is not finite"),
            MlErr::Distribution(msg) => write!(f, "invalid parameter distribution: {msg}"),
            MlErr::Allocation { bytes, source } => {
                write!(f, "failed to reserve {bytes} bytes for candidate iterates: {source}")
            }
            MlErr::ArenaFull { capacity } => {
                write!(f, "the iterate arena is full, it holds at most {capacity} states")
            }
            MlErr::NoIterates => write!(f, "no inner iterates to pick the next snapshot from"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Allocation { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<rand_distr::uniform::Error> for MlErr {
    fn from(value: rand_distr::uniform::Error) -> Self {
        Self::Distribution(value.to_string())
    }
}
