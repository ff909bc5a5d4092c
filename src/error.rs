use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid graph structure: {0}")]
    InvalidGraph(String),

    #[error("Value not allocated: {0}")]
    UnallocatedValue(String),

    #[error("Constant size mismatch for {name}: declared {declared} elements, data has {actual}")]
    ConstantSizeMismatch {
        name: String,
        declared: usize,
        actual: usize,
    },

    #[error("Duplicate value in collection pass: {0}")]
    DuplicateValue(String),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
