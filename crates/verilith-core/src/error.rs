use thiserror::Error;

/// Errors raised by the geometry kernel and layout database.
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("coordinate {0} is outside the representable grid range")]
    CoordinateRange(i64),

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("hierarchy error: {0}")]
    Hierarchy(String),
}
