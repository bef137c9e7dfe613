/// Engine error kinds surfaced to the driver.
///
/// Degenerate samples (zero pdf, missed film, ...) are not errors; the
/// sampling functions return `None` for those and the walk stops locally.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("i/o error: {0}")]
    IoError(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
}
