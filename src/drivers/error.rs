use thiserror::Error;
#[derive(Debug, Error)]
pub enum EmgError {
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("channel {0} is out of range (0-7)")]
    InvalidChannel(usize),
    #[error("command field `{field}` must be a single digit, got {value}")]
    CommandField { field: &'static str, value: usize },
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("no byte source is connected")]
    NotConnected,
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl EmgError {
    /// Errors that end the current session: the link itself is gone or broken.
    pub fn is_transport(&self) -> bool {
        matches!(self, EmgError::Transport(_) | EmgError::Serial(_))
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for EmgError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        EmgError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for EmgError {
    fn from(value: image::ImageError) -> Self {
        EmgError::Plot(value.to_string())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn transport_classification() {
        let io = EmgError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert!(io.is_transport());
        assert!(!EmgError::InvalidChannel(9).is_transport());
        assert!(!EmgError::NotConnected.is_transport());
    }
}
