use thiserror::Error;
use crate::retry::Transient;

#[derive(Error, Debug)]
pub enum QWeatherError {
    #[error("QWeatherError::Http: {0}")]
    Http(String),
    #[error("QWeatherError::Provider: response code {0}")]
    Provider(String),
    #[error("QWeatherError::Body: response is not json: {0}")]
    Body(String),
    #[error("QWeatherError::Document: {0}")]
    Document(String),
}

impl Transient for QWeatherError {
    fn is_transient(&self) -> bool {
        matches!(self, QWeatherError::Http(_) | QWeatherError::Provider(_) | QWeatherError::Body(_))
    }
}

impl From<ureq::Error> for QWeatherError {
    fn from(e: ureq::Error) -> Self { QWeatherError::Http(e.to_string()) }
}
impl From<serde_json::Error> for QWeatherError {
    fn from(e: serde_json::Error) -> Self { QWeatherError::Document(e.to_string()) }
}
impl From<chrono::ParseError> for QWeatherError {
    fn from(e: chrono::ParseError) -> Self { QWeatherError::Document(e.to_string()) }
}
