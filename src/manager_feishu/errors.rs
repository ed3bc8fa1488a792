use std::fmt::{Display, Formatter};
use ureq::Error;
use crate::retry::Transient;

#[derive(Debug)]
pub enum FeishuError {
    Document(String),
    Http(String),
    Rejected(String),
}

impl Display for FeishuError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeishuError::Document(e) => write!(f, "FeishuError::Document: {}", e),
            FeishuError::Http(e) => write!(f, "FeishuError::Http: {}", e),
            FeishuError::Rejected(e) => write!(f, "FeishuError::Rejected: {}", e),
        }
    }
}
impl std::error::Error for FeishuError {}

impl Transient for FeishuError {
    fn is_transient(&self) -> bool {
        !matches!(self, FeishuError::Document(_))
    }
}

impl From<serde_json::Error> for FeishuError {
    fn from(e: serde_json::Error) -> Self { FeishuError::Document(e.to_string()) }
}
impl From<Error> for FeishuError {
    fn from(e: Error) -> Self { FeishuError::Http(e.to_string()) }
}
