use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct Text {
    pub content: String,
    pub tag: String,
}

#[derive(Serialize)]
pub struct Element {
    pub tag: String,
    pub text: Text,
}

#[derive(Serialize)]
pub struct Header {
    pub template: String,
    pub title: Text,
}

#[derive(Serialize)]
pub struct CardConfig {
    pub wide_screen_mode: bool,
}

#[derive(Serialize)]
pub struct Card {
    pub config: CardConfig,
    pub header: Header,
    pub elements: Vec<Element>,
}

#[derive(Serialize)]
pub struct Message {
    pub msg_type: String,
    pub card: Card,
}

/// Webhook reply, older endpoints answer with `StatusCode` and newer with `code`
#[derive(Deserialize)]
pub struct Reply {
    #[serde(rename = "StatusCode")]
    pub status_code: Option<i64>,
    pub code: Option<i64>,
    pub msg: Option<String>,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        self.status_code == Some(0) || self.code == Some(0)
    }
}
