pub mod errors;

use std::time::Duration;
use log::{error, info};
use ureq::Agent;
use crate::manager_feishu::errors::FeishuError;
use crate::models::feishu::{Card, CardConfig, Element, Header, Message, Reply, Text};
use crate::retry::{with_retry, RetryPolicy};

/// Title marker for warnings, renders the card red
pub const WARNING_MARKER: &str = "⚠️";

/// Title marker for plain announcements, renders the card green
pub const ANNOUNCEMENT_MARKER: &str = "📢";

/// Destination for formatted notifications
pub trait Notifier {
    /// Delivers a notification with a plain text title and a markdown body
    fn push(&self, title: &str, content: &str) -> Result<(), FeishuError>;
}

/// Struct for pushing interactive card messages to a Feishu custom bot webhook
pub struct Feishu {
    agent: Agent,
    webhook_url: String,
    retry: RetryPolicy,
}

impl Feishu {
    /// Returns a new instance of the Feishu struct
    ///
    /// # Arguments
    ///
    /// * 'webhook_url' - the bot webhook to post to
    /// * 'retry' - retry policy applied to every push
    pub fn new(webhook_url: &str, retry: RetryPolicy) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        let agent = config.into();

        Self { agent, webhook_url: webhook_url.to_string(), retry }
    }

    /// Posts a serialized message once and checks the webhook's reply
    ///
    /// # Arguments
    ///
    /// * 'json' - the message in json format
    fn post(&self, json: &str) -> Result<(), FeishuError> {
        let body = self.agent
            .post(self.webhook_url.as_str())
            .content_type("application/json")
            .send(json)?
            .body_mut()
            .read_to_string()?;

        let reply: Reply = serde_json::from_str(&body)
            .map_err(|_| FeishuError::Rejected(body))?;

        if reply.is_ok() {
            Ok(())
        } else {
            Err(FeishuError::Rejected(format!("code {}: {}",
                reply.code.or(reply.status_code).unwrap_or(-1), reply.msg.unwrap_or_default())))
        }
    }
}

impl Notifier for Feishu {
    fn push(&self, title: &str, content: &str) -> Result<(), FeishuError> {
        info!("Pushing Feishu message: {}", title);

        let json = serde_json::to_string(&build_message(title, content))?;
        match with_retry(&self.retry, "Feishu push", || self.post(&json)) {
            Ok(()) => {
                info!("Feishu message pushed");
                Ok(())
            }
            Err(e) => {
                error!("Feishu message not delivered: {}", e);
                Err(e)
            }
        }
    }
}

/// Picks the card header colour from markers in the title
///
/// # Arguments
///
/// * 'title' - the message title
pub fn card_template(title: &str) -> &'static str {
    if title.contains(WARNING_MARKER) || title.to_lowercase().contains("warning") {
        "red"
    } else if title.contains(ANNOUNCEMENT_MARKER) {
        "green"
    } else {
        "blue"
    }
}

/// Builds an interactive card message
///
/// # Arguments
///
/// * 'title' - plain text card title
/// * 'content' - card body in lark markdown
pub fn build_message(title: &str, content: &str) -> Message {
    Message {
        msg_type: "interactive".to_string(),
        card: Card {
            config: CardConfig { wide_screen_mode: true },
            header: Header {
                template: card_template(title).to_string(),
                title: Text { content: title.to_string(), tag: "plain_text".to_string() },
            },
            elements: vec![Element {
                tag: "div".to_string(),
                text: Text { content: content.to_string(), tag: "lark_md".to_string() },
            }],
        },
    }
}
