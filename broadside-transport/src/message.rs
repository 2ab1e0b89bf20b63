//! Outbound message shape and the provider wire payload.

use std::collections::HashMap;

use serde::Serialize;

/// One fully-rendered message, ready for the provider call.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
    /// Campaign tag forwarded for provider-side category reporting and
    /// echoed back on webhook events.
    pub campaign_tag: String,
}

impl OutboundMessage {
    /// Render the provider JSON body for this message.
    ///
    /// The campaign tag travels both as a category and as a custom
    /// argument, and open/click tracking is enabled explicitly so the
    /// provider reports engagement events back.
    #[must_use]
    pub fn provider_payload(&self) -> ProviderPayload {
        ProviderPayload {
            personalizations: vec![Personalization {
                to: vec![EmailRef {
                    email: self.to.clone(),
                    name: self.to_name.clone(),
                }],
            }],
            from: EmailRef {
                email: self.from.clone(),
                name: None,
            },
            reply_to: self.reply_to.as_ref().map(|email| EmailRef {
                email: email.clone(),
                name: None,
            }),
            subject: self.subject.clone(),
            content: vec![ContentBlock {
                content_type: "text/html".to_string(),
                value: self.html.clone(),
            }],
            categories: vec![self.campaign_tag.clone()],
            custom_args: HashMap::from([("campaign_id".to_string(), self.campaign_tag.clone())]),
            tracking_settings: TrackingSettings::enabled(),
        }
    }
}

/// Provider mail-send request body.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderPayload {
    personalizations: Vec<Personalization>,
    from: EmailRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<EmailRef>,
    subject: String,
    content: Vec<ContentBlock>,
    categories: Vec<String>,
    custom_args: HashMap<String, String>,
    tracking_settings: TrackingSettings,
}

#[derive(Debug, Clone, Serialize)]
struct Personalization {
    to: Vec<EmailRef>,
}

#[derive(Debug, Clone, Serialize)]
struct EmailRef {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

#[derive(Debug, Clone, Serialize)]
struct TrackingSettings {
    click_tracking: ClickTracking,
    open_tracking: OpenTracking,
}

impl TrackingSettings {
    const fn enabled() -> Self {
        Self {
            click_tracking: ClickTracking {
                enable: true,
                enable_text: true,
            },
            open_tracking: OpenTracking { enable: true },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ClickTracking {
    enable: bool,
    enable_text: bool,
}

#[derive(Debug, Clone, Serialize)]
struct OpenTracking {
    enable: bool,
}
