//! Minting of pixel URLs, signed click URLs, and HTML instrumentation.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ulid::Ulid;

use crate::sign::sign_click;

/// Result of instrumenting one recipient's rendered HTML.
#[derive(Debug, Clone)]
pub struct InstrumentedHtml {
    pub html: String,
    /// Pixel token minted for this delivery.
    pub tracking_token: String,
    /// Click identifier to true destination, for the delivery log record.
    pub click_map: HashMap<String, String>,
}

/// Mints signed tracking URLs for outgoing HTML and exposes the pieces
/// the request handlers need to verify them.
#[derive(Debug, Clone)]
pub struct TrackingLinks {
    secret: String,
    base_url: String,
}

impl TrackingLinks {
    #[must_use]
    pub fn new(secret: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            secret: secret.into(),
            base_url,
        }
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Pixel URL for a delivery's tracking token.
    #[must_use]
    pub fn pixel_url(&self, tracking_token: &str) -> String {
        format!("{}/track/open/{tracking_token}", self.base_url)
    }

    /// Signed redirect URL binding `click_id` to `destination`.
    #[must_use]
    pub fn signed_click_url(&self, click_id: &str, destination: &str) -> String {
        let dest_b64 = URL_SAFE_NO_PAD.encode(destination.as_bytes());
        let sig = sign_click(&self.secret, click_id, &dest_b64);
        format!(
            "{}/track/click/{click_id}?sig={sig}&d={dest_b64}",
            self.base_url
        )
    }

    /// Rewrite every tracked hyperlink through the click proxy and append
    /// the tracking pixel, returning the minted token and click map.
    ///
    /// Only absolute `http(s)` destinations in double-quoted `href`
    /// attributes are rewritten; links already pointing at this service
    /// (the upstream-substituted unsubscribe link) are left alone.
    #[must_use]
    pub fn instrument_html(&self, html: &str) -> InstrumentedHtml {
        let tracking_token = Ulid::new().to_string();
        let mut click_map = HashMap::new();

        let mut out = String::with_capacity(html.len() + 256);
        let mut rest = html;
        const NEEDLE: &str = "href=\"";
        while let Some(start) = rest.find(NEEDLE) {
            let value_start = start + NEEDLE.len();
            let Some(value_len) = rest[value_start..].find('"') else {
                break;
            };
            let destination = &rest[value_start..value_start + value_len];

            out.push_str(&rest[..value_start]);
            if self.should_track(destination) {
                let click_id = Ulid::new().to_string();
                out.push_str(&self.signed_click_url(&click_id, destination));
                click_map.insert(click_id, destination.to_string());
            } else {
                out.push_str(destination);
            }
            rest = &rest[value_start + value_len..];
        }
        out.push_str(rest);

        let pixel = format!(
            "<img src=\"{}\" width=\"1\" height=\"1\" alt=\"\" style=\"display:none;\">",
            self.pixel_url(&tracking_token)
        );
        if let Some(idx) = out.rfind("</body>") {
            out.insert_str(idx, &pixel);
        } else {
            out.push_str(&pixel);
        }

        InstrumentedHtml {
            html: out,
            tracking_token,
            click_map,
        }
    }

    fn should_track(&self, destination: &str) -> bool {
        (destination.starts_with("http://") || destination.starts_with("https://"))
            && !destination.starts_with(&self.base_url)
    }
}
