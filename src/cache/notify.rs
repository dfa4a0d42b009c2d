use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const NOTIFICATION_TAG: &str = "factory-update";
const DEFAULT_TITLE: &str = "کارخانه هوشمند";
const DEFAULT_BODY: &str = "بروزرسانی جدید در داشبورد کارخانه هوشمند";

/// Inbound push payload. Both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl PushPayload {
    /// Unreadable payloads fall back to the defaults.
    pub fn from_bytes(data: Option<&[u8]>) -> Self {
        data.and_then(|bytes| serde_json::from_slice(bytes).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub actions: Vec<NotificationAction>,
    pub vibrate: Vec<u32>,
    pub require_interaction: bool,
    pub data: PushPayload,
}

impl Notification {
    pub fn from_push(payload: PushPayload) -> Self {
        Self {
            title: payload.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: payload.body.clone().unwrap_or_else(|| DEFAULT_BODY.to_string()),
            tag: NOTIFICATION_TAG.to_string(),
            actions: vec![
                NotificationAction {
                    action: "view".to_string(),
                    title: "مشاهده".to_string(),
                },
                NotificationAction {
                    action: "dismiss".to_string(),
                    title: "رد کردن".to_string(),
                },
            ],
            vibrate: vec![200, 100, 200],
            require_interaction: true,
            data: payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    View,
    Dismiss,
    Default,
}

impl ClickAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "view" => ClickAction::View,
            "dismiss" => ClickAction::Dismiss,
            _ => ClickAction::Default,
        }
    }
}

/// Notifications currently on screen, newest last. Same tag replaces.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    shown: Mutex<Vec<Notification>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self, notification: Notification) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.retain(|n| n.tag != notification.tag);
            shown.push(notification);
        }
    }

    pub fn close(&self, tag: &str) -> bool {
        let Ok(mut shown) = self.shown.lock() else {
            return false;
        };
        let before = shown.len();
        shown.retain(|n| n.tag != tag);
        shown.len() != before
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_payload_defaults() {
        let n = Notification::from_push(PushPayload::from_bytes(None));
        assert_eq!(n.title, DEFAULT_TITLE);
        assert_eq!(n.body, DEFAULT_BODY);
        assert_eq!(n.actions.len(), 2);

        let n = Notification::from_push(PushPayload::from_bytes(Some(b"not json")));
        assert_eq!(n.title, DEFAULT_TITLE);

        let n = Notification::from_push(PushPayload::from_bytes(Some(br#"{"title":"Gas leak"}"#)));
        assert_eq!(n.title, "Gas leak");
        assert_eq!(n.body, DEFAULT_BODY);
    }

    #[test]
    fn same_tag_replaces() {
        let center = NotificationCenter::new();
        center.show(Notification::from_push(PushPayload::default()));
        center.show(Notification::from_push(PushPayload::default()));
        assert_eq!(center.shown().len(), 1);
        assert!(center.close(NOTIFICATION_TAG));
        assert!(center.shown().is_empty());
    }
}
