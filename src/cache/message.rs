use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

/// Control messages a page posts to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    #[serde(rename = "CACHE_DATA")]
    CacheData { url: String, data: String },
}

impl ClientMessage {
    /// `None` for anything that is not a recognised command.
    pub fn parse(raw: &Value) -> Option<Self> {
        serde_json::from_value(raw.clone()).ok()
    }
}

/// The single acknowledgement sent on a message's reply port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(rename = "type")]
    pub kind: String,
    pub success: bool,
    pub message: String,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            kind: "RESPONSE".to_string(),
            success: true,
            message: "پیام دریافت شد".to_string(),
        }
    }

    pub fn failed(reason: &str) -> Self {
        Self {
            kind: "RESPONSE".to_string(),
            success: false,
            message: reason.to_string(),
        }
    }
}

pub type ReplyPort = oneshot::Sender<Reply>;

/// Notifications the worker pushes to every open page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
    #[serde(rename = "DATA_UPDATED")]
    DataUpdated { message: String },
    #[serde(rename = "SW_UPDATED")]
    WorkerUpdated { message: String },
}

impl PageMessage {
    pub fn data_updated() -> Self {
        PageMessage::DataUpdated {
            message: "داده‌ها بروزرسانی شدند".to_string(),
        }
    }

    pub fn worker_updated() -> Self {
        PageMessage::WorkerUpdated {
            message: "اپلیکیشن بروزرسانی شد".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            ClientMessage::parse(&json!({"type": "SKIP_WAITING"})),
            Some(ClientMessage::SkipWaiting)
        );
        assert_eq!(
            ClientMessage::parse(&json!({"type": "CACHE_DATA", "url": "/data.csv", "data": "a,b"})),
            Some(ClientMessage::CacheData {
                url: "/data.csv".to_string(),
                data: "a,b".to_string()
            })
        );
        assert_eq!(ClientMessage::parse(&json!({"type": "PING"})), None);
        assert_eq!(ClientMessage::parse(&json!("noise")), None);
    }

    #[test]
    fn reply_wire_shape() {
        let v = serde_json::to_value(Reply::ok()).unwrap();
        assert_eq!(v["type"], "RESPONSE");
        assert_eq!(v["success"], true);
        let v = serde_json::to_value(PageMessage::data_updated()).unwrap();
        assert_eq!(v["type"], "DATA_UPDATED");
    }
}
