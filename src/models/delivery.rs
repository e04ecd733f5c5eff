use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Reserved channel name for acknowledgement audit records.
pub const ACK_CHANNEL: &str = "ack";

/// One delivery attempt. Append-only: never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub alert_id: ObjectId,
    pub channel: String,
    pub success: bool,

    #[serde(default)]
    pub metadata: serde_json::Value,

    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub alert_id: ObjectId,
    pub channel: String,
    pub success: bool,
    pub metadata: serde_json::Value,
}

impl NewDelivery {
    pub fn into_delivery(self, created_at: i64) -> Delivery {
        Delivery {
            id: ObjectId::new(),
            alert_id: self.alert_id,
            channel: self.channel,
            success: self.success,
            metadata: self.metadata,
            created_at,
        }
    }
}
