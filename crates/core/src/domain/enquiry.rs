use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnquiryId(pub String);

impl EnquiryId {
    /// `ENQ` followed by the unix timestamp (seconds) of creation.
    pub fn at(created_at: DateTime<Utc>) -> Self {
        Self(format!("ENQ{}", created_at.timestamp()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnquiryStatus {
    New,
    Contacted,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enquiry {
    pub id: EnquiryId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub message: String,
    pub status: EnquiryStatus,
    pub created_at: DateTime<Utc>,
}
