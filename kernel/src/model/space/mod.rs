use crate::model::id::SpaceId;
use chrono::{DateTime, Utc};

pub mod event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub space_id: SpaceId,
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub hourly_rate: i64,
    pub is_available: bool,
    pub location: String,
    pub amenities: Vec<String>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}
