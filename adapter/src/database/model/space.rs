use kernel::model::{id::SpaceId, space::Space};
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct SpaceRow {
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

impl From<SpaceRow> for Space {
    fn from(value: SpaceRow) -> Self {
        let SpaceRow {
            space_id,
            name,
            description,
            capacity,
            hourly_rate,
            is_available,
            location,
            amenities,
            image_urls,
            created_at,
        } = value;
        Space {
            space_id,
            name,
            description,
            capacity,
            hourly_rate,
            is_available,
            location,
            amenities,
            image_urls,
            created_at,
        }
    }
}
