use crate::model::{id::SpaceId, space::Space};
use shared::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct CreateSpace {
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub hourly_rate: i64,
    pub is_available: bool,
    pub location: String,
    pub amenities: Vec<String>,
    pub image_urls: Vec<String>,
}

impl CreateSpace {
    pub fn validate(&self) -> AppResult<()> {
        ensure_positive(self.capacity.into(), self.hourly_rate)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSpace {
    pub space_id: SpaceId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub hourly_rate: Option<i64>,
    pub is_available: Option<bool>,
    pub location: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub image_urls: Option<Vec<String>>,
}

impl UpdateSpace {
    // 指定されたフィールドのみを上書きした新しい Space を返す
    pub fn apply(self, current: Space) -> AppResult<Space> {
        let merged = Space {
            space_id: current.space_id,
            name: self.name.unwrap_or(current.name),
            description: self.description.or(current.description),
            capacity: self.capacity.unwrap_or(current.capacity),
            hourly_rate: self.hourly_rate.unwrap_or(current.hourly_rate),
            is_available: self.is_available.unwrap_or(current.is_available),
            location: self.location.unwrap_or(current.location),
            amenities: self.amenities.unwrap_or(current.amenities),
            image_urls: self.image_urls.unwrap_or(current.image_urls),
            created_at: current.created_at,
        };
        ensure_positive(merged.capacity.into(), merged.hourly_rate)?;
        Ok(merged)
    }
}

#[derive(Debug)]
pub struct DeleteSpace {
    pub space_id: SpaceId,
}

fn ensure_positive(capacity: i64, hourly_rate: i64) -> AppResult<()> {
    if capacity <= 0 {
        return Err(AppError::InvalidInput(
            "capacity must be greater than zero".into(),
        ));
    }
    if hourly_rate <= 0 {
        return Err(AppError::InvalidInput(
            "hourly rate must be greater than zero".into(),
        ));
    }
    Ok(())
}
