use chrono::{DateTime, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    id::SpaceId,
    space::{
        event::{CreateSpace, UpdateSpace},
        Space,
    },
};
use serde::{Deserialize, Serialize};

fn default_available() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpaceRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    #[garde(length(max = 2000))]
    pub description: Option<String>,
    #[garde(range(min = 1))]
    pub capacity: i32,
    #[garde(range(min = 1, max = 100_000_000))]
    pub hourly_rate: i64,
    #[serde(default = "default_available")]
    #[garde(skip)]
    pub is_available: bool,
    #[garde(length(min = 1))]
    pub location: String,
    #[serde(default)]
    #[garde(skip)]
    pub amenities: Vec<String>,
    #[serde(default)]
    #[garde(skip)]
    pub image_urls: Vec<String>,
}

impl From<CreateSpaceRequest> for CreateSpace {
    fn from(value: CreateSpaceRequest) -> Self {
        let CreateSpaceRequest {
            name,
            description,
            capacity,
            hourly_rate,
            is_available,
            location,
            amenities,
            image_urls,
        } = value;
        CreateSpace {
            name,
            description,
            capacity,
            hourly_rate,
            is_available,
            location,
            amenities,
            image_urls,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpaceRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[garde(length(max = 2000))]
    pub description: Option<String>,
    #[garde(range(min = 1))]
    pub capacity: Option<i32>,
    #[garde(range(min = 1, max = 100_000_000))]
    pub hourly_rate: Option<i64>,
    #[garde(skip)]
    pub is_available: Option<bool>,
    #[garde(length(min = 1))]
    pub location: Option<String>,
    #[garde(skip)]
    pub amenities: Option<Vec<String>>,
    #[garde(skip)]
    pub image_urls: Option<Vec<String>>,
}

#[derive(new)]
pub struct UpdateSpaceRequestWithIds(SpaceId, UpdateSpaceRequest);

impl From<UpdateSpaceRequestWithIds> for UpdateSpace {
    fn from(value: UpdateSpaceRequestWithIds) -> Self {
        let UpdateSpaceRequestWithIds(
            space_id,
            UpdateSpaceRequest {
                name,
                description,
                capacity,
                hourly_rate,
                is_available,
                location,
                amenities,
                image_urls,
            },
        ) = value;
        UpdateSpace {
            space_id,
            name,
            description,
            capacity,
            hourly_rate,
            is_available,
            location,
            amenities,
            image_urls,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacesResponse {
    pub items: Vec<SpaceResponse>,
}

impl From<Vec<Space>> for SpacesResponse {
    fn from(value: Vec<Space>) -> Self {
        Self {
            items: value.into_iter().map(SpaceResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceResponse {
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

impl From<Space> for SpaceResponse {
    fn from(value: Space) -> Self {
        let Space {
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
        Self {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_rate_has_an_upper_bound() {
        let req: CreateSpaceRequest = serde_json::from_value(serde_json::json!({
            "name": "Room A",
            "capacity": 4,
            "hourlyRate": 1_000_000_000_000_000i64,
            "location": "1F"
        }))
        .unwrap();
        assert!(req.validate(&()).is_err());

        let update = UpdateSpaceRequest {
            hourly_rate: Some(1_000_000_000_000_000),
            ..Default::default()
        };
        assert!(update.validate(&()).is_err());

        let update = UpdateSpaceRequest {
            hourly_rate: Some(5_000),
            ..Default::default()
        };
        assert!(update.validate(&()).is_ok());
    }
}
