use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{
    id::SpaceId,
    space::event::{CreateSpace, DeleteSpace},
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::space::{
        CreateSpaceRequest, SpaceResponse, SpacesResponse, UpdateSpaceRequest,
        UpdateSpaceRequestWithIds,
    },
};

pub async fn register_space(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateSpaceRequest>,
) -> AppResult<(StatusCode, Json<SpaceResponse>)> {
    user.require_admin()?;
    req.validate(&())?;

    let space = registry
        .space_repository()
        .create(CreateSpace::from(req))
        .await?;

    Ok((StatusCode::CREATED, Json(space.into())))
}

pub async fn show_space_list(
    State(registry): State<AppRegistry>,
) -> AppResult<Json<SpacesResponse>> {
    registry
        .space_repository()
        .find_all()
        .await
        .map(SpacesResponse::from)
        .map(Json)
}

pub async fn show_space(
    Path(space_id): Path<SpaceId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<SpaceResponse>> {
    registry
        .space_repository()
        .find_by_id(space_id)
        .await
        .and_then(|space| match space {
            Some(space) => Ok(Json(space.into())),
            None => Err(AppError::EntityNotFound(format!(
                "Space ({space_id}) not found"
            ))),
        })
}

pub async fn update_space(
    user: AuthorizedUser,
    Path(space_id): Path<SpaceId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateSpaceRequest>,
) -> AppResult<Json<SpaceResponse>> {
    user.require_admin()?;
    req.validate(&())?;

    let update_space = UpdateSpaceRequestWithIds::new(space_id, req);
    registry
        .space_repository()
        .update(update_space.into())
        .await
        .map(SpaceResponse::from)
        .map(Json)
}

pub async fn delete_space(
    user: AuthorizedUser,
    Path(space_id): Path<SpaceId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    user.require_admin()?;

    registry
        .space_repository()
        .delete(DeleteSpace { space_id })
        .await
        .map(|_| StatusCode::NO_CONTENT)
}
