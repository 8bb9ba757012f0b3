use axum::{
    routing::{delete, get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::user::{
    change_password, delete_current_user, delete_user, get_current_user, list_users,
    reactivate_user, register_user, update_profile,
};

pub fn build_user_routers() -> Router<AppRegistry> {
    let routers = Router::new()
        .route("/", post(register_user))
        .route("/", get(list_users))
        .route("/reactivate", post(reactivate_user))
        .route(
            "/me",
            get(get_current_user)
                .put(update_profile)
                .delete(delete_current_user),
        )
        .route("/me/password", put(change_password))
        .route("/:user_id", delete(delete_user));

    Router::new().nest("/users", routers)
}
