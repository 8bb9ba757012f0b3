use axum::Router;
use registry::AppRegistry;

use super::{
    booking::build_booking_routers, health::build_health_check_routers,
    payment::build_payment_routers, space::build_space_routers, user::build_user_routers,
};

pub fn routes() -> Router<AppRegistry> {
    let router = Router::new()
        .merge(build_health_check_routers())
        .merge(build_user_routers())
        .merge(build_space_routers())
        .merge(build_booking_routers())
        .merge(build_payment_routers());

    Router::new().nest("/api/v1", router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use kernel::{
        model::{auth::AccessToken, booking::TakenSlot, id::SpaceId},
        repository::{
            auth::{AuthRepository, MockAuthRepository},
            booking::{BookingRepository, MockBookingRepository},
            health::{HealthCheckRepository, MockHealthCheckRepository},
        },
    };
    use mockall::predicate::eq;
    use registry::MockAppRegistryExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_routes_are_public() {
        let mut health = MockHealthCheckRepository::new();
        health.expect_check_db().returning(|| false);
        let health: Arc<dyn HealthCheckRepository> = Arc::new(health);

        let mut registry = MockAppRegistryExt::new();
        registry
            .expect_health_check_repository()
            .returning(move || health.clone());
        let app = routes().with_state(Arc::new(registry) as AppRegistry);

        let res = app.clone().oneshot(get("/api/v1/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let res = app.oneshot(get("/api/v1/health/db")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn taken_slots_do_not_need_a_token() {
        let space_id = SpaceId::new();
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_taken_by_space_id()
            .with(eq(space_id), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(Vec::<TakenSlot>::new()));
        let bookings: Arc<dyn BookingRepository> = Arc::new(bookings);

        let mut registry = MockAppRegistryExt::new();
        registry
            .expect_booking_repository()
            .returning(move || bookings.clone());
        let app = routes().with_state(Arc::new(registry) as AppRegistry);

        let res = app
            .oneshot(get(&format!("/api/v1/bookings/taken/{space_id}")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bookings_require_a_known_token() {
        let mut auth = MockAuthRepository::new();
        auth.expect_fetch_user_id_from_token()
            .withf(|token: &AccessToken| token.0 == "stale")
            .returning(|_| Ok(None));
        let auth: Arc<dyn AuthRepository> = Arc::new(auth);

        let mut registry = MockAppRegistryExt::new();
        registry
            .expect_auth_repository()
            .returning(move || auth.clone());
        let app = routes().with_state(Arc::new(registry) as AppRegistry);

        let res = app
            .clone()
            .oneshot(get("/api/v1/bookings"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/api/v1/bookings")
            .header("Authorization", "Bearer stale")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
