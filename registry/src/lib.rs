use std::sync::Arc;

use adapter::{
    database::ConnectionPool,
    gateway::PaystackClient,
    redis::RedisClient,
    repository::{
        auth::AuthRepositoryImpl, booking::BookingRepositoryImpl,
        health::HealthCheckRepositoryImpl, payment::PaymentRepositoryImpl,
        space::SpaceRepositoryImpl, user::UserRepositoryImpl,
    },
};
use kernel::repository::{
    auth::AuthRepository,
    booking::BookingRepository,
    health::HealthCheckRepository,
    payment::{PaymentGateway, PaymentRepository},
    space::SpaceRepository,
    user::UserRepository,
};
use shared::{
    config::{AppConfig, PaymentConfig},
    error::AppResult,
};

pub mod seed;
pub mod sweeper;

#[derive(Clone)]
pub struct AppRegistryImpl {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    auth_repository: Arc<dyn AuthRepository>,
    user_repository: Arc<dyn UserRepository>,
    space_repository: Arc<dyn SpaceRepository>,
    booking_repository: Arc<dyn BookingRepository>,
    payment_repository: Arc<dyn PaymentRepository>,
    payment_gateway: Arc<dyn PaymentGateway>,
    payment_config: PaymentConfig,
}

impl AppRegistryImpl {
    pub fn new(
        pool: ConnectionPool,
        redis_client: Arc<RedisClient>,
        app_config: &AppConfig,
    ) -> AppResult<Self> {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let auth_repository = Arc::new(AuthRepositoryImpl::new(
            pool.clone(),
            redis_client.clone(),
            app_config.auth.ttl,
        ));
        let user_repository = Arc::new(UserRepositoryImpl::new(pool.clone()));
        let space_repository = Arc::new(SpaceRepositoryImpl::new(pool.clone()));
        let booking_repository = Arc::new(BookingRepositoryImpl::new(pool.clone()));
        let payment_repository = Arc::new(PaymentRepositoryImpl::new(pool.clone()));
        let payment_gateway = Arc::new(PaystackClient::new(&app_config.payment)?);
        Ok(Self {
            health_check_repository,
            auth_repository,
            user_repository,
            space_repository,
            booking_repository,
            payment_repository,
            payment_gateway,
            payment_config: app_config.payment.clone(),
        })
    }
}

#[mockall::automock]
pub trait AppRegistryExt {
    fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository>;
    fn auth_repository(&self) -> Arc<dyn AuthRepository>;
    fn user_repository(&self) -> Arc<dyn UserRepository>;
    fn space_repository(&self) -> Arc<dyn SpaceRepository>;
    fn booking_repository(&self) -> Arc<dyn BookingRepository>;
    fn payment_repository(&self) -> Arc<dyn PaymentRepository>;
    fn payment_gateway(&self) -> Arc<dyn PaymentGateway>;
    fn payment_config(&self) -> PaymentConfig;
}

impl AppRegistryExt for AppRegistryImpl {
    fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    fn auth_repository(&self) -> Arc<dyn AuthRepository> {
        self.auth_repository.clone()
    }

    fn user_repository(&self) -> Arc<dyn UserRepository> {
        self.user_repository.clone()
    }

    fn space_repository(&self) -> Arc<dyn SpaceRepository> {
        self.space_repository.clone()
    }

    fn booking_repository(&self) -> Arc<dyn BookingRepository> {
        self.booking_repository.clone()
    }

    fn payment_repository(&self) -> Arc<dyn PaymentRepository> {
        self.payment_repository.clone()
    }

    fn payment_gateway(&self) -> Arc<dyn PaymentGateway> {
        self.payment_gateway.clone()
    }

    fn payment_config(&self) -> PaymentConfig {
        self.payment_config.clone()
    }
}

pub type AppRegistry = Arc<dyn AppRegistryExt + Send + Sync + 'static>;
