use anyhow::{Context, Result};
use std::str::FromStr;

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
    pub booking: BookingConfig,
    pub admin: Option<AdminSeedConfig>,
    pub http_port: u16,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: required("DATABASE_HOST")?,
            port: required_parsed("DATABASE_PORT")?,
            username: required("DATABASE_USERNAME")?,
            password: required("DATABASE_PASSWORD")?,
            database: required("DATABASE_NAME")?,
        };
        let redis = RedisConfig {
            host: required("REDIS_HOST")?,
            port: required_parsed("REDIS_PORT")?,
        };
        let auth = AuthConfig {
            ttl: required_parsed("AUTH_TOKEN_TTL")?,
        };
        let payment = PaymentConfig {
            base_url: optional("PAYMENT_GATEWAY_BASE_URL")
                .unwrap_or_else(|| "https://api.paystack.co".into()),
            secret_key: optional("PAYMENT_GATEWAY_SECRET_KEY").unwrap_or_default(),
            currency: optional("PAYMENT_CURRENCY").unwrap_or_else(|| "NGN".into()),
            callback_url: optional("PAYMENT_CALLBACK_URL"),
            title: optional("PAYMENT_TITLE").unwrap_or_else(|| "ReserveMe".into()),
            timeout_secs: optional_parsed("PAYMENT_TIMEOUT_SECS")?.unwrap_or(10),
            verify_on_confirm: optional("PAYMENT_VERIFY_ON_CONFIRM")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        };
        let booking = BookingConfig {
            pending_ttl_hours: optional_parsed("BOOKING_PENDING_TTL_HOURS")?.unwrap_or(24),
            sweep_interval_secs: optional_parsed("BOOKING_SWEEP_INTERVAL_SECS")?.unwrap_or(3600),
        };
        let admin = match (
            optional("ADMIN_NAME"),
            optional("ADMIN_EMAIL"),
            optional("ADMIN_PASSWORD"),
        ) {
            (Some(user_name), Some(email), Some(password)) => Some(AdminSeedConfig {
                user_name,
                email,
                password,
            }),
            _ => None,
        };
        Ok(Self {
            database,
            redis,
            auth,
            payment,
            booking,
            admin,
            http_port: optional_parsed("HTTP_PORT")?.unwrap_or(8080),
        })
    }
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

pub struct AuthConfig {
    // アクセストークンの有効期限（秒）
    pub ttl: u64,
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub base_url: String,
    pub secret_key: String,
    pub currency: String,
    pub callback_url: Option<String>,
    pub title: String,
    pub timeout_secs: u64,
    pub verify_on_confirm: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct BookingConfig {
    pub pending_ttl_hours: i64,
    pub sweep_interval_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            pending_ttl_hours: 24,
            sweep_interval_secs: 3600,
        }
    }
}

pub struct AdminSeedConfig {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("environment variable {key} is not set"))
}

fn required_parsed<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(key)?
        .parse()
        .with_context(|| format!("environment variable {key} is malformed"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn optional_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    optional(key)
        .map(|v| {
            v.parse()
                .with_context(|| format!("environment variable {key} is malformed"))
        })
        .transpose()
}

fn parse_flag(value: &str) -> bool {
    !matches!(value.to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off")
}
