use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

pub struct AppConfig {
    pub jwt_secret: SecretString,
    /// Payment-provider API secret, used for checkout/portal session calls.
    pub stripe_secret_key: SecretString,
    /// Shared secret the provider signs webhook deliveries with.
    pub stripe_webhook_secret: SecretString,
    /// The single Pro-plan price users are sent to checkout with.
    pub stripe_price_id: String,
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    /// Restricted credential tier: user-scoped reads and writes.
    pub database_url: String,
    /// Elevated credential tier for the identity resolver and entitlement
    /// store, which must act across users. Defaults to DATABASE_URL.
    pub service_database_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let stripe_secret_key: SecretString =
            SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret: SecretString =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());
        let stripe_price_id: String = get_env("STRIPE_PRICE_ID");

        let app_origin: Url = get_env("APP_ORIGIN");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let service_database_url: String =
            get_env_default("SERVICE_DATABASE_URL", database_url.clone());

        Self {
            jwt_secret,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_price_id,
            app_origin,
            cors_origin,
            bind_addr,
            database_url,
            service_database_url,
        }
    }
}
