//! Configuration management

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub jwt: JwtSettings,
    pub impersonation: ImpersonationSettings,
    pub password_reset: PasswordResetSettings,
    pub email: EmailSettings,
    pub rate_limit: RateLimitSettings,
    pub log: LogSettings,
    pub tenant: TenantSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub debug: bool,
    pub site_domain: String,
    pub cors_origin: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub run_migrations: bool,
}

/// Redis is optional; without a URL impersonation tokens live in process memory.
#[derive(Debug, Deserialize, Clone)]
pub struct RedisSettings {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImpersonationSettings {
    pub token_ttl_hours: i64,
    pub extend_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PasswordResetSettings {
    pub token_ttl_hours: i64,
    /// Page that accepts `?token=`; the emailed link points here.
    pub reset_url: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailTransportKind {
    Mailgun,
    Smtp,
    Log,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailSettings {
    pub transport: EmailTransportKind,
    pub mailgun_api_key: String,
    pub mailgun_domain: String,
    pub mailgun_api_base: String,
    pub multi_domain_enabled: bool,
    pub development_domain: String,
    pub base_domain: String,
    pub default_domain: String,
    pub default_from_email: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
}

impl EmailSettings {
    /// Names of required settings that are empty for the selected transport.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.default_from_email.trim().is_empty() {
            missing.push("email.default_from_email");
        }
        match self.transport {
            EmailTransportKind::Mailgun => {
                if self.mailgun_api_key.trim().is_empty() {
                    missing.push("email.mailgun_api_key");
                }
                if self.mailgun_domain.trim().is_empty() {
                    missing.push("email.mailgun_domain");
                }
            }
            EmailTransportKind::Smtp => {
                if self.smtp_host.trim().is_empty() {
                    missing.push("email.smtp_host");
                }
                if self.smtp_username.trim().is_empty() {
                    missing.push("email.smtp_username");
                }
                if self.smtp_password.trim().is_empty() {
                    missing.push("email.smtp_password");
                }
            }
            EmailTransportKind::Log => {}
        }
        missing
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitSettings {
    pub login_per_minute: u32,
    /// Only behind a proxy that overwrites X-Forwarded-For; otherwise clients pick their own bucket.
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TenantSettings {
    pub trial_days: i64,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "traveldesk-server")?
            .set_default("app.debug", true)?
            .set_default("app.site_domain", "localhost:8080")?
            .set_default("app.cors_origin", "http://localhost:5173")?
            .set_default("app.request_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.run_migrations", true)?
            .set_default("redis.max_connections", 16)?
            .set_default("jwt.access_token_expiry", crate::constants::DEFAULT_ACCESS_TOKEN_EXPIRY)?
            .set_default("impersonation.token_ttl_hours", crate::constants::IMPERSONATION_TTL_HOURS)?
            .set_default("impersonation.extend_hours", crate::constants::IMPERSONATION_EXTEND_HOURS)?
            .set_default("password_reset.token_ttl_hours", crate::constants::PASSWORD_RESET_TTL_HOURS)?
            .set_default("password_reset.reset_url", "http://localhost:5173/reset-password")?
            .set_default("email.transport", "log")?
            .set_default("email.mailgun_api_key", "")?
            .set_default("email.mailgun_domain", "")?
            .set_default("email.mailgun_api_base", "https://api.mailgun.net")?
            .set_default("email.multi_domain_enabled", false)?
            .set_default("email.development_domain", "mail.traveldesk.app")?
            .set_default("email.base_domain", "traveldesk.app")?
            .set_default("email.default_domain", "mail.traveldesk.app")?
            .set_default("email.default_from_email", "noreply@traveldesk.app")?
            .set_default("email.smtp_host", "")?
            .set_default("email.smtp_port", 587)?
            .set_default("email.smtp_username", "")?
            .set_default("email.smtp_password", "")?
            .set_default("rate_limit.login_per_minute", 10)?
            .set_default("rate_limit.trust_forwarded_for", false)?
            .set_default("log.level", "info")?
            .set_default("log.json", true)?
            .set_default("tenant.trial_days", crate::constants::DEFAULT_TRIAL_DAYS)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;
        config.try_deserialize()
    }
}
