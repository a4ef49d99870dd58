use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Re-add item quantities to product stock when a pending order is
    /// cancelled. Off by default: restock after cancellation is a manual
    /// fulfillment operation unless the deployment opts in.
    pub restock_on_cancel: bool,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub from_name: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let restock_on_cancel = env::var("RESTOCK_ON_CANCEL")
            .ok()
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(Self {
            port,
            database_url,
            host,
            restock_on_cancel,
            smtp: SmtpConfig::from_env(),
        })
    }
}

impl SmtpConfig {
    // All SMTP variables must be present; otherwise outbound mail falls
    // back to the logging transport.
    fn from_env() -> Option<Self> {
        let host = env::var("SMTP_HOST").ok()?;
        let username = env::var("SMTP_USERNAME").ok()?;
        let password = env::var("SMTP_PASSWORD").ok()?;
        let from_address = env::var("SMTP_FROM").ok()?;
        let port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(587);
        let from_name = env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Marketplace".to_string());
        Some(Self {
            host,
            port,
            username,
            password,
            from_address,
            from_name,
        })
    }
}
