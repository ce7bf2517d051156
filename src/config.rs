use std::env;

use crate::notify::MailConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub mail_from: String,
    pub mail_subject_prefix: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let mail_from =
            env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@webshop.local".to_string());
        let mail_subject_prefix =
            env::var("MAIL_SUBJECT_PREFIX").unwrap_or_else(|_| "[Webshop] ".to_string());
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            mail_from,
            mail_subject_prefix,
        })
    }

    pub fn mail(&self) -> MailConfig {
        MailConfig {
            from_address: self.mail_from.clone(),
            subject_prefix: self.mail_subject_prefix.clone(),
        }
    }
}
