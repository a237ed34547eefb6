use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MailTransport {
    Smtp,
    Resend,
    Log,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub from_email: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub resend_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token and cookie lifetime, in minutes.
    pub jwt_maxage: i64,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub cookie_secure: bool,
    pub allow_privileged_signup: bool,
    pub log_level: LevelFilter,
    pub mail: MailConfig,
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        Config::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests do not have to
    /// touch the process environment.
    pub fn from_source<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET_KEY")?;

        let jwt_maxage = parse("JWT_MAXAGE", optional("JWT_MAXAGE", "1440"))?;
        let port = parse("PORT", optional("PORT", "8000"))?;
        let cookie_secure = parse_bool("COOKIE_SECURE", optional("COOKIE_SECURE", "true"))?;
        let allow_privileged_signup = parse_bool(
            "ALLOW_PRIVILEGED_SIGNUP",
            optional("ALLOW_PRIVILEGED_SIGNUP", "false"),
        )?;
        let log_level = parse("LOG_LEVEL", optional("LOG_LEVEL", "debug"))?;

        let allowed_origins = optional("ALLOWED_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let transport = match optional("MAIL_TRANSPORT", "log").to_lowercase().as_str() {
            "smtp" => MailTransport::Smtp,
            "resend" => MailTransport::Resend,
            "log" => MailTransport::Log,
            other => {
                return Err(ConfigError::Invalid {
                    key: "MAIL_TRANSPORT",
                    value: other.to_string(),
                })
            }
        };

        let resend_api_key = lookup("RESEND_API_KEY").filter(|key| !key.is_empty());
        if transport == MailTransport::Resend && resend_api_key.is_none() {
            return Err(ConfigError::Missing("RESEND_API_KEY"));
        }

        let mail = MailConfig {
            transport,
            from_email: optional("FROM_EMAIL", "Helpdesk <noreply@helpdesk.local>"),
            smtp_host: optional("SMTP_HOST", "localhost"),
            smtp_port: parse("SMTP_PORT", optional("SMTP_PORT", "587"))?,
            smtp_username: optional("SMTP_USERNAME", ""),
            smtp_password: optional("SMTP_PASSWORD", ""),
            resend_api_key,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_maxage,
            port,
            allowed_origins,
            cookie_secure,
            allow_privileged_signup,
            log_level,
            mail,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == "memory"
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_source(source(&[
            ("DATABASE_URL", "memory"),
            ("JWT_SECRET_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.jwt_maxage, 1440);
        assert_eq!(config.port, 8000);
        assert!(config.cookie_secure);
        assert!(!config.allow_privileged_signup);
        assert_eq!(config.allowed_origins, vec!["http://localhost:5173".to_string()]);
        assert_eq!(config.mail.transport, MailTransport::Log);
        assert_eq!(config.log_level, LevelFilter::DEBUG);
        assert!(config.uses_memory_store());
    }

    #[test]
    fn secret_is_required() {
        let err = Config::from_source(source(&[("DATABASE_URL", "memory")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET_KEY"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = Config::from_source(source(&[
            ("DATABASE_URL", "memory"),
            ("JWT_SECRET_KEY", "secret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn resend_needs_api_key() {
        let err = Config::from_source(source(&[
            ("DATABASE_URL", "memory"),
            ("JWT_SECRET_KEY", "secret"),
            ("MAIL_TRANSPORT", "resend"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("RESEND_API_KEY"));
    }

    #[test]
    fn origins_are_split() {
        let config = Config::from_source(source(&[
            ("DATABASE_URL", "postgres://localhost/helpdesk"),
            ("JWT_SECRET_KEY", "secret"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
        ]))
        .unwrap();
        assert_eq!(config.allowed_origins.len(), 2);
        assert!(!config.uses_memory_store());
    }
}
