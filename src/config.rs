use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{bail, Context};

pub const DEFAULT_SECRET_KEY: &str = "DefaultSecretKeyThatShouldBeChangedInProduction123!";

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt: JwtConfig,
    pub cors_origins: Vec<String>,
    pub seed_demo_data: bool,
    pub smtp: SmtpConfig,
    pub twilio: TwilioConfig,
    pub unsplash_access_key: Option<String>,
    pub email_job_hour: u32,
    pub sms_job_hour: u32,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from_email: Option<String>,
    pub from_name: String,
}

#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

const REDACTED: &str = "[redacted]";

// Las credenciales nunca salen en los logs
fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| REDACTED)
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("bind_addr", &self.bind_addr)
            .field("jwt", &self.jwt)
            .field("cors_origins", &self.cors_origins)
            .field("seed_demo_data", &self.seed_demo_data)
            .field("smtp", &self.smtp)
            .field("twilio", &self.twilio)
            .field("unsplash_access_key", &redact(&self.unsplash_access_key))
            .field("email_job_hour", &self.email_job_hour)
            .field("sms_job_hour", &self.sms_job_hour)
            .finish()
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &REDACTED)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_days", &self.ttl_days)
            .finish()
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &redact(&self.pass))
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &redact(&self.auth_token))
            .field("from_number", &self.from_number)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración a partir de cualquier fuente clave/valor.
    /// Los valores vacíos cuentan como ausentes.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;

        let secret = match get("SECRET_KEY") {
            Some(secret) => secret,
            None => {
                tracing::warn!("SECRET_KEY not set, using the development default");
                DEFAULT_SECRET_KEY.to_string()
            }
        };

        let email_job_hour = parse_or(get("EMAIL_JOB_HOUR"), "EMAIL_JOB_HOUR", 8)?;
        let sms_job_hour = parse_or(get("SMS_JOB_HOUR"), "SMS_JOB_HOUR", 9)?;
        for (name, hour) in [("EMAIL_JOB_HOUR", email_job_hour), ("SMS_JOB_HOUR", sms_job_hour)] {
            if hour > 23 {
                bail!("{} must be between 0 and 23, got {}", name, hour);
            }
        }

        Ok(Self {
            database_url,
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            jwt: JwtConfig {
                secret,
                issuer: get("JWT_ISSUER").unwrap_or_else(|| "CarMonitor".to_string()),
                audience: get("JWT_AUDIENCE").unwrap_or_else(|| "CarMonitor".to_string()),
                ttl_days: parse_or(get("TOKEN_TTL_DAYS"), "TOKEN_TTL_DAYS", 7)?,
            },
            cors_origins: get("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            seed_demo_data: parse_or(get("SEED_DEMO_DATA"), "SEED_DEMO_DATA", false)?,
            smtp: SmtpConfig {
                host: get("SMTP_HOST"),
                port: parse_or(get("SMTP_PORT"), "SMTP_PORT", 587)?,
                user: get("SMTP_USER"),
                pass: get("SMTP_PASS"),
                from_email: get("SMTP_FROM_EMAIL"),
                from_name: get("SMTP_FROM_NAME").unwrap_or_else(|| "CarMonitor".to_string()),
            },
            twilio: TwilioConfig {
                account_sid: get("TWILIO_ACCOUNT_SID"),
                auth_token: get("TWILIO_AUTH_TOKEN"),
                from_number: get("TWILIO_FROM_NUMBER"),
            },
            unsplash_access_key: get("UNSPLASH_ACCESS_KEY"),
            email_job_hour,
            sms_job_hour,
        })
    }
}

fn parse_or<T>(value: Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {} ({})", name, raw, e)),
        None => Ok(default),
    }
}
