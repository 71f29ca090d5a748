use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// One hour up to ten years.
const SESSION_TTL_RANGE: RangeInclusive<i64> = 1..=24 * 365 * 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDB,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::MongoDB),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("Invalid STORE_BACKEND: {}. Supported: mongodb, memory", other)),
        }
    }
}

/// Runtime configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub access_password: String,
    pub bcrypt_cost: u32,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub session_ttl_hours: i64,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), 3002u16)?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let store_backend = match lookup("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None if database_url.is_some() => StoreBackend::MongoDB,
            None => StoreBackend::Memory,
        };
        if store_backend == StoreBackend::MongoDB && database_url.is_none() {
            return Err("DATABASE_URL must be set when STORE_BACKEND=mongodb".to_string());
        }

        let access_password = lookup("ACCESS_PASSWORD")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| "ACCESS_PASSWORD must be set".to_string())?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("⚠️  JWT_SECRET not set, using the development default");
            "default-secret-change-me".to_string()
        });

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Ok(Self {
            host,
            port,
            store_backend,
            database_url,
            access_password,
            bcrypt_cost: parse_or("BCRYPT_COST", lookup("BCRYPT_COST"), bcrypt::DEFAULT_COST)?,
            jwt_secret,
            jwt_issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "customer-hub".to_string()),
            jwt_audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "customer-hub-api".to_string()),
            // The unlock survives return visits for a month by default
            session_ttl_hours: parse_in_range(
                "SESSION_TTL_HOURS",
                lookup("SESSION_TTL_HOURS"),
                24 * 30,
                SESSION_TTL_RANGE,
            )?,
            cors_allowed_origins,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, String> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("Invalid value for {}: {}", key, raw)),
        None => Ok(default),
    }
}

fn parse_in_range(
    key: &str,
    value: Option<String>,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, String> {
    let parsed = parse_or(key, value, default)?;
    if range.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!(
            "{} must be between {} and {}, got {}",
            key,
            range.start(),
            range.end(),
            parsed
        ))
    }
}
