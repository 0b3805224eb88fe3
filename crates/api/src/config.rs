//! Process configuration, read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::TimeDelta;
use thiserror::Error;

use tingo_infra::SupabaseConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEV_JWT_SECRET: &str = "dev-secret";
/// Upper bound for `JWT_EXPIRATION_HOURS` (ten years).
pub const MAX_TOKEN_VALIDITY_HOURS: u64 = 8760 * 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required when {because}")]
    Missing {
        key: &'static str,
        because: &'static str,
    },

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Allowed CORS origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    fn parse(raw: &str) -> Self {
        let list: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if list.is_empty() || list.iter().any(|o| o == "*") {
            CorsOrigins::Any
        } else {
            CorsOrigins::List(list)
        }
    }
}

/// Account created at startup by the in-memory backend.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum BackendSettings {
    InMemory { seed_admin: Option<SeedAdmin> },
    Supabase(SupabaseConfig),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_validity: TimeDelta,
    pub lookup_timeout: Duration,
    pub cors_origins: CorsOrigins,
    pub backend: BackendSettings,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_validity", &self.token_validity)
            .field("lookup_timeout", &self.lookup_timeout)
            .field("cors_origins", &self.cors_origins)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Read from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a local `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let token_validity = parse_token_validity(&get)?;
        let lookup_timeout = Duration::from_millis(parse_positive(
            &get,
            "AUTH_LOOKUP_TIMEOUT_MS",
            tingo_auth::DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64,
        )?);
        let backend_timeout = Duration::from_millis(parse_positive(
            &get,
            "BACKEND_TIMEOUT_MS",
            tingo_infra::supabase::DEFAULT_TIMEOUT.as_millis() as u64,
        )?);

        let cors_origins = CorsOrigins::parse(&get("CORS_ORIGINS").unwrap_or_default());

        let backend = match get("SUPABASE_URL") {
            Some(url) => {
                let because = "SUPABASE_URL is set";
                let anon_key = get("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing {
                    key: "SUPABASE_ANON_KEY",
                    because,
                })?;
                let service_key = get("SUPABASE_SERVICE_KEY").ok_or(ConfigError::Missing {
                    key: "SUPABASE_SERVICE_KEY",
                    because,
                })?;
                let mut supabase = SupabaseConfig::new(url, anon_key, service_key);
                if let Some(bucket) = get("STORAGE_BUCKET") {
                    supabase.bucket = bucket;
                }
                supabase.timeout = backend_timeout;
                BackendSettings::Supabase(supabase)
            }
            None => {
                let seed_admin = match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
                    (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
                    (Some(_), None) => {
                        return Err(ConfigError::Missing {
                            key: "SEED_ADMIN_PASSWORD",
                            because: "SEED_ADMIN_EMAIL is set",
                        });
                    }
                    _ => None,
                };
                BackendSettings::InMemory { seed_admin }
            }
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            token_validity,
            lookup_timeout,
            cors_origins,
            backend,
        })
    }
}

fn parse_token_validity<G>(get: &G) -> Result<TimeDelta, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    const KEY: &str = "JWT_EXPIRATION_HOURS";
    let hours = parse_positive(get, KEY, tingo_auth::DEFAULT_VALIDITY_HOURS as u64)?;
    let out_of_range = || ConfigError::Invalid {
        key: KEY,
        value: hours.to_string(),
        reason: format!("must be at most {MAX_TOKEN_VALIDITY_HOURS}"),
    };
    if hours > MAX_TOKEN_VALIDITY_HOURS {
        return Err(out_of_range());
    }
    i64::try_from(hours)
        .ok()
        .and_then(TimeDelta::try_hours)
        .ok_or_else(out_of_range)
}

fn parse_positive<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(v) => Ok(v),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_use_in_memory_backend() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8000");
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.token_validity, TimeDelta::hours(24));
        assert_eq!(cfg.lookup_timeout, Duration::from_secs(5));
        assert_eq!(cfg.cors_origins, CorsOrigins::Any);
        assert!(matches!(cfg.backend, BackendSettings::InMemory { seed_admin: None }));
    }

    #[test]
    fn supabase_requires_both_keys() {
        let err = config(&[("SUPABASE_URL", "https://x.supabase.co")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "SUPABASE_ANON_KEY", .. }));

        let cfg = config(&[
            ("SUPABASE_URL", "https://x.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SUPABASE_SERVICE_KEY", "service"),
            ("STORAGE_BUCKET", "imagenes"),
            ("BACKEND_TIMEOUT_MS", "2500"),
        ])
        .unwrap();
        match cfg.backend {
            BackendSettings::Supabase(s) => {
                assert_eq!(s.url, "https://x.supabase.co");
                assert_eq!(s.bucket, "imagenes");
                assert_eq!(s.timeout, Duration::from_millis(2500));
            }
            other => panic!("expected supabase backend, got {other:?}"),
        }
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config(&[("JWT_EXPIRATION_HOURS", "a day")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "JWT_EXPIRATION_HOURS", .. }));

        let err = config(&[("AUTH_LOOKUP_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "AUTH_LOOKUP_TIMEOUT_MS", .. }));

        let err = config(&[("BIND_ADDR", "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BIND_ADDR", .. }));
    }

    #[test]
    fn token_validity_is_bounded() {
        let cfg = config(&[("JWT_EXPIRATION_HOURS", "87600")]).unwrap();
        assert_eq!(cfg.token_validity, TimeDelta::hours(87_600));

        for raw in ["87601", "9999999999999999", "18446744073709551615"] {
            let err = config(&[("JWT_EXPIRATION_HOURS", raw)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: "JWT_EXPIRATION_HOURS", .. }),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn cors_origin_lists() {
        let cfg = config(&[("CORS_ORIGINS", "http://a.test, http://b.test")]).unwrap();
        assert_eq!(
            cfg.cors_origins,
            CorsOrigins::List(vec!["http://a.test".into(), "http://b.test".into()])
        );
        let cfg = config(&[("CORS_ORIGINS", "http://a.test,*")]).unwrap();
        assert_eq!(cfg.cors_origins, CorsOrigins::Any);
    }

    #[test]
    fn seed_admin_needs_a_password() {
        let err = config(&[("SEED_ADMIN_EMAIL", "root@tingo.test")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "SEED_ADMIN_PASSWORD", .. }));

        let cfg = config(&[
            ("SEED_ADMIN_EMAIL", "root@tingo.test"),
            ("SEED_ADMIN_PASSWORD", "secret1"),
        ])
        .unwrap();
        assert!(matches!(cfg.backend, BackendSettings::InMemory { seed_admin: Some(_) }));
        assert!(!format!("{cfg:?}").contains("secret1"));
    }

    #[test]
    fn debug_hides_jwt_secret() {
        let cfg = config(&[("JWT_SECRET", "super-secret-value")]).unwrap();
        assert!(!format!("{cfg:?}").contains("super-secret-value"));
    }
}
