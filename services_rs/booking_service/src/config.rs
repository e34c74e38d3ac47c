use regex::Regex;
use std::env;
use trekora_common::secret_policy;

#[derive(Clone, Debug)]
pub struct Config {
    pub env_name: String,

    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,

    pub db_url: String,
    pub db_schema: Option<String>,
    pub duplicate_guard: bool,

    pub upload_dir: String,
    pub default_currency: String,

    pub gateway_base_url: String,
    pub gateway_key_id: Option<String>,
    pub gateway_key_secret: Option<String>,
    pub gateway_timeout_secs: u64,

    pub catalog_base_url: Option<String>,

    pub require_admin_secret: bool,
    pub admin_secret: Option<String>,

    pub allowed_hosts: Vec<String>,
    pub allowed_origins: Vec<String>,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(v) => {
            let v = v.trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        }
        Err(_) => None,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_bool_like(raw: &str) -> Option<bool> {
    let v = raw.trim().to_lowercase();
    if v.is_empty() {
        return None;
    }
    if matches!(v.as_str(), "0" | "false" | "no" | "off") {
        Some(false)
    } else {
        Some(true)
    }
}

fn normalize_db_url(raw: &str) -> String {
    // Accept SQLAlchemy-style URLs like "postgresql+psycopg://..." by
    // dropping the "+driver" portion.
    if let Some(colon) = raw.find(':') {
        let (scheme, rest) = raw.split_at(colon);
        if let Some(plus) = scheme.find('+') {
            return format!("{}{}", &scheme[..plus], rest);
        }
    }
    raw.to_string()
}

fn validate_postgres_url(url: &str) -> Result<(), String> {
    let scheme = url
        .split_once(':')
        .map(|(s, _)| s.trim().to_lowercase())
        .unwrap_or_default();
    match scheme.as_str() {
        "postgres" | "postgresql" => Ok(()),
        _ => Err("BOOKINGS_DB_URL (or DB_URL) must be a postgres URL".to_string()),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let env_name = env_or("ENV", "dev");
        let env_lower = env_name.trim().to_lowercase();
        let prod_like = matches!(env_lower.as_str(), "prod" | "production" | "staging");

        let host = env_or("APP_HOST", "0.0.0.0");
        let port: u16 = env_or("APP_PORT", "8084")
            .parse()
            .map_err(|_| "APP_PORT must be a valid u16".to_string())?;

        let db_raw = env_opt("BOOKINGS_DB_URL")
            .or_else(|| env_opt("DB_URL"))
            .unwrap_or_else(|| "postgresql://trekora:trekora@db:5432/trekora_bookings".to_string());
        let db_url = normalize_db_url(&db_raw);
        validate_postgres_url(&db_url)?;

        let db_schema = env_opt("DB_SCHEMA");
        if let Some(s) = &db_schema {
            let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(|e| e.to_string())?;
            if !re.is_match(s) {
                return Err("DB_SCHEMA must match ^[A-Za-z_][A-Za-z0-9_]*$".to_string());
            }
        }

        let duplicate_guard = {
            let raw = env_or("BOOKING_DUPLICATE_GUARD", "");
            parse_bool_like(&raw).unwrap_or(true)
        };

        let upload_dir = env_or("UPLOAD_DIR", "uploads").trim().to_string();
        if upload_dir.is_empty() {
            return Err("UPLOAD_DIR must not be empty".to_string());
        }

        let mut default_currency = env_or("DEFAULT_CURRENCY", "INR").trim().to_uppercase();
        if default_currency.is_empty() {
            default_currency = "INR".to_string();
        }
        if default_currency.len() > 3 {
            default_currency.truncate(3);
        }

        let gateway_base_url = env_or("RAZORPAY_BASE_URL", "https://api.razorpay.com")
            .trim()
            .trim_end_matches('/')
            .to_string();
        let gateway_key_id = env_opt("RAZORPAY_KEY_ID");
        let gateway_key_secret = env_opt("RAZORPAY_KEY_SECRET");
        if prod_like && (gateway_key_id.is_none() || gateway_key_secret.is_none()) {
            return Err(
                "RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET must be set in prod/staging".to_string(),
            );
        }
        if gateway_key_id.is_some() != gateway_key_secret.is_some() {
            return Err(
                "RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET must be set together".to_string(),
            );
        }
        secret_policy::validate_secret_for_env(
            &env_name,
            "RAZORPAY_KEY_SECRET",
            gateway_key_secret.as_deref(),
            true,
        )?;

        let gateway_timeout_secs: u64 = env_or("GATEWAY_TIMEOUT_SECS", "20")
            .parse()
            .map_err(|_| "GATEWAY_TIMEOUT_SECS must be an integer".to_string())?;
        let gateway_timeout_secs = gateway_timeout_secs.clamp(1, 120);

        let catalog_base_url = env_opt("CATALOG_BASE_URL");

        let require_admin_secret = {
            let raw = env_or("BOOKINGS_REQUIRE_ADMIN_SECRET", "");
            match parse_bool_like(&raw) {
                Some(v) => v,
                None => prod_like,
            }
        };
        if prod_like && !require_admin_secret {
            return Err("BOOKINGS_REQUIRE_ADMIN_SECRET must be true in prod/staging".to_string());
        }
        let admin_secret = env_opt("ADMIN_API_SECRET");
        if require_admin_secret && admin_secret.as_deref().unwrap_or("").trim().is_empty() {
            return Err(
                "ADMIN_API_SECRET must be set when BOOKINGS_REQUIRE_ADMIN_SECRET is enabled"
                    .to_string(),
            );
        }
        secret_policy::validate_secret_for_env(
            &env_name,
            "ADMIN_API_SECRET",
            admin_secret.as_deref(),
            false,
        )?;

        let mut allowed_hosts = parse_csv(&env_or("ALLOWED_HOSTS", ""));
        if allowed_hosts.is_empty() && matches!(env_lower.as_str(), "dev" | "test") {
            allowed_hosts = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        }
        if matches!(env_lower.as_str(), "dev" | "test") {
            for extra in ["localhost", "127.0.0.1"] {
                if !allowed_hosts.iter().any(|h| h == extra) {
                    allowed_hosts.push(extra.to_string());
                }
            }
        }
        // Docker-internal service alias.
        for extra in ["bookings"] {
            if !allowed_hosts.iter().any(|h| h == extra) {
                allowed_hosts.push(extra.to_string());
            }
        }
        if prod_like && allowed_hosts.iter().any(|h| h.trim() == "*") {
            return Err("ALLOWED_HOSTS must not contain '*' in prod/staging".to_string());
        }

        let mut allowed_origins = parse_csv(&env_or("ALLOWED_ORIGINS", ""));
        if allowed_origins.is_empty() && !prod_like {
            allowed_origins = vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ];
        }
        if prod_like && allowed_origins.iter().any(|o| o.trim() == "*") {
            return Err("ALLOWED_ORIGINS must not contain '*' in prod/staging".to_string());
        }
        if prod_like
            && allowed_origins
                .iter()
                .any(|o| !o.trim().starts_with("https://"))
        {
            return Err("ALLOWED_ORIGINS must use https:// origins in prod/staging".to_string());
        }

        // Sized to admit the 5MB document upload plus multipart overhead.
        let max_body_bytes: usize = env_or("BOOKINGS_MAX_BODY_BYTES", "8388608")
            .parse()
            .map_err(|_| "BOOKINGS_MAX_BODY_BYTES must be an integer".to_string())?;
        let max_body_bytes = max_body_bytes.clamp(64 * 1024, 16 * 1024 * 1024);

        Ok(Self {
            env_name,
            host,
            port,
            max_body_bytes,
            db_url,
            db_schema,
            duplicate_guard,
            upload_dir,
            default_currency,
            gateway_base_url,
            gateway_key_id,
            gateway_key_secret,
            gateway_timeout_secs,
            catalog_base_url,
            require_admin_secret,
            admin_secret,
            allowed_hosts,
            allowed_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const ALL_KEYS: &[&str] = &[
        "ENV",
        "APP_HOST",
        "APP_PORT",
        "BOOKINGS_DB_URL",
        "DB_URL",
        "DB_SCHEMA",
        "BOOKING_DUPLICATE_GUARD",
        "UPLOAD_DIR",
        "DEFAULT_CURRENCY",
        "RAZORPAY_BASE_URL",
        "RAZORPAY_KEY_ID",
        "RAZORPAY_KEY_SECRET",
        "GATEWAY_TIMEOUT_SECS",
        "CATALOG_BASE_URL",
        "BOOKINGS_REQUIRE_ADMIN_SECRET",
        "ADMIN_API_SECRET",
        "ALLOWED_HOSTS",
        "ALLOWED_ORIGINS",
        "BOOKINGS_MAX_BODY_BYTES",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            let mut saved = Vec::with_capacity(ALL_KEYS.len());
            for k in ALL_KEYS {
                saved.push(((*k).to_string(), env::var(k).ok()));
                env::remove_var(k);
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (k, v) in self.saved.drain(..) {
                match v {
                    Some(val) => env::set_var(k, val),
                    None => env::remove_var(k),
                }
            }
        }
    }

    fn set_prod_baseline() {
        env::set_var("ENV", "prod");
        env::set_var(
            "BOOKINGS_DB_URL",
            "postgresql://u:p@localhost:5432/bookings",
        );
        env::set_var("RAZORPAY_KEY_ID", "rzp_live_8fKx2nQw7vLm4c");
        env::set_var("RAZORPAY_KEY_SECRET", "w7Lm4cQx2nK8fRv0pT6s");
        env::set_var("ADMIN_API_SECRET", "b3Vt9xKq_2mNc8wZ5rLd");
        env::set_var("ALLOWED_ORIGINS", "https://www.trekora.in");
    }

    #[test]
    fn rejects_non_postgres_url() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        env::set_var("BOOKINGS_DB_URL", "sqlite:////tmp/bookings.db");

        assert!(Config::from_env().is_err());
    }

    #[test]
    fn normalizes_sqlalchemy_driver_suffix() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        env::set_var(
            "BOOKINGS_DB_URL",
            "postgresql+psycopg://u:p@localhost:5432/bookings",
        );

        let cfg = Config::from_env().expect("config");
        assert_eq!(cfg.db_url, "postgresql://u:p@localhost:5432/bookings");
    }

    #[test]
    fn duplicate_guard_defaults_on_and_can_be_disabled() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        let cfg = Config::from_env().expect("config");
        assert!(cfg.duplicate_guard);

        env::set_var("BOOKING_DUPLICATE_GUARD", "off");
        let cfg = Config::from_env().expect("config");
        assert!(!cfg.duplicate_guard);
    }

    #[test]
    fn prod_requires_gateway_credentials() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        set_prod_baseline();
        env::remove_var("RAZORPAY_KEY_SECRET");

        let err = Config::from_env().expect_err("must reject missing gateway secret");
        assert!(err.contains("RAZORPAY_KEY"));
    }

    #[test]
    fn prod_rejects_weak_gateway_secret() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        set_prod_baseline();
        env::set_var("RAZORPAY_KEY_SECRET", "change-me-secret");

        assert!(Config::from_env().is_err());
    }

    #[test]
    fn gateway_credentials_must_come_in_pairs() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        env::set_var("RAZORPAY_KEY_ID", "rzp_test_key");

        let err = Config::from_env().expect_err("must reject lone key id");
        assert!(err.contains("set together"));
    }

    #[test]
    fn prod_requires_admin_secret() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        set_prod_baseline();
        env::remove_var("ADMIN_API_SECRET");

        let err = Config::from_env().expect_err("must reject missing admin secret");
        assert!(err.contains("ADMIN_API_SECRET"));
    }

    #[test]
    fn prod_rejects_admin_secret_toggle_off() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        set_prod_baseline();
        env::set_var("BOOKINGS_REQUIRE_ADMIN_SECRET", "false");

        let err = Config::from_env().expect_err("must reject disabled admin auth in prod");
        assert!(err.contains("BOOKINGS_REQUIRE_ADMIN_SECRET"));
    }

    #[test]
    fn prod_rejects_wildcard_allowed_hosts() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        set_prod_baseline();
        env::set_var("ALLOWED_HOSTS", "*");

        let err = Config::from_env().expect_err("wildcard hosts must be rejected in prod");
        assert!(err.contains("ALLOWED_HOSTS"));
    }

    #[test]
    fn prod_rejects_non_https_allowed_origins() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        set_prod_baseline();
        env::set_var("ALLOWED_ORIGINS", "http://www.trekora.in");

        let err = Config::from_env().expect_err("non-https origins must be rejected in prod");
        assert!(err.contains("ALLOWED_ORIGINS must use https:// origins"));
    }

    #[test]
    fn body_limit_is_clamped_to_safe_bounds() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        env::set_var("BOOKINGS_MAX_BODY_BYTES", "1");
        let cfg = Config::from_env().expect("config");
        assert_eq!(cfg.max_body_bytes, 64 * 1024);

        env::set_var("BOOKINGS_MAX_BODY_BYTES", "999999999");
        let cfg = Config::from_env().expect("config");
        assert_eq!(cfg.max_body_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn dev_defaults_cover_local_hosts_and_origins() {
        let _g = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _env = EnvGuard::new();

        let cfg = Config::from_env().expect("config");
        assert!(cfg.allowed_hosts.iter().any(|h| h == "localhost"));
        assert!(cfg.allowed_hosts.iter().any(|h| h == "bookings"));
        assert!(cfg
            .allowed_origins
            .iter()
            .any(|o| o == "http://localhost:5173"));
        assert_eq!(cfg.default_currency, "INR");
        assert_eq!(cfg.gateway_timeout_secs, 20);
    }
}
