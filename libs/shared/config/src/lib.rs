use std::env;
use std::str::FromStr;
use tracing::warn;

/// Where the doctor roster comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctorDirectoryMode {
    /// Built-in placeholder roster.
    Static,
    /// `doctor_profiles` table.
    Database,
}

impl FromStr for DoctorDirectoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "database" | "db" => Ok(Self::Database),
            other => Err(format!("unknown doctor directory mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub paymob_api_url: String,
    pub paymob_api_key: String,
    pub paymob_integration_id: String,
    pub paymob_hmac_secret: String,
    pub paymob_checkout_base_url: String,
    pub paymob_timeout_secs: u64,
    pub phone_hash_key: String,
    pub session_rate_egp: i64,
    pub session_duration_minutes: u32,
    pub doctor_directory: DoctorDirectoryMode,
    pub stun_servers: Vec<String>,
    pub port: u16,
}

pub const DEFAULT_PAYMOB_API_URL: &str = "https://accept.paymob.com/api";
pub const DEFAULT_PAYMOB_CHECKOUT_BASE_URL: &str = "https://accept.paymob.com/api/acceptance/iframes";
pub const DEFAULT_SESSION_RATE_EGP: i64 = 499;
pub const DEFAULT_SESSION_DURATION_MINUTES: u32 = 45;
pub const CURRENCY: &str = "EGP";

fn string_var(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        if default.is_empty() {
            warn!("{} not set, using empty value", name);
        } else {
            warn!("{} not set, using default", name);
        }
        default.to_string()
    })
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value, using default", name);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let stun_servers = env::var("STUN_SERVERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|_| default_stun_servers());

        let config = Self {
            supabase_url: string_var("SUPABASE_URL", ""),
            supabase_service_role_key: string_var("SUPABASE_SERVICE_ROLE_KEY", ""),
            supabase_jwt_secret: string_var("SUPABASE_JWT_SECRET", ""),
            paymob_api_url: string_var("PAYMOB_API_URL", DEFAULT_PAYMOB_API_URL),
            paymob_api_key: string_var("PAYMOB_API_KEY", ""),
            paymob_integration_id: string_var("PAYMOB_INTEGRATION_ID", ""),
            paymob_hmac_secret: string_var("PAYMOB_HMAC_SECRET", ""),
            paymob_checkout_base_url: string_var(
                "PAYMOB_CHECKOUT_BASE_URL",
                DEFAULT_PAYMOB_CHECKOUT_BASE_URL,
            ),
            paymob_timeout_secs: parsed_var("PAYMOB_TIMEOUT_SECS", 30),
            phone_hash_key: string_var("PHONE_HASH_KEY", ""),
            session_rate_egp: parsed_var("SESSION_RATE_EGP", DEFAULT_SESSION_RATE_EGP),
            session_duration_minutes: parsed_var(
                "SESSION_DURATION_MINUTES",
                DEFAULT_SESSION_DURATION_MINUTES,
            ),
            doctor_directory: parsed_var("DOCTOR_DIRECTORY", DoctorDirectoryMode::Static),
            stun_servers,
            port: parsed_var("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }
        if !config.is_payment_configured() {
            warn!("Paymob not configured - paid bookings will fail");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.is_storage_configured()
            && !self.supabase_jwt_secret.is_empty()
            && !self.phone_hash_key.is_empty()
    }

    pub fn is_storage_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_role_key.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.paymob_api_key.is_empty()
            && !self.paymob_integration_id.is_empty()
            && !self.paymob_hmac_secret.is_empty()
    }

    /// Session price in minor units (piasters).
    pub fn session_amount_cents(&self) -> i64 {
        self.session_rate_egp.saturating_mul(100)
    }

    pub fn session_duration_seconds(&self) -> u32 {
        self.session_duration_minutes.saturating_mul(60)
    }
}

pub fn default_stun_servers() -> Vec<String> {
    vec![
        "stun:stun.l.google.com:19302".to_string(),
        "stun:stun1.l.google.com:19302".to_string(),
    ]
}
