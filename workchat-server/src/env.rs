use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use lettre::message::Mailbox;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "WORKCHAT_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "WORKCHAT_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "WORKCHAT_DB_HOSTNAME";
const DB_PORT_VAR: &str = "WORKCHAT_DB_PORT";
const DB_NAME_VAR: &str = "WORKCHAT_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "WORKCHAT_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "WORKCHAT_DB_IDLE_TIMEOUT_SECS";

const HASHING_KEY_VAR: &str = "WORKCHAT_HASHING_KEY_B64";
const TOKEN_SIGNING_KEY_VAR: &str = "WORKCHAT_TOKEN_SIGNING_KEY_B64";
const TOKEN_VERIFYING_KEY_PATH_VAR: &str = "WORKCHAT_TOKEN_VERIFYING_KEY_PATH";
const VERIFYING_KEY_CACHE_SECS_VAR: &str = "WORKCHAT_VERIFYING_KEY_CACHE_SECS";

const HASH_LENGTH_VAR: &str = "WORKCHAT_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "WORKCHAT_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "WORKCHAT_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "WORKCHAT_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "WORKCHAT_HASH_SALT_LENGTH";

const EMAIL_ENABLED_VAR: &str = "WORKCHAT_EMAIL_ENABLED";
const EMAIL_FROM_ADDR: &str = "WORKCHAT_EMAIL_FROM_ADDR";
const EMAIL_REPLY_TO_ADDR: &str = "WORKCHAT_EMAIL_REPLY_TO_ADDR";
const SMTP_ADDRESS_VAR: &str = "WORKCHAT_SMTP_ADDRESS";
const SMTP_USERNAME_VAR: &str = "WORKCHAT_SMTP_USERNAME";
const SMTP_PASSWORD_VAR: &str = "WORKCHAT_SMTP_PASSWORD";
const MAX_SMTP_CONNECTIONS_VAR: &str = "WORKCHAT_MAX_SMTP_CONNECTIONS";
const SMTP_IDLE_TIMEOUT_SECS_VAR: &str = "WORKCHAT_SMTP_IDLE_TIMEOUT_SECS";

const APP_URL_VAR: &str = "WORKCHAT_APP_URL";

const ACCESS_TOKEN_LIFETIME_MINS_VAR: &str = "WORKCHAT_ACCESS_TOKEN_LIFETIME_MINS";
const PASSWORD_RESET_LIFETIME_MINS_VAR: &str = "WORKCHAT_PASSWORD_RESET_LIFETIME_MINS";

const ACTIX_WORKER_COUNT_VAR: &str = "WORKCHAT_ACTIX_WORKER_COUNT";
const HEALTH_ENDPOINT_KEY_VAR: &str = "WORKCHAT_HEALTH_ENDPOINT_KEY";

const LOG_LEVEL_VAR: &str = "WORKCHAT_LOG_LEVEL";

const HASHING_KEY_SIZE: usize = 32;
const TOKEN_SIGNING_KEY_SIZE: usize = ed25519_dalek::SECRET_KEY_LENGTH;

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    pub hashing_key: [u8; HASHING_KEY_SIZE],
    pub token_signing_key: [u8; TOKEN_SIGNING_KEY_SIZE],
    #[zeroize(skip)]
    pub token_verifying_key_path: String,
    #[zeroize(skip)]
    pub verifying_key_cache_ttl: Duration,

    pub hash_length: u32,
    pub hash_iterations: u32,
    pub hash_mem_cost_kib: u32,
    pub hash_threads: u32,
    pub hash_salt_length: u32,

    pub email_enabled: bool,
    #[zeroize(skip)]
    pub email_from_address: Mailbox,
    #[zeroize(skip)]
    pub email_reply_to_address: Mailbox,
    pub smtp_address: String,
    pub smtp_username: String,
    pub smtp_password: String,
    #[zeroize(skip)]
    pub max_smtp_connections: u32,
    #[zeroize(skip)]
    pub smtp_idle_timeout: Duration,

    #[zeroize(skip)]
    pub app_url: String,

    #[zeroize(skip)]
    pub access_token_lifetime: Duration,
    #[zeroize(skip)]
    pub password_reset_lifetime: Duration,

    #[zeroize(skip)]
    pub actix_worker_count: usize,
    pub health_endpoint_key: String,

    #[zeroize(skip)]
    pub log_level: String,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let hashing_key = decode_key::<HASHING_KEY_SIZE>(HASHING_KEY_VAR)?;
        let token_signing_key = decode_key::<TOKEN_SIGNING_KEY_SIZE>(TOKEN_SIGNING_KEY_VAR)?;

        let email_from_address: Mailbox = env_var::<String>(EMAIL_FROM_ADDR)?
            .parse()
            .map_err(|_| ConfigError::InvalidVar(EMAIL_FROM_ADDR))?;
        let email_reply_to_address: Mailbox = env_var::<String>(EMAIL_REPLY_TO_ADDR)?
            .parse()
            .map_err(|_| ConfigError::InvalidVar(EMAIL_REPLY_TO_ADDR))?;

        let email_enabled = if cfg!(test) {
            false
        } else {
            env_var(EMAIL_ENABLED_VAR)?
        };

        let inner = ConfigInner {
            db_username: env_var(DB_USERNAME_VAR)?,
            db_password: env_var(DB_PASSWORD_VAR)?,
            db_hostname: env_var(DB_HOSTNAME_VAR)?,
            db_port: env_var(DB_PORT_VAR)?,
            db_name: env_var(DB_NAME_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            hashing_key,
            token_signing_key,
            token_verifying_key_path: env_var_or(
                TOKEN_VERIFYING_KEY_PATH_VAR,
                String::from("keys/token_verifying_key.b64"),
            ),
            verifying_key_cache_ttl: Duration::from_secs(env_var_or(
                VERIFYING_KEY_CACHE_SECS_VAR,
                300,
            )),

            hash_length: env_var(HASH_LENGTH_VAR)?,
            hash_iterations: env_var(HASH_ITERATIONS_VAR)?,
            hash_mem_cost_kib: env_var(HASH_MEM_COST_KIB_VAR)?,
            hash_threads: env_var(HASH_THREADS_VAR)?,
            hash_salt_length: env_var(HASH_SALT_LENGTH_VAR)?,

            email_enabled,
            email_from_address,
            email_reply_to_address,
            smtp_address: env_var_or(SMTP_ADDRESS_VAR, String::new()),
            smtp_username: env_var_or(SMTP_USERNAME_VAR, String::new()),
            smtp_password: env_var_or(SMTP_PASSWORD_VAR, String::new()),
            max_smtp_connections: env_var_or(MAX_SMTP_CONNECTIONS_VAR, 24),
            smtp_idle_timeout: Duration::from_secs(env_var_or(SMTP_IDLE_TIMEOUT_SECS_VAR, 60)),

            app_url: env_var(APP_URL_VAR)?,

            access_token_lifetime: Duration::from_secs(
                env_var_or(ACCESS_TOKEN_LIFETIME_MINS_VAR, 60) * 60,
            ),
            password_reset_lifetime: Duration::from_secs(
                env_var_or(PASSWORD_RESET_LIFETIME_MINS_VAR, 60) * 60,
            ),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            health_endpoint_key: env_var(HEALTH_ENDPOINT_KEY_VAR)?,

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        if inner.email_enabled && inner.smtp_address.is_empty() {
            return Err(ConfigError::MissingVar(SMTP_ADDRESS_VAR));
        }

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    pub fn database_uri(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_username, self.db_password, self.db_hostname, self.db_port, self.db_name,
        )
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn decode_key<const N: usize>(key: &'static str) -> Result<[u8; N], ConfigError> {
    let decoded = Zeroizing::new(
        b64.decode(env_var::<String>(key)?.as_bytes())
            .map_err(|_| ConfigError::InvalidVar(key))?,
    );

    if decoded.len() < N {
        return Err(ConfigError::InvalidVar(key));
    }

    decoded[..N]
        .try_into()
        .map_err(|_| ConfigError::InvalidVar(key))
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}
