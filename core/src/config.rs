//! Transport configuration: base URL selection and the endpoint table.
//!
//! # Design
//! `TransportConfig` is resolved once from explicit inputs (platform,
//! environment, optional override) and is never mutated afterwards. Share it
//! behind an `Arc` rather than reaching for a global.

use std::collections::BTreeMap;

/// Environment variable holding the production base URL override.
pub const BASE_URL_ENV: &str = "ROOMY_API_URL";

/// Production base URL used when no override is supplied.
pub const DEFAULT_PRODUCTION_URL: &str = "https://api.roomy.app";

/// Port the development backend listens on.
pub const DEV_PORT: u16 = 5000;

/// Host that the Android emulator uses to reach the development machine.
const ANDROID_EMULATOR_HOST: &str = "10.0.2.2";

/// Platform the client runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Web,
    Ios,
    Android,
    Other,
}

/// Build environment the client runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Fixed mapping from logical resource name to URL path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    paths: BTreeMap<&'static str, &'static str>,
}

impl EndpointTable {
    pub const HEALTH: &'static str = "health";
    pub const USERS: &'static str = "users";
    pub const ROOMS: &'static str = "rooms";

    /// Path registered for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&'static str> {
        self.paths.get(name).copied()
    }

    pub fn health(&self) -> &'static str {
        self.paths[Self::HEALTH]
    }

    pub fn users(&self) -> &'static str {
        self.paths[Self::USERS]
    }

    pub fn rooms(&self) -> &'static str {
        self.paths[Self::ROOMS]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.paths.iter().map(|(k, v)| (*k, *v))
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        let paths = BTreeMap::from([
            (Self::HEALTH, "/"),
            (Self::USERS, "/api/users"),
            (Self::ROOMS, "/api/rooms"),
        ]);
        Self { paths }
    }
}

/// Base URL plus endpoint table for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    base_url: String,
    endpoints: EndpointTable,
}

impl TransportConfig {
    /// Pick the base URL for `platform` and `environment`.
    ///
    /// `override_url` only applies in production; development always targets
    /// the local backend on [`DEV_PORT`].
    pub fn resolve(platform: Platform, environment: Environment, override_url: Option<String>) -> Self {
        let base_url = match environment {
            Environment::Development => match platform {
                Platform::Android => format!("http://{ANDROID_EMULATOR_HOST}:{DEV_PORT}"),
                Platform::Web | Platform::Ios | Platform::Other => format!("http://localhost:{DEV_PORT}"),
            },
            Environment::Production => override_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PRODUCTION_URL.to_string()),
        };
        Self::with_base_url(&base_url)
    }

    /// Like [`TransportConfig::resolve`], reading the override from
    /// [`BASE_URL_ENV`].
    pub fn from_env(platform: Platform, environment: Environment) -> Self {
        Self::resolve(platform, environment, std::env::var(BASE_URL_ENV).ok())
    }

    /// Config pointing at an explicit base URL with the default endpoints.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            endpoints: EndpointTable::default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    /// Join a relative endpoint path onto the base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }
}
