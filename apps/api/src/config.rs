use anyhow::{Context, Result};

use crate::models::Collection;
use crate::pipeline::paginate::DEFAULT_PAGE_SIZE;

/// Where one collection lives on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoute {
    /// Collection path relative to `BACKEND_URL`.
    pub path: String,
    /// Whether item URLs end in `/` (`/contacts/{id}/` vs `/applications/{id}`).
    pub item_trailing_slash: bool,
}

impl ResourceRoute {
    pub fn new(path: impl Into<String>, item_trailing_slash: bool) -> Self {
        Self {
            path: path.into(),
            item_trailing_slash,
        }
    }

    fn for_collection(collection: Collection) -> Self {
        Self::new(
            collection.default_route(),
            collection.default_item_trailing_slash(),
        )
    }

    /// Applies `<PREFIX>_ROUTE` and `<PREFIX>_ITEM_TRAILING_SLASH` overrides.
    fn from_env(collection: Collection, prefix: &str) -> Result<Self> {
        let defaults = Self::for_collection(collection);
        Ok(Self {
            path: optional_env(&format!("{prefix}_ROUTE")).unwrap_or(defaults.path),
            item_trailing_slash: parse_env(
                &format!("{prefix}_ITEM_TRAILING_SLASH"),
                defaults.item_trailing_slash,
            )?,
        })
    }
}

/// Per-collection routes on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoutes {
    pub contacts: ResourceRoute,
    pub applications: ResourceRoute,
    pub referral_messages: ResourceRoute,
}

impl Default for ResourceRoutes {
    fn default() -> Self {
        Self {
            contacts: ResourceRoute::for_collection(Collection::Contacts),
            applications: ResourceRoute::for_collection(Collection::Applications),
            referral_messages: ResourceRoute::for_collection(Collection::ReferralMessages),
        }
    }
}

impl ResourceRoutes {
    pub fn get(&self, collection: Collection) -> &ResourceRoute {
        match collection {
            Collection::Contacts => &self.contacts,
            Collection::Applications => &self.applications,
            Collection::ReferralMessages => &self.referral_messages,
        }
    }

    fn from_env() -> Result<Self> {
        Ok(Self {
            contacts: ResourceRoute::from_env(Collection::Contacts, "CONTACTS")?,
            applications: ResourceRoute::from_env(Collection::Applications, "APPLICATIONS")?,
            referral_messages: ResourceRoute::from_env(
                Collection::ReferralMessages,
                "REFERRAL_MESSAGES",
            )?,
        })
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub routes: ResourceRoutes,
    pub port: u16,
    pub rust_log: String,
    /// Directory holding the built client bundle.
    pub static_dir: String,
    /// Retries after the first attempt for idempotent backend requests.
    pub fetch_retries: u32,
    pub request_timeout_secs: u64,
    pub default_page_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let default_page_size = parse_env("DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if default_page_size == 0 {
            anyhow::bail!("DEFAULT_PAGE_SIZE must be at least 1");
        }

        Ok(Config {
            backend_url: require_env("BACKEND_URL")?,
            routes: ResourceRoutes::from_env()?,
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            static_dir: optional_env("STATIC_DIR").unwrap_or_else(|| "dist".to_string()),
            fetch_retries: parse_env("FETCH_RETRIES", 3u32)?,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30u64)?,
            default_page_size,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes() {
        let routes = ResourceRoutes::default();
        assert_eq!(routes.get(Collection::Contacts).path, "/contacts/");
        assert!(routes.get(Collection::Contacts).item_trailing_slash);
        assert_eq!(routes.get(Collection::ReferralMessages).path, "/referral-messages/");
        assert!(!routes.get(Collection::ReferralMessages).item_trailing_slash);
    }

    #[test]
    fn test_route_env_overrides() {
        std::env::set_var("APPLICATIONS_ROUTE", "/jobs/");
        std::env::set_var("APPLICATIONS_ITEM_TRAILING_SLASH", "true");
        let route = ResourceRoute::from_env(Collection::Applications, "APPLICATIONS").unwrap();
        std::env::remove_var("APPLICATIONS_ROUTE");
        std::env::remove_var("APPLICATIONS_ITEM_TRAILING_SLASH");
        assert_eq!(route, ResourceRoute::new("/jobs/", true));
    }

    #[test]
    fn test_parse_env_default_and_error() {
        // Keys unlikely to exist in any environment
        assert_eq!(parse_env("JOBTRACK_TEST_UNSET_KEY", 7u32).unwrap(), 7);
        std::env::set_var("JOBTRACK_TEST_BAD_NUMBER", "seven");
        assert!(parse_env("JOBTRACK_TEST_BAD_NUMBER", 7u32).is_err());
        std::env::remove_var("JOBTRACK_TEST_BAD_NUMBER");
    }
}
