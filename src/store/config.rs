//! Store endpoint configuration.

/// Default user agent: the backend only accepts configurator-style clients.
pub const DEFAULT_USER_AGENT: &str =
    "Configurator/2.17 (Macintosh; OS X 15.2; 24C5089c) AppleWebKit/0620.1.16.11.6";

pub const DEFAULT_AUTH_HOST: &str = "auth.itunes.apple.com";
pub const DEFAULT_STORE_HOST: &str = "buy.itunes.apple.com";

/// Redirects followed per request before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// User agent sent on every request.
    pub user_agent: String,
    /// Host of the sign-in endpoint.
    pub auth_host: String,
    /// Store host; prefixed with `p{pod}-` once an account has a pod.
    pub store_host: String,
    pub max_redirects: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth_host: DEFAULT_AUTH_HOST.to_string(),
            store_host: DEFAULT_STORE_HOST.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn auth_host(mut self, host: impl Into<String>) -> Self {
        self.auth_host = host.into();
        self
    }

    pub fn store_host(mut self, host: impl Into<String>) -> Self {
        self.store_host = host.into();
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Host serving download and purchase requests for an account's pod.
    pub fn store_host_for(&self, pod: Option<&str>) -> String {
        match pod.map(str::trim).filter(|p| !p.is_empty()) {
            Some(pod) => format!("p{}-{}", pod, self.store_host),
            None => self.store_host.clone(),
        }
    }
}
