//! Mapping corpus identifiers to externally reachable image addresses.

use snapseek_core::config::UrlSettings;

/// Turns a corpus identifier into a URL a client can fetch.
pub trait UrlResolver: Send + Sync + std::fmt::Debug {
    fn resolve(&self, identifier: &str) -> String;
}

/// Resolves to `{base_url}/{mount_path}/{identifier}`.
///
/// Redundant slashes at the joins are collapsed, so `http://host/` with
/// mount `/images/` and `a.png` yields `http://host/images/a.png`.
#[derive(Debug, Clone)]
pub struct BaseUrlResolver {
    prefix: String,
}

impl BaseUrlResolver {
    pub fn new(base_url: &str, mount_path: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let mount = mount_path.trim_matches('/');

        let prefix = if mount.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, mount)
        };

        Self { prefix }
    }

    pub fn from_settings(settings: &UrlSettings) -> Self {
        Self::new(&settings.base_url, &settings.mount_path)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl UrlResolver for BaseUrlResolver {
    fn resolve(&self, identifier: &str) -> String {
        format!("{}/{}", self.prefix, identifier.trim_start_matches('/'))
    }
}
