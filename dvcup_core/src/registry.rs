//! Resolution of configured remotes into object stores.

use crate::config::{Config, Section};
use crate::error::{Error, Result};
use crate::http::HttpRemote;
use crate::local::LocalRemote;
use crate::store::Remote;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Key of the default-remote setting in the `[core]` section.
const CORE_SECTION: &str = "core";
const CORE_REMOTE_KEY: &str = "remote";

/// One `remote "<name>"` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub name: String,
    pub location: String,
    pub timeout: Option<Duration>,
}

impl BackendConfig {
    fn from_section(name: &str, section: &Section) -> Result<Self> {
        let location = section
            .get("url")
            .or_else(|| section.get("location"))
            .map(|entry| entry.value.clone())
            .ok_or_else(|| Error::invalid_location(name, "", "missing `url`"))?;

        let timeout = match section.get("timeout") {
            Some(entry) => {
                let secs: u64 = entry.value.parse().map_err(|_| {
                    Error::invalid_config(
                        None,
                        format!(
                            "remote {}: timeout must be whole seconds, got `{}`",
                            name, entry.value
                        ),
                    )
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            name: name.to_string(),
            location,
            timeout,
        })
    }

    /// Classify the location and build the matching backend.
    ///
    /// A leading `scheme://` marks a URL; only `http` and `https` are
    /// supported. Anything else must be an absolute path, never resolved
    /// against the working directory.
    pub fn connect(&self) -> Result<Remote> {
        if has_scheme(&self.location) {
            let url = Url::parse(&self.location)
                .map_err(|e| Error::invalid_location(&self.name, &self.location, e.to_string()))?;
            return match url.scheme() {
                "http" | "https" => Ok(Remote::Http(HttpRemote::new(url, self.timeout))),
                scheme => Err(Error::invalid_location(
                    &self.name,
                    &self.location,
                    format!("unsupported scheme `{}`", scheme),
                )),
            };
        }

        let path = Path::new(&self.location);
        if !path.is_absolute() {
            return Err(Error::invalid_location(
                &self.name,
                &self.location,
                "path must be absolute",
            ));
        }
        if self.timeout.is_some() {
            warn!(remote = %self.name, "timeout ignored for local remote");
        }
        Ok(Remote::Local(LocalRemote::new(path)))
    }
}

/// Whether `location` starts with `<scheme>://`.
fn has_scheme(location: &str) -> bool {
    let Some((scheme, _)) = location.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Configured remotes, keyed by lowercase name.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    remotes: BTreeMap<String, Remote>,
    default: Option<String>,
}

impl StoreRegistry {
    /// Read every `remote "<name>"` section of `config`.
    pub fn backends(config: &Config) -> Result<Vec<BackendConfig>> {
        config
            .sections()
            .iter()
            .filter_map(|section| section.remote_name().map(|name| (name, section)))
            .map(|(name, section)| BackendConfig::from_section(name, section))
            .collect()
    }

    /// Build a registry from a parsed configuration.
    ///
    /// Performs no I/O against the remotes themselves.
    pub fn resolve(config: &Config) -> Result<Self> {
        let mut remotes = BTreeMap::new();
        for backend in Self::backends(config)? {
            let remote = backend.connect()?;
            debug!(remote = %backend.name, kind = remote.kind(), location = %backend.location, "resolved remote");
            remotes.insert(backend.name.to_ascii_lowercase(), remote);
        }

        let default = config
            .get(CORE_SECTION, CORE_REMOTE_KEY)
            .filter(|name| !name.is_empty())
            .map(str::to_ascii_lowercase);

        Ok(Self { remotes, default })
    }

    /// Look up a remote by name.
    pub fn get(&self, name: &str) -> Result<&Remote> {
        self.remotes
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::remote_not_found(name))
    }

    /// Name selected by `core.remote`, if any.
    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// The remote selected by `core.remote`.
    pub fn default_store(&self) -> Result<&Remote> {
        let name = self.default.as_deref().ok_or(Error::NoDefaultRemote)?;
        self.get(name)
    }

    /// Iterate over `(name, remote)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Remote)> {
        self.remotes.iter().map(|(name, remote)| (name.as_str(), remote))
    }

    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}
