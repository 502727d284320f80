//! Proxy factory configuration

use std::path::{Path, PathBuf};

/// Environment variable naming the directory synthesized sources are dumped to
pub const DUMP_DIR_ENV: &str = "VEIL_PROXY_DUMP_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    /// When set, every synthesized source is written to `<dump_dir>/<file name>`
    pub dump_dir: Option<PathBuf>,
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        Self {
            dump_dir: lookup(DUMP_DIR_ENV).filter(|dir| !dir.as_os_str().is_empty()),
        }
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    pub fn dump_dir(&self) -> Option<&Path> {
        self.dump_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup() {
        let config = ProxyConfig::from_lookup(|key| {
            assert_eq!(key, DUMP_DIR_ENV);
            Some(PathBuf::from("/tmp/proxies"))
        });
        assert_eq!(config.dump_dir(), Some(Path::new("/tmp/proxies")));

        let empty = ProxyConfig::from_lookup(|_| Some(PathBuf::new()));
        assert_eq!(empty.dump_dir(), None);
        assert_eq!(ProxyConfig::from_lookup(|_| None), ProxyConfig::default());
    }

    #[test]
    fn test_builder() {
        let config = ProxyConfig::new().with_dump_dir("out");
        assert_eq!(config.dump_dir(), Some(Path::new("out")));
    }
}
