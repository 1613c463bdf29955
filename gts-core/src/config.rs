/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! YAML-backed configuration for the memory store and the binned allocator.
//!
//! Mirrors the load/validate/fall-back-to-defaults shape used elsewhere in
//! this codebase for node configuration: a private `*File` type carries the
//! literal YAML shape (with `#[serde(default)]` fields), and a public type
//! carries the resolved, always-valid configuration the rest of the crate
//! consumes.

use serde::Deserialize;
use std::path::Path;

use crate::mem::bins::PAGE_SIZE_CLASSES;

/// Resolved configuration for a [`crate::mem::store::MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Size of one slab reservation, in bytes. Must be a power of two.
    pub slab_bytes: usize,
    /// OS page granularity assumed when committing/decommitting pages.
    pub os_page_bytes: usize,
    /// Page-size classes (in bytes) the store carves slabs into.
    pub page_size_classes: Vec<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            slab_bytes: 4 * 1024 * 1024,
            os_page_bytes: 4096,
            page_size_classes: PAGE_SIZE_CLASSES.to_vec(),
        }
    }
}

impl StoreConfig {
    /// Load a [`StoreConfig`] from a YAML file, falling back to
    /// [`StoreConfig::default`] for any field the file omits. Returns an
    /// error only if the file exists but fails to parse as YAML, or if the
    /// parsed values are not self-consistent (non-power-of-two slab size,
    /// a page class that is not itself a multiple of the OS page size).
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "store config file absent, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let file: StoreConfigFile = serde_yaml::from_str(&raw)?;
        let cfg = file.into_resolved();
        cfg.validate()?;
        tracing::info!(path = %path.display(), slab_bytes = cfg.slab_bytes, "loaded store config");
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.slab_bytes.is_power_of_two() {
            anyhow::bail!("slab_bytes ({}) must be a power of two", self.slab_bytes);
        }
        for &class in &self.page_size_classes {
            if class % self.os_page_bytes != 0 {
                anyhow::bail!(
                    "page size class {class} is not a multiple of os_page_bytes {}",
                    self.os_page_bytes
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
struct StoreConfigFile {
    slab_bytes: Option<usize>,
    os_page_bytes: Option<usize>,
    page_size_classes: Option<Vec<usize>>,
}

impl StoreConfigFile {
    fn into_resolved(self) -> StoreConfig {
        let defaults = StoreConfig::default();
        StoreConfig {
            slab_bytes: self.slab_bytes.unwrap_or(defaults.slab_bytes),
            os_page_bytes: self.os_page_bytes.unwrap_or(defaults.os_page_bytes),
            page_size_classes: self.page_size_classes.unwrap_or(defaults.page_size_classes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = StoreConfig::load_from_file("/nonexistent/path/store.yaml").unwrap();
        assert_eq!(cfg, StoreConfig::default());
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "slab_bytes: 1048576").unwrap();
        let cfg = StoreConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg.slab_bytes, 1024 * 1024);
        assert_eq!(cfg.os_page_bytes, StoreConfig::default().os_page_bytes);
    }

    #[test]
    fn non_power_of_two_slab_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "slab_bytes: 12345").unwrap();
        assert!(StoreConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn malformed_yaml_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "slab_bytes: [this, is, not, a, number").unwrap();
        assert!(StoreConfig::load_from_file(f.path()).is_err());
    }
}
