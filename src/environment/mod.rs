//! Named environments on disk.
//!
//! An environment is a directory under the store root holding a panorama
//! texture (`skybox.png`) and optionally a matching depth map (`depth.png`).
//! Names are sanitised for the filesystem and made unique by appending a
//! counter, so saving never overwrites an existing environment.

use crate::error::EquirectError;
use crate::tensor::ImageBatch;
use crate::util::{ensure_dir, save_image};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const TEXTURE_FILE: &str = "skybox.png";
pub const DEPTH_FILE: &str = "depth.png";

/// Names longer than this many characters are truncated and suffixed with `...`.
pub const MAX_NAME_LEN: usize = 25;

const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// JSON body listing the stored environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentListing {
    pub environments: Vec<String>,
}

/// Filesystem store of environments rooted at a directory.
#[derive(Debug, Clone)]
pub struct EnvironmentStore {
    root: PathBuf,
}

impl EnvironmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        EnvironmentStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Replaces characters that are not allowed in file names with `_`,
    /// strips trailing spaces and dots and truncates long names.
    ///
    /// ```rust
    /// use equirect_tools::environment::EnvironmentStore;
    ///
    /// assert_eq!(EnvironmentStore::sanitize_name("sky/box: v2. "), "sky_box_ v2");
    /// ```
    pub fn sanitize_name(name: &str) -> String {
        let replaced: String = name
            .chars()
            .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
            .collect();
        let trimmed = replaced.trim_end_matches([' ', '.']);
        if trimmed.chars().count() > MAX_NAME_LEN {
            let mut truncated: String = trimmed.chars().take(MAX_NAME_LEN).collect();
            truncated.push_str("...");
            truncated
        } else {
            trimmed.to_string()
        }
    }

    /// `base` if nothing of that name exists under the root, otherwise the
    /// first free `base N` for `N = 2, 3, ...`.
    pub fn unique_name(&self, base: &str) -> Result<String, EquirectError> {
        let existing = self.existing_entries()?;
        let mut candidate = base.to_string();
        let mut counter = 2;
        while existing.contains(&candidate) {
            candidate = format!("{base} {counter}");
            counter += 1;
        }
        Ok(candidate)
    }

    /// Stores each texture of the batch, with its paired depth map if given,
    /// under a fresh environment directory.
    ///
    /// An empty `name` (after sanitising) is replaced by the current Unix time
    /// in seconds. Every element takes its name from that same base (`name`,
    /// `name 2`, `name 3`, ...), never from the name given to the previous
    /// element, so suffixes do not pile up as `name 2 2`. Returns the
    /// allocated names in batch order.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::DimensionMismatch`] if `depths` does not hold
    ///   exactly one image per texture. Nothing is written in that case.
    /// * I/O and encoding errors from writing the files.
    pub fn save(
        &self,
        textures: &ImageBatch,
        depths: Option<&ImageBatch>,
        name: &str,
    ) -> Result<Vec<String>, EquirectError> {
        if let Some(depths) = depths {
            if depths.len() != textures.len() {
                return Err(EquirectError::DimensionMismatch {
                    expected: textures.len(),
                    found: depths.len(),
                });
            }
        }

        let mut base = Self::sanitize_name(name);
        if base.is_empty() {
            base = unix_timestamp()?.to_string();
        }

        ensure_dir(&self.root)?;

        let mut names = Vec::with_capacity(textures.len());
        for (index, texture) in textures.iter().enumerate() {
            let env_name = self.unique_name(&base)?;
            let env_dir = self.root.join(&env_name);
            fs::create_dir_all(&env_dir)?;

            save_image(texture, &env_dir.join(TEXTURE_FILE))?;
            if let Some(depth) = depths.and_then(|d| d.get(index)) {
                save_image(depth, &env_dir.join(DEPTH_FILE))?;
            }

            info!("Saved environment '{}' to {}", env_name, env_dir.display());
            names.push(env_name);
        }
        Ok(names)
    }

    /// Names of the environment directories under the root, sorted. Empty if
    /// the root does not exist yet.
    pub fn list_environments(&self) -> Result<Vec<String>, EquirectError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// The listing as `{"environments": [...]}`.
    pub fn list_environments_json(&self) -> Result<String, EquirectError> {
        let listing = EnvironmentListing {
            environments: self.list_environments()?,
        };
        Ok(serde_json::to_string(&listing)?)
    }

    fn existing_entries(&self) -> Result<HashSet<String>, EquirectError> {
        if !self.root.is_dir() {
            return Ok(HashSet::new());
        }
        let mut entries = HashSet::new();
        for entry in fs::read_dir(&self.root)? {
            entries.insert(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(entries)
    }
}

fn unix_timestamp() -> Result<u64, EquirectError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| EquirectError::IOError(format!("system clock before Unix epoch: {e}")))
}
