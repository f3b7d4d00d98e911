//! The reference set: module locations offered to the compiler
//!
//! The set is filled lazily on first use from a directory scan, the core
//! library locations and any explicitly added locations. A reload request
//! clears it and repeats the scan before the next compile.

use crate::error::ForgeResult;
use parking_lot::Mutex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use typeforge_engine::{CORE_LOCATIONS, MODULE_EXTENSION};

/// How a new location is compared against the ones already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupPolicy {
    /// Duplicate only when an identical location is present
    #[default]
    #[serde(rename = "exact", alias = "exact-path")]
    ExactPath,
    /// Duplicate when any present location contains the new one as a
    /// substring. A distinct module whose path is a substring of another
    /// path is dropped.
    Containment,
}

impl DedupPolicy {
    fn is_duplicate(self, present: &[String], location: &str) -> bool {
        match self {
            DedupPolicy::ExactPath => present.iter().any(|p| p == location),
            DedupPolicy::Containment => present.iter().any(|p| p.contains(location)),
        }
    }
}

/// Where the resolver scans for module files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Directory to scan; the executable's directory when `None`
    pub directory: Option<PathBuf>,
    /// File extension, compared case-insensitively, without the dot
    pub extension: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            directory: None,
            extension: MODULE_EXTENSION.to_string(),
        }
    }
}

impl ScanOptions {
    fn directory(&self) -> Option<PathBuf> {
        match &self.directory {
            Some(dir) => Some(dir.clone()),
            None => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

#[derive(Debug, Default)]
struct ReferenceState {
    locations: Vec<String>,
    initialized: bool,
    reload_requested: bool,
    /// Explicit locations waiting for the next resolve
    queued: Vec<String>,
    /// Every explicit location applied so far; re-applied after a reload
    explicit: Vec<String>,
}

/// Ordered set of unique module locations.
#[derive(Debug, Default)]
pub struct ReferenceSet {
    state: Mutex<ReferenceState>,
    scan: ScanOptions,
    policy: DedupPolicy,
}

impl ReferenceSet {
    pub fn new(scan: ScanOptions, policy: DedupPolicy) -> Self {
        Self {
            state: Mutex::new(ReferenceState::default()),
            scan,
            policy,
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    pub fn scan_options(&self) -> &ScanOptions {
        &self.scan
    }

    /// Populate the set if this is the first use or a reload was requested,
    /// apply queued locations, and return the current locations.
    pub fn resolve(&self) -> ForgeResult<Vec<String>> {
        let mut state = self.state.lock();

        if !state.initialized || state.reload_requested {
            let reloading = state.initialized;
            let mut locations = Vec::new();
            for location in self.scan_directory()? {
                self.insert(&mut locations, location);
            }
            for core in CORE_LOCATIONS {
                self.insert(&mut locations, core.to_string());
            }
            for location in state.explicit.clone() {
                self.insert(&mut locations, location);
            }
            state.locations = locations;
            state.initialized = true;
            state.reload_requested = false;
            info!(count = state.locations.len(), reloading, "reference set populated");
        }

        let queued = std::mem::take(&mut state.queued);
        for location in queued {
            let state = &mut *state;
            if !state.explicit.contains(&location) {
                state.explicit.push(location.clone());
            }
            self.insert(&mut state.locations, location);
        }

        Ok(state.locations.clone())
    }

    /// Clear and repopulate on the next [`ReferenceSet::resolve`].
    pub fn request_reload(&self) {
        self.state.lock().reload_requested = true;
    }

    /// Queue a location to be added on the next resolve.
    pub fn queue(&self, location: impl Into<String>) {
        self.state.lock().queued.push(location.into());
    }

    /// Add a location now. Returns false if it was treated as a duplicate.
    pub fn add(&self, location: impl Into<String>) -> bool {
        let location = location.into();
        let mut state = self.state.lock();
        if !state.explicit.contains(&location) {
            state.explicit.push(location.clone());
        }
        self.insert(&mut state.locations, location)
    }

    pub fn locations(&self) -> Vec<String> {
        self.state.lock().locations.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().locations.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    fn insert(&self, locations: &mut Vec<String>, location: String) -> bool {
        if self.policy.is_duplicate(locations, &location) {
            debug!(%location, policy = ?self.policy, "skipping duplicate reference");
            return false;
        }
        locations.push(location);
        true
    }

    fn scan_directory(&self) -> ForgeResult<Vec<String>> {
        let Some(directory) = self.scan.directory() else {
            return Ok(Vec::new());
        };
        if !directory.is_dir() {
            debug!(directory = %directory.display(), "reference directory does not exist");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&directory)? {
            let path = entry?.path();
            if self.scan.matches(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        debug!(directory = %directory.display(), found = paths.len(), "scanned for modules");
        Ok(paths.into_iter().map(|p| p.to_string_lossy().into_owned()).collect())
    }
}
