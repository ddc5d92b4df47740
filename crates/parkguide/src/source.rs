//! Where floor-plan markup comes from.

use crate::{Error, Result};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Resolves a floor key (`"B1"`, `"B2"`, ...) to SVG markup.
pub trait FloorPlanSource {
    fn load(&self, floor: &str) -> Result<String>;

    /// Known floor keys, in display order.
    fn floors(&self) -> Vec<String>;
}

/// Reads `<dir>/<file>` for each floor key in the configured map.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    files: IndexMap<String, String>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, files: IndexMap<String, String>) -> Self {
        Self {
            dir: dir.into(),
            files,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, floor: &str) -> Option<PathBuf> {
        self.files.get(floor).map(|f| self.dir.join(f))
    }
}

impl FloorPlanSource for DirectorySource {
    fn load(&self, floor: &str) -> Result<String> {
        let Some(path) = self.path_for(floor) else {
            tracing::warn!(floor, "no floor plan configured for key");
            return Err(Error::UnknownFloor {
                floor: floor.to_string(),
            });
        };
        std::fs::read_to_string(&path).map_err(|source| Error::Io { path, source })
    }

    fn floors(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

/// Markup held in memory; handy for hosts that fetch plans themselves.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    plans: IndexMap<String, String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(mut self, floor: impl Into<String>, markup: impl Into<String>) -> Self {
        self.insert(floor, markup);
        self
    }

    pub fn insert(&mut self, floor: impl Into<String>, markup: impl Into<String>) {
        self.plans.insert(floor.into(), markup.into());
    }
}

impl FloorPlanSource for InMemorySource {
    fn load(&self, floor: &str) -> Result<String> {
        self.plans.get(floor).cloned().ok_or_else(|| {
            tracing::warn!(floor, "no floor plan configured for key");
            Error::UnknownFloor {
                floor: floor.to_string(),
            }
        })
    }

    fn floors(&self) -> Vec<String> {
        self.plans.keys().cloned().collect()
    }
}
