//! External Mod Registry (component D).
//!
//! Persists user-added out-of-tree mod paths under stable names, with
//! user comments, as a single JSON document, using `mm_core::fsutil`'s
//! tolerant-read / full-rewrite helpers instead of bare `json` calls.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use mm_core::fsutil;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ExternalModRegistry {
    #[serde(default)]
    packages: HashMap<String, PathBuf>,
    #[serde(default)]
    natives: HashMap<String, PathBuf>,
    #[serde(default)]
    mod_comments: HashMap<String, String>,
    #[serde(default)]
    native_comments: HashMap<String, String>,
}

impl ExternalModRegistry {
    /// Loads the registry from `path`. Never fails the process: a parse
    /// error resets to empty mappings with a logged warning.
    pub async fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fsutil::read_json_tolerant::<Self>(path).await {
            Some(registry) => registry,
            None => {
                mm_core::err!("external-mod registry at {path:?} is corrupt, starting empty");
                Self::default()
            }
        }
    }

    /// Full-file, pretty-printed, UTF-8 rewrite.
    pub async fn save(&self, path: &Path) -> Result<(), RegistryError> {
        fsutil::write_json_pretty(path, self).await.map_err(Into::into)
    }

    pub fn packages(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn natives(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.natives.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    #[must_use]
    pub fn package_path(&self, name: &str) -> Option<&Path> {
        self.packages.get(name).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn native_path(&self, name: &str) -> Option<&Path> {
        self.natives.get(name).map(PathBuf::as_path)
    }

    /// All native filenames known to the registry, for the name-clash
    /// check `add_native` needs against internal DLLs too.
    #[must_use]
    pub fn native_names(&self) -> HashSet<String> {
        self.natives.keys().cloned().collect()
    }

    /// Registers an out-of-tree mod folder under its own basename.
    ///
    /// # Errors
    /// If the path is missing or the wrong type, inside the internal
    /// tree, a path-duplicate, or a name-duplicate with a different path.
    pub fn add_package(&mut self, path: &Path, mods_dir: &Path) -> Result<(), String> {
        if !path.is_dir() {
            return Err("path does not exist or is not a directory".to_string());
        }
        let resolved = fsutil::canonicalize_best_effort(path);
        if fsutil::is_inside(mods_dir, &resolved) {
            return Err("cannot register a folder inside the internal mod directory".to_string());
        }
        for (name, existing) in &self.packages {
            if fsutil::canonicalize_best_effort(existing) == resolved {
                return Err(format!("path-duplicate: already registered as '{name}'"));
            }
        }
        let name = base_name(&resolved);
        if let Some(existing) = self.packages.get(&name) {
            if fsutil::canonicalize_best_effort(existing) != resolved {
                return Err(format!(
                    "name-duplicate: an external mod named '{name}' is already registered at a different path"
                ));
            }
            return Err(format!("'{name}' is already registered"));
        }
        self.packages.insert(name, resolved);
        Ok(())
    }

    /// Registers an out-of-tree native DLL under its own basename.
    ///
    /// `existing_dll_names` is the caller-supplied union of every
    /// currently-visible internal DLL name (from the scanner): the
    /// name-duplicate check for natives runs against any existing DLL,
    /// internal or external.
    ///
    /// # Errors
    /// As [`Self::add_package`], plus wrong-extension and name-duplicate
    /// against any internal DLL.
    pub fn add_native(
        &mut self,
        path: &Path,
        mods_dir: &Path,
        existing_dll_names: &HashSet<String>,
    ) -> Result<(), String> {
        if !path.is_file() {
            return Err("path does not exist or is not a file".to_string());
        }
        if !path.extension().is_some_and(|e| e.eq_ignore_ascii_case("dll")) {
            return Err("file is not a .dll".to_string());
        }
        let resolved = fsutil::canonicalize_best_effort(path);
        if fsutil::is_inside(mods_dir, &resolved) {
            return Err("cannot register a DLL inside the internal mod directory".to_string());
        }
        for (name, existing) in &self.natives {
            if fsutil::canonicalize_best_effort(existing) == resolved {
                return Err(format!("path-duplicate: already registered as '{name}'"));
            }
        }
        let name = base_name(&resolved);
        if let Some(existing) = self.natives.get(&name) {
            if fsutil::canonicalize_best_effort(existing) != resolved {
                return Err(format!("name-duplicate against existing DLL '{name}'"));
            }
            return Err(format!("'{name}' is already registered"));
        }
        if existing_dll_names.contains(&name) {
            return Err(format!("name-duplicate against existing DLL '{name}'"));
        }
        self.natives.insert(name, resolved);
        Ok(())
    }

    pub fn remove_package(&mut self, name: &str) -> bool {
        let removed = self.packages.remove(name).is_some();
        if removed {
            self.mod_comments.remove(name);
        }
        removed
    }

    pub fn remove_native(&mut self, name: &str) -> bool {
        let removed = self.natives.remove(name).is_some();
        if removed {
            self.native_comments.remove(name);
        }
        removed
    }

    pub fn set_mod_comment(&mut self, id: &str, text: &str) {
        if text.trim().is_empty() {
            self.mod_comments.remove(id);
        } else {
            self.mod_comments.insert(id.to_string(), text.trim().to_string());
        }
    }

    #[must_use]
    pub fn mod_comment(&self, id: &str) -> &str {
        self.mod_comments.get(id).map_or("", String::as_str)
    }

    pub fn set_native_comment(&mut self, path: &str, text: &str) {
        if text.trim().is_empty() {
            self.native_comments.remove(path);
        } else {
            self.native_comments.insert(path.to_string(), text.trim().to_string());
        }
    }

    #[must_use]
    pub fn native_comment(&self, path: &str) -> &str {
        self.native_comments.get(path).map_or("", String::as_str)
    }

    /// Entries whose target no longer exists on disk, split by kind.
    #[must_use]
    pub fn missing(&self) -> (Vec<String>, Vec<String>) {
        let packages = self
            .packages
            .iter()
            .filter(|(_, p)| !p.exists())
            .map(|(n, _)| n.clone())
            .collect();
        let natives = self
            .natives
            .iter()
            .filter(|(_, p)| !p.exists())
            .map(|(n, _)| n.clone())
            .collect();
        (packages, natives)
    }

    /// Prunes every missing entry, returning the names removed.
    pub fn cleanup_missing(&mut self) -> (Vec<String>, Vec<String>) {
        let (packages, natives) = self.missing();
        for name in &packages {
            self.remove_package(name);
        }
        for name in &natives {
            self.remove_native(name);
        }
        (packages, natives)
    }

    /// Prunes any entry that, despite having been registered externally,
    /// now resolves inside the internal mod directory.
    pub fn cleanup_internal_entries(&mut self, mods_dir: &Path) -> (Vec<String>, Vec<String>) {
        let stray_packages: Vec<String> = self
            .packages
            .iter()
            .filter(|(_, p)| fsutil::is_inside(mods_dir, p))
            .map(|(n, _)| n.clone())
            .collect();
        let stray_natives: Vec<String> = self
            .natives
            .iter()
            .filter(|(_, p)| fsutil::is_inside(mods_dir, p))
            .map(|(n, _)| n.clone())
            .collect();
        for name in &stray_packages {
            self.remove_package(name);
        }
        for name in &stray_natives {
            self.remove_native(name);
        }
        (stray_packages, stray_natives)
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_inside_internal_tree() {
        let mods_dir = std::env::temp_dir().join("mm_registry_test_mods");
        let inner = mods_dir.join("SomeMod");
        std::fs::create_dir_all(&inner).unwrap();

        let mut registry = ExternalModRegistry::default();
        let result = registry.add_package(&inner, &mods_dir);
        assert!(result.is_err());
        std::fs::remove_dir_all(&mods_dir).ok();
    }

    #[test]
    fn rejects_duplicate_path_and_name() {
        let base = std::env::temp_dir().join("mm_registry_test_ext");
        let mods_dir = base.join("Mods");
        let mod_a = base.join("ExternalA");
        let mod_b = base.join("nested").join("ExternalA");
        std::fs::create_dir_all(&mods_dir).unwrap();
        std::fs::create_dir_all(&mod_a).unwrap();
        std::fs::create_dir_all(&mod_b).unwrap();

        let mut registry = ExternalModRegistry::default();
        registry.add_package(&mod_a, &mods_dir).unwrap();
        assert!(registry.add_package(&mod_a, &mods_dir).is_err());
        assert!(registry.add_package(&mod_b, &mods_dir).is_err());
        std::fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn external_native_name_clash_reports_the_same_reason_as_an_internal_clash() {
        let base = std::env::temp_dir().join("mm_registry_test_native_clash");
        let mods_dir = base.join("Mods");
        let first = base.join("x").join("mod.dll");
        let second = base.join("y").join("mod.dll");
        std::fs::create_dir_all(&mods_dir).unwrap();
        std::fs::create_dir_all(first.parent().unwrap()).unwrap();
        std::fs::create_dir_all(second.parent().unwrap()).unwrap();
        std::fs::write(&first, b"MZ").unwrap();
        std::fs::write(&second, b"MZ").unwrap();

        let mut registry = ExternalModRegistry::default();
        let empty = HashSet::new();
        registry.add_native(&first, &mods_dir, &empty).unwrap();
        let result = registry.add_native(&second, &mods_dir, &empty);
        assert_eq!(result, Err("name-duplicate against existing DLL 'mod.dll'".to_string()));

        std::fs::remove_dir_all(&base).ok();
    }
}
