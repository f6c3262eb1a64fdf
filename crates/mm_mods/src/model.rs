//! Mod Config Model (component E, in-memory half).
//!
//! Holds the current package/native selection and ordering constraints.
//! The on-disk writer/reader live in [`crate::writer`]; this module is
//! the pure in-memory mutation surface.

use crate::types::{strip_external_suffix, DependencyRef, ModPackage, NativeEntry};

#[derive(Debug, Clone, Default)]
pub struct ModConfigModel {
    pub packages: Vec<ModPackage>,
    pub natives: Vec<NativeEntry>,
}

impl ModConfigModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `id` (after stripping the UI suffix) is
    /// already present.
    pub fn add_package(&mut self, id: impl Into<String>, source: impl Into<String>, enabled: bool) -> bool {
        let id = id.into();
        let clean_id = strip_external_suffix(&id).to_string();
        if self.packages.iter().any(|p| p.id == clean_id) {
            return false;
        }
        self.packages.push(ModPackage::new(clean_id, source, enabled));
        true
    }

    pub fn remove_package(&mut self, id: &str) -> bool {
        let clean_id = strip_external_suffix(id);
        let before = self.packages.len();
        self.packages.retain(|p| p.id != clean_id);
        self.packages.len() != before
    }

    pub fn toggle_package(&mut self, id: &str) -> bool {
        let clean_id = strip_external_suffix(id);
        if let Some(pkg) = self.packages.iter_mut().find(|p| p.id == clean_id) {
            pkg.enabled = !pkg.enabled;
            true
        } else {
            false
        }
    }

    /// `path` is the fully-formed relative (internal) or absolute
    /// (external) path, not a UI display string.
    pub fn add_native(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        let clean = strip_external_suffix(&path).to_string();
        if self.natives.iter().any(|n| n.path == clean) {
            return false;
        }
        self.natives.push(NativeEntry::new(clean));
        true
    }

    /// Order-sensitive match: exact path, then
    /// stripped-suffix-equivalence, then suffix-match on trailing
    /// filename (so a UI's `"Foo.dll (external)"` or a bare filename
    /// both resolve against a stored full path).
    fn find_native_index(&self, input: &str) -> Option<usize> {
        let clean = strip_external_suffix(input);
        self.natives.iter().position(|n| {
            n.path == clean
                || n.path == input
                || n.path.ends_with(clean)
                || (n.is_external && n.file_name() == clean)
        })
    }

    pub fn remove_native(&mut self, path: &str) -> bool {
        if let Some(i) = self.find_native_index(path) {
            self.natives.remove(i);
            true
        } else {
            false
        }
    }

    pub fn toggle_native(&mut self, path: &str) -> bool {
        if let Some(i) = self.find_native_index(path) {
            self.natives[i].enabled = !self.natives[i].enabled;
            true
        } else {
            false
        }
    }

    /// Rewrites `id`'s `load_after` to list every other currently-enabled
    /// package as an optional dependency.
    pub fn set_force_load_last(&mut self, id: &str) -> bool {
        let clean_id = strip_external_suffix(id).to_string();
        if !self.packages.iter().any(|p| p.id == clean_id) {
            return false;
        }
        let others: Vec<String> = self
            .packages
            .iter()
            .filter(|p| p.enabled && p.id != clean_id)
            .map(|p| p.id.clone())
            .collect();
        let target = self.packages.iter_mut().find(|p| p.id == clean_id).unwrap();
        target.load_after = others
            .into_iter()
            .map(|id| DependencyRef::new(id, true))
            .collect();
        true
    }

    pub fn clear_force_load_last(&mut self, id: &str) -> bool {
        let clean_id = strip_external_suffix(id);
        if let Some(pkg) = self.packages.iter_mut().find(|p| p.id == clean_id) {
            pkg.load_after.clear();
            true
        } else {
            false
        }
    }

    /// True iff the current `load_after` set is a superset of every
    /// other currently-enabled package id.
    #[must_use]
    pub fn is_force_load_last(&self, id: &str) -> bool {
        let clean_id = strip_external_suffix(id);
        let Some(target) = self.packages.iter().find(|p| p.id == clean_id) else {
            return false;
        };
        if target.load_after.is_empty() {
            return false;
        }
        let load_after_ids: std::collections::HashSet<&str> =
            target.load_after.iter().map(|d| d.id.as_str()).collect();
        self.packages
            .iter()
            .filter(|p| p.enabled && p.id != clean_id)
            .all(|p| load_after_ids.contains(p.id.as_str()))
    }

    /// Native symmetry of `set_force_load_last`: writes `load_before`
    /// against every other enabled native, since natives are ordered by
    /// "before", not "after".
    pub fn set_force_load_first(&mut self, path: &str) -> bool {
        let Some(i) = self.find_native_index(path) else {
            return false;
        };
        let target_path = self.natives[i].path.clone();
        let others: Vec<String> = self
            .natives
            .iter()
            .filter(|n| n.enabled && n.path != target_path)
            .map(|n| n.file_name().to_string())
            .collect();
        self.natives[i].load_before = others
            .into_iter()
            .map(|id| DependencyRef::new(id, true))
            .collect();
        true
    }

    pub fn clear_force_load_first(&mut self, path: &str) -> bool {
        if let Some(i) = self.find_native_index(path) {
            self.natives[i].load_before.clear();
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_force_load_first(&self, path: &str) -> bool {
        let Some(i) = self.find_native_index(path) else {
            return false;
        };
        let target = &self.natives[i];
        if target.load_before.is_empty() {
            return false;
        }
        let target_path = target.path.clone();
        let load_before_ids: std::collections::HashSet<&str> =
            target.load_before.iter().map(|d| d.id.as_str()).collect();
        self.natives
            .iter()
            .filter(|n| n.enabled && n.path != target_path)
            .all(|n| load_before_ids.contains(n.file_name()))
    }

    /// Toggles the nrsc.dll preload hint, a no-op if `path` doesn't
    /// resolve to an nrsc.dll entry.
    pub fn set_nrsc_preload(&mut self, path: &str, preload: bool) -> bool {
        if let Some(i) = self.find_native_index(path) {
            if self.natives[i].is_nrsc() {
                self.natives[i].preload = preload;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_load_last_lists_other_enabled_as_optional() {
        let mut model = ModConfigModel::new();
        model.add_package("A", "A", true);
        model.add_package("B", "B", true);
        model.add_package("C", "C", true);
        assert!(model.set_force_load_last("B"));
        let b = model.packages.iter().find(|p| p.id == "B").unwrap();
        let ids: Vec<&str> = b.load_after.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert!(b.load_after.iter().all(|d| d.optional));
        assert!(model.is_force_load_last("B"));
    }

    #[test]
    fn is_force_load_last_false_when_a_mod_disabled_after_the_fact() {
        let mut model = ModConfigModel::new();
        model.add_package("A", "A", true);
        model.add_package("B", "B", true);
        model.set_force_load_last("B");
        model.add_package("C", "C", true);
        assert!(!model.is_force_load_last("B"));
    }

    #[test]
    fn native_match_falls_back_to_suffix() {
        let mut model = ModConfigModel::new();
        model.add_native("libs/nrsc.dll");
        assert!(model.toggle_native("nrsc.dll"));
        assert!(!model.natives[0].enabled);
    }

    #[test]
    fn external_suffix_is_stripped_on_package_ops() {
        let mut model = ModConfigModel::new();
        model.add_package("A", "A", true);
        assert!(model.toggle_package("A (external)"));
        assert!(!model.packages[0].enabled);
    }
}
