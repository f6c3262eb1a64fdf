//! Loader-profile writer and reader.
//!
//! The writer is a pure function of [`ModConfigModel`] state. The reader is a
//! small hand-rolled parser for this exact grammar — not a general TOML
//! parser — since the profile format here is a narrow, fully-specified
//! subset the external loader also hand-parses.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    error::ProfileError,
    model::ModConfigModel,
    types::{DependencyRef, ModPackage, NativeEntry, NRSC_DLL},
};

/// Writes the textual profile the external mod loader consumes. Only
/// **enabled** packages and natives are emitted.
#[must_use]
pub fn write_profile(model: &ModConfigModel) -> String {
    let mut out = String::new();
    out.push_str("profileVersion = \"v1\"\n\n");

    for pkg in model.packages.iter().filter(|p| p.enabled) {
        out.push_str("[[packages]]\n");
        out.push_str(&format!("id = \"{}\"\n", pkg.id));
        out.push_str(&format!("source = \"{}\"\n", escape(&pkg.source)));
        if !pkg.load_after.is_empty() {
            out.push_str(&format!("load_after = {}\n", format_deps(&pkg.load_after)));
        }
        if !pkg.load_before.is_empty() {
            out.push_str(&format!("load_before = {}\n", format_deps(&pkg.load_before)));
        }
        out.push('\n');
    }

    let enabled_natives: Vec<&NativeEntry> = model.natives.iter().filter(|n| n.enabled).collect();
    let nrsc_preload = enabled_natives
        .iter()
        .find(|n| n.is_nrsc())
        .is_some_and(|n| n.preload);
    let has_nrsc = enabled_natives.iter().any(|n| n.is_nrsc());

    for native in sort_natives_for_emission(enabled_natives) {
        out.push_str("[[natives]]\n");
        out.push_str(&format!("path = \"{}\"\n", escape(&native.path)));
        if native.is_nrsc() && native.preload {
            out.push_str("load_early = true\n");
        }
        if native.optional {
            out.push_str(&format!("optional = {}\n", native.optional));
        }
        if let Some(init) = &native.initializer {
            out.push_str(&format!("initializer = \"{init}\"\n"));
        }
        if let Some(fin) = &native.finalizer {
            out.push_str(&format!("finalizer = \"{fin}\"\n"));
        }
        out.push_str_load_after(&native.load_after);

        let mut load_before = native.load_before.clone();
        // Auto-insert nighter -> nrsc unless nrsc.dll is marked preload
        // (in which case it already loads early and needs no explicit
        // dependency).
        if native.is_nighter()
            && has_nrsc
            && !nrsc_preload
            && !load_before.iter().any(|d| d.id.eq_ignore_ascii_case(NRSC_DLL))
        {
            load_before.push(DependencyRef::new(NRSC_DLL, false));
        }
        if !load_before.is_empty() {
            out.push_str(&format!("load_before = {}\n", format_deps(&load_before)));
        }
        out.push('\n');
    }

    out
}

trait PushLoadAfter {
    fn push_str_load_after(&mut self, deps: &[DependencyRef]);
}

impl PushLoadAfter for String {
    fn push_str_load_after(&mut self, deps: &[DependencyRef]) {
        if !deps.is_empty() {
            self.push_str(&format!("load_after = {}\n", format_deps(deps)));
        }
    }
}

/// Stable sort so any `nighter.dll` entry precedes any `nrsc.dll` entry,
/// preserving relative order otherwise.
fn sort_natives_for_emission(mut natives: Vec<&NativeEntry>) -> Vec<&NativeEntry> {
    natives.sort_by_key(|n| {
        if n.is_nighter() {
            0
        } else if n.is_nrsc() {
            1
        } else {
            2
        }
    });
    natives
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
}

fn unescape(s: &str) -> String {
    s.replace("\\\\", "\\")
}

fn format_deps(deps: &[DependencyRef]) -> String {
    let parts: Vec<String> = deps
        .iter()
        .map(|d| format!("{{id = \"{}\", optional = {}}}", d.id, d.optional))
        .collect();
    format!("[{}]", parts.join(", "))
}

static DEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{id = "([^"]*)", optional = (true|false)\}"#).unwrap());

fn parse_deps(s: &str) -> Vec<DependencyRef> {
    DEP_RE
        .captures_iter(s)
        .map(|c| DependencyRef::new(c[1].to_string(), &c[2] == "true"))
        .collect()
}

fn unquote(v: &str) -> String {
    v.trim_matches('"').to_string()
}

enum Section {
    None,
    Package,
    Native,
}

/// Parses a loader-profile document back into a [`ModConfigModel`].
/// Every entry parsed is implicitly enabled, since the writer never
/// emits disabled ones.
///
/// # Errors
/// On any line that isn't a recognized section header, blank separator,
/// or `key = value` pair inside a known section.
pub fn parse_profile(text: &str) -> Result<ModConfigModel, ProfileError> {
    let mut model = ModConfigModel::new();
    let mut section = Section::None;
    let mut cur_pkg: Option<ModPackage> = None;
    let mut cur_nat: Option<NativeEntry> = None;

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim();

        if line.is_empty() {
            flush(&mut section, &mut cur_pkg, &mut cur_nat, &mut model);
            continue;
        }
        if line == "[[packages]]" {
            flush(&mut section, &mut cur_pkg, &mut cur_nat, &mut model);
            section = Section::Package;
            cur_pkg = Some(ModPackage::new(String::new(), String::new(), true));
            continue;
        }
        if line == "[[natives]]" {
            flush(&mut section, &mut cur_pkg, &mut cur_nat, &mut model);
            section = Section::Native;
            cur_nat = Some(NativeEntry::new(String::new()));
            continue;
        }
        if line.starts_with("profileVersion") {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ProfileError::Parse {
                line: lineno,
                reason: format!("expected `key = value`, found {line:?}"),
            });
        };
        let key = key.trim();
        let value = value.trim();

        match section {
            Section::Package => {
                let pkg = cur_pkg.as_mut().expect("section implies Some");
                apply_package_field(pkg, key, value, lineno)?;
            }
            Section::Native => {
                let nat = cur_nat.as_mut().expect("section implies Some");
                apply_native_field(nat, key, value, lineno)?;
            }
            Section::None => {
                return Err(ProfileError::Parse {
                    line: lineno,
                    reason: "key-value pair before any [[packages]]/[[natives]] header".to_string(),
                })
            }
        }
    }
    flush(&mut section, &mut cur_pkg, &mut cur_nat, &mut model);

    Ok(model)
}

fn flush(
    section: &mut Section,
    cur_pkg: &mut Option<ModPackage>,
    cur_nat: &mut Option<NativeEntry>,
    model: &mut ModConfigModel,
) {
    match section {
        Section::Package => {
            if let Some(p) = cur_pkg.take() {
                model.packages.push(p);
            }
        }
        Section::Native => {
            if let Some(n) = cur_nat.take() {
                model.natives.push(n);
            }
        }
        Section::None => {}
    }
    *section = Section::None;
}

fn apply_package_field(pkg: &mut ModPackage, key: &str, value: &str, line: usize) -> Result<(), ProfileError> {
    match key {
        "id" => pkg.id = unquote(value),
        "source" => pkg.source = unescape(&unquote(value)),
        "load_after" => pkg.load_after = parse_deps(value),
        "load_before" => pkg.load_before = parse_deps(value),
        other => {
            return Err(ProfileError::Parse {
                line,
                reason: format!("unknown package field '{other}'"),
            })
        }
    }
    Ok(())
}

fn apply_native_field(nat: &mut NativeEntry, key: &str, value: &str, line: usize) -> Result<(), ProfileError> {
    match key {
        "path" => nat.path = unescape(&unquote(value)),
        "optional" => nat.optional = value == "true",
        "initializer" => nat.initializer = Some(unquote(value)),
        "finalizer" => nat.finalizer = Some(unquote(value)),
        "load_early" => {
            if value == "true" {
                nat.preload = true;
            }
        }
        "load_after" => nat.load_after = parse_deps(value),
        "load_before" => nat.load_before = parse_deps(value),
        other => {
            return Err(ProfileError::Parse {
                line,
                reason: format!("unknown native field '{other}'"),
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_launch_scenario_a() {
        let mut model = ModConfigModel::new();
        model.add_package("ModA", "ModA", true);
        model.add_native("libs/nrsc.dll");
        model.set_nrsc_preload("libs/nrsc.dll", true);

        let text = write_profile(&model);
        assert!(text.starts_with("profileVersion = \"v1\"\n\n"));
        assert!(text.contains("[[packages]]\nid = \"ModA\"\nsource = \"ModA\"\n"));
        assert!(text.contains("path = \"libs/nrsc.dll\"\nload_early = true\n"));
    }

    #[test]
    fn forced_last_load_scenario_b() {
        let mut model = ModConfigModel::new();
        model.add_package("A", "A", true);
        model.add_package("B", "B", true);
        model.add_package("C", "C", true);
        model.set_force_load_last("B");

        let text = write_profile(&model);
        assert!(text.contains(r#"load_after = [{id = "A", optional = true}, {id = "C", optional = true}]"#));
    }

    #[test]
    fn nighter_nrsc_auto_dependency_unless_preloaded() {
        let mut model = ModConfigModel::new();
        model.add_native("nrsc.dll");
        model.add_native("nighter.dll");

        let text = write_profile(&model);
        let nighter_pos = text.find("path = \"nighter.dll\"").unwrap();
        let nrsc_pos = text.find("path = \"nrsc.dll\"").unwrap();
        assert!(nighter_pos < nrsc_pos, "nighter.dll must precede nrsc.dll");
        assert!(text.contains(r#"load_before = [{id = "nrsc.dll", optional = false}]"#));

        model.set_nrsc_preload("nrsc.dll", true);
        let text2 = write_profile(&model);
        assert!(!text2.contains("load_before"));
        assert!(text2.contains("load_early = true"));
    }

    #[test]
    fn disabled_entries_are_omitted() {
        let mut model = ModConfigModel::new();
        model.add_package("A", "A", true);
        model.add_package("B", "B", false);
        let text = write_profile(&model);
        assert!(text.contains("id = \"A\""));
        assert!(!text.contains("id = \"B\""));
    }

    #[test]
    fn round_trip_preserves_enabled_entries_and_constraints() {
        let mut model = ModConfigModel::new();
        model.add_package("A", "A", true);
        model.add_package("B", "ExternalPath", true);
        model.set_force_load_last("B");
        model.add_native("libs/foo.dll");
        model.natives[0].optional = true;
        model.natives[0].initializer = Some("Init".to_string());

        let text = write_profile(&model);
        let parsed = parse_profile(&text).unwrap();

        assert_eq!(parsed.packages.len(), 2);
        assert_eq!(parsed.packages[0].id, "A");
        assert_eq!(parsed.packages[1].id, "B");
        assert_eq!(parsed.packages[1].load_after, model.packages[1].load_after);
        assert_eq!(parsed.natives[0].path, "libs/foo.dll");
        assert!(parsed.natives[0].optional);
        assert_eq!(parsed.natives[0].initializer.as_deref(), Some("Init"));
    }

    #[test]
    fn backslashes_in_source_are_doubled_and_restored() {
        let mut model = ModConfigModel::new();
        model.add_package("A", r"C:\Mods\A", true);
        let text = write_profile(&model);
        assert!(text.contains(r#"source = "C:\\Mods\\A""#));
        let parsed = parse_profile(&text).unwrap();
        assert_eq!(parsed.packages[0].source, r"C:\Mods\A");
    }
}
