//! Shared data types for the mod composition core: packages, natives,
//! load-order constraints and the scanner's classification tags.
//!
//! Kept as plain structs rather than `serde`-derived: these are purely
//! the in-memory model, separate from the on-disk representation that
//! lives in [`crate::writer`] and [`crate::registry`] instead.

/// Vendor-runtime DLLs that are never treated as mod natives, even when
/// found alongside real natives.
pub const EXCLUDED_NATIVE_DLLS: &[&str] = &["libzstd.dll", "oo2core_9_win64.dll"];

/// Sub-folder names that mark a directory as a content-package.
pub const CONTENT_FOLDER_NAMES: &[&str] = &["msg", "param", "chr", "script", "sfx", "map", "parts"];

/// Archive-format extensions that also mark a directory as a
/// content-package.
pub const CONTENT_ARCHIVE_EXTS: &[&str] = &["pak", "bnd", "bhd", "bdt", "zip"];

/// The single binary regulation file that, if present, marks a
/// directory as a content-package on its own.
pub const CONTENT_MARKER_FILE: &str = "regulation.bin";

pub const NRSC_DLL: &str = "nrsc.dll";
pub const NIGHTER_DLL: &str = "nighter.dll";

/// A load-order constraint: "this entry loads after/before `id`",
/// optionally non-fatal if `id` turns out to be absent at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    pub id: String,
    pub optional: bool,
}

impl DependencyRef {
    #[must_use]
    pub fn new(id: impl Into<String>, optional: bool) -> Self {
        Self {
            id: id.into(),
            optional,
        }
    }
}

/// A mod entry backed by a directory of game-content files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModPackage {
    pub id: String,
    /// Relative for internal packages, absolute for external ones.
    pub source: String,
    pub enabled: bool,
    pub is_external: bool,
    pub load_after: Vec<DependencyRef>,
    pub load_before: Vec<DependencyRef>,
}

impl ModPackage {
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>, enabled: bool) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            enabled,
            is_external: false,
            load_after: Vec::new(),
            load_before: Vec::new(),
        }
    }

    /// The identifier as shown in the UI: the bare id, plus an
    /// `" (external)"` suffix for out-of-tree packages.
    #[must_use]
    pub fn display_id(&self) -> String {
        if self.is_external {
            format!("{} (external)", self.id)
        } else {
            self.id.clone()
        }
    }
}

/// A mod entry backed by a dynamic library to be injected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEntry {
    /// Path under the mod directory for internal natives, absolute for
    /// external ones.
    pub path: String,
    pub enabled: bool,
    pub optional: bool,
    pub initializer: Option<String>,
    pub finalizer: Option<String>,
    pub load_after: Vec<DependencyRef>,
    pub load_before: Vec<DependencyRef>,
    pub is_external: bool,
    /// User-set preload hint, meaningful only for `nrsc.dll`: emits `load_early = true` and suppresses the
    /// auto-inserted `nighter.dll -> nrsc.dll` dependency.
    pub preload: bool,
}

impl NativeEntry {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            enabled: true,
            optional: false,
            initializer: None,
            finalizer: None,
            load_after: Vec::new(),
            load_before: Vec::new(),
            is_external: false,
            preload: false,
        }
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }

    #[must_use]
    pub fn is_nrsc(&self) -> bool {
        self.file_name().eq_ignore_ascii_case(NRSC_DLL)
    }

    #[must_use]
    pub fn is_nighter(&self) -> bool {
        self.file_name().eq_ignore_ascii_case(NIGHTER_DLL)
    }

    #[must_use]
    pub fn display_path(&self) -> String {
        if self.is_external {
            format!("{} (external)", self.file_name())
        } else {
            self.path.clone()
        }
    }
}

/// Per-entry classification tag produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModKind {
    ContentPackage,
    NativeLibrary,
    Mixed,
    Unknown,
}

impl ModKind {
    #[must_use]
    pub fn is_package_like(self) -> bool {
        matches!(self, ModKind::ContentPackage | ModKind::Mixed)
    }

    #[must_use]
    pub fn is_native_like(self) -> bool {
        matches!(self, ModKind::NativeLibrary | ModKind::Mixed)
    }
}

/// Strips the `" (external)"` UI suffix a caller may have passed
/// through before matching against stored ids. Idempotent on ids that
/// never had the suffix.
#[must_use]
pub fn strip_external_suffix(id: &str) -> &str {
    id.strip_suffix(" (external)").unwrap_or(id)
}
