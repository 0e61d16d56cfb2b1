//! Workspace discovery: module paths and the bulk cargo metadata query.
//!
//! Mapping scanned files onto Rust module paths needs the owning package's
//! crate ident, which can differ from its directory name. That lookup is
//! batched into a single `cargo metadata` invocation per run rather than a
//! per-file query.

use camino::{Utf8Path, Utf8PathBuf};
use cargo_metadata::MetadataCommand;

use crate::error::DigwireError;

/// A `::`-separated Rust module path, crate ident first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModulePath(String);

impl ModulePath {
    /// Builds a module path from its textual form, e.g. `app::services`.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Builds a module path from individual segments.
    pub fn from_segments<S: AsRef<str>>(segments: impl IntoIterator<Item = S>) -> Self {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join("::");
        Self(joined)
    }

    /// The path's segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split("::")
    }

    /// The path's declared short name: its final segment.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// The enclosing module path, or `None` at a crate root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rsplit_once("::").map(|(head, _)| Self(head.to_owned()))
    }

    /// Extends the path with one extra segment.
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        Self(format!("{}::{segment}", self.0))
    }

    /// The textual form of the path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModulePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One workspace package relevant to file-to-module mapping.
#[derive(Debug, Clone)]
pub struct PackageCrate {
    /// Crate ident (package name with hyphens folded to underscores).
    pub crate_ident: String,
    /// Directory containing the package manifest.
    pub root: Utf8PathBuf,
}

/// Run-scoped index mapping source files onto module paths.
#[derive(Debug, Clone)]
pub struct WorkspaceIndex {
    crates: Vec<PackageCrate>,
}

impl WorkspaceIndex {
    /// Builds the index from one bulk `cargo metadata` query.
    ///
    /// # Errors
    ///
    /// Returns an error when `cargo metadata` fails.
    pub fn from_cargo() -> Result<Self, DigwireError> {
        let mut command = MetadataCommand::new();
        command.no_deps();
        let metadata = command.exec()?;
        let crates = metadata
            .workspace_packages()
            .iter()
            .filter_map(|package| {
                package.manifest_path.parent().map(|root| PackageCrate {
                    crate_ident: package.name.replace('-', "_"),
                    root: root.to_path_buf(),
                })
            })
            .collect();
        Ok(Self::from_crates(crates))
    }

    /// Builds the index from an explicit package list.
    #[must_use]
    pub fn from_crates(mut crates: Vec<PackageCrate>) -> Self {
        // Longest root first, so nested packages shadow their parents.
        crates.sort_by(|a, b| {
            b.root
                .as_str()
                .len()
                .cmp(&a.root.as_str().len())
                .then_with(|| a.root.cmp(&b.root))
        });
        Self { crates }
    }

    /// Maps a source file onto its module path.
    ///
    /// The file need not exist; the mapping is pure path arithmetic, which
    /// lets the designated output file be mapped before it is written.
    ///
    /// # Errors
    ///
    /// Returns [`DigwireError::UnownedFile`] when no workspace package
    /// contains the file.
    pub fn module_path_of(&self, file: &Utf8Path) -> Result<ModulePath, DigwireError> {
        let owner = self
            .crates
            .iter()
            .find(|c| file.starts_with(&c.root))
            .ok_or_else(|| DigwireError::UnownedFile(file.to_path_buf()))?;
        let relative = file
            .strip_prefix(&owner.root)
            .map_err(|_| DigwireError::UnownedFile(file.to_path_buf()))?;

        let mut segments = vec![owner.crate_ident.clone()];
        let components: Vec<&str> = relative
            .components()
            .map(|component| component.as_str())
            .collect();
        for (position, component) in components.iter().enumerate() {
            if position == 0 && *component == "src" {
                continue;
            }
            if position + 1 == components.len() {
                match component.strip_suffix(".rs") {
                    Some("lib" | "main" | "mod") => {}
                    Some(stem) => segments.push(stem.to_owned()),
                    None => return Err(DigwireError::UnownedFile(file.to_path_buf())),
                }
            } else {
                segments.push((*component).to_owned());
            }
        }
        Ok(ModulePath::from_segments(segments))
    }

    /// The crate ident of the package owning `file`, if any.
    #[must_use]
    pub fn crate_ident_of(&self, file: &Utf8Path) -> Option<&str> {
        self.crates
            .iter()
            .find(|c| file.starts_with(&c.root))
            .map(|c| c.crate_ident.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn index() -> WorkspaceIndex {
        WorkspaceIndex::from_crates(vec![
            PackageCrate {
                crate_ident: "app".to_owned(),
                root: Utf8PathBuf::from("/ws/app"),
            },
            PackageCrate {
                crate_ident: "app_plugins".to_owned(),
                root: Utf8PathBuf::from("/ws/app/plugins"),
            },
        ])
    }

    #[rstest]
    #[case::crate_root("/ws/app/src/lib.rs", "app")]
    #[case::plain_module("/ws/app/src/services.rs", "app::services")]
    #[case::mod_rs("/ws/app/src/services/mod.rs", "app::services")]
    #[case::nested("/ws/app/src/services/grpc.rs", "app::services::grpc")]
    #[case::nested_package("/ws/app/plugins/src/auth.rs", "app_plugins::auth")]
    fn maps_files_to_module_paths(#[case] file: &str, #[case] expected: &str) {
        let mapped = index()
            .module_path_of(Utf8Path::new(file))
            .expect("file maps to a module");
        assert_eq!(mapped, ModulePath::new(expected));
    }

    #[test]
    fn rejects_files_outside_every_package() {
        let err = index().module_path_of(Utf8Path::new("/elsewhere/src/lib.rs"));
        assert!(matches!(err, Err(DigwireError::UnownedFile(_))));
    }

    #[rstest]
    #[case::nested("app::services::grpc", "grpc", Some("app::services"))]
    #[case::crate_root("app", "app", None)]
    fn short_name_and_parent(
        #[case] path: &str,
        #[case] short: &str,
        #[case] parent: Option<&str>,
    ) {
        let path = ModulePath::new(path);
        assert_eq!(path.short_name(), short);
        assert_eq!(path.parent(), parent.map(ModulePath::new));
    }
}
