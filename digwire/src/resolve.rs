//! Import resolution: canonical aliases and type re-qualification.
//!
//! Declarations are lifted out of their originating module into the one
//! generated output module, so every type reference inside them must be
//! rewritten to stay valid in its new location. Each module path referenced
//! anywhere in the run receives exactly one canonical alias; per-file alias
//! maps translate what an identifier meant locally into that canonical form.

use std::collections::{BTreeMap, BTreeSet};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::DigwireError;
use crate::metadata::{ModulePath, WorkspaceIndex};
use crate::type_expr::{TypeExpr, is_primitive};

/// Module path of the runtime support crate generated code registers through.
pub const RUNTIME_MODULE: &str = "digwire_runtime";

/// Module path of the DI container crate providing the capsule marker.
pub const CONTAINER_MODULE: &str = "digwire_container";

/// Run-scoped mapping from module path to its globally unique alias.
///
/// Injective by construction: aliases are allocated over lexically sorted
/// paths, so the same input set always produces the same table.
#[derive(Debug, Clone)]
pub struct AliasTable {
    by_path: BTreeMap<ModulePath, String>,
}

impl AliasTable {
    /// Allocates aliases for every path in `paths`.
    ///
    /// Each path's short name is tried first; on collision a numeric suffix
    /// (`_2`, `_3`, ...) is appended until free.
    pub fn build(paths: impl IntoIterator<Item = ModulePath>) -> Self {
        let sorted: BTreeSet<ModulePath> = paths.into_iter().collect();
        let mut used: BTreeSet<String> = BTreeSet::new();
        let mut by_path = BTreeMap::new();
        for path in sorted {
            let base = path.short_name().to_owned();
            let mut candidate = base.clone();
            let mut attempt = 2usize;
            while used.contains(&candidate) {
                candidate = format!("{base}_{attempt}");
                attempt += 1;
            }
            used.insert(candidate.clone());
            by_path.insert(path, candidate);
        }
        Self { by_path }
    }

    /// Looks up the canonical alias for `path`.
    ///
    /// # Errors
    ///
    /// A missing path means discovery failed to record a dependency, an
    /// internal invariant violation that aborts the run.
    pub fn alias(&self, path: &ModulePath) -> Result<&str, DigwireError> {
        self.by_path
            .get(path)
            .map(String::as_str)
            .ok_or_else(|| DigwireError::Resolution(path.clone()))
    }

    /// All entries in lexical path order.
    pub fn entries(&self) -> impl Iterator<Item = (&ModulePath, &str)> {
        self.by_path.iter().map(|(path, alias)| (path, alias.as_str()))
    }
}

/// A type imported by name through a `use` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeImport {
    /// Module the type lives in.
    pub home: ModulePath,
    /// The type's name in its home module (imports may rename it locally).
    pub name: String,
}

/// Per-file alias context built from a file's `use` declarations.
///
/// The same alias string may denote different module paths in different
/// files; re-qualification always goes through the origin file's context.
#[derive(Debug, Clone)]
pub struct FileContext {
    /// Path of the scanned file.
    pub file: Utf8PathBuf,
    /// Module path the file declares.
    pub module: ModulePath,
    crate_ident: String,
    module_aliases: BTreeMap<String, ModulePath>,
    type_imports: BTreeMap<String, TypeImport>,
}

impl FileContext {
    /// Builds the context for one parsed file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file does not belong to a workspace package.
    pub fn scan(
        file: &Utf8Path,
        ast: &syn::File,
        index: &WorkspaceIndex,
    ) -> Result<Self, DigwireError> {
        let module = index.module_path_of(file)?;
        let crate_ident = module
            .segments()
            .next()
            .unwrap_or_default()
            .to_owned();
        let mut ctx = Self {
            file: file.to_path_buf(),
            module,
            crate_ident,
            module_aliases: BTreeMap::new(),
            type_imports: BTreeMap::new(),
        };
        for item in &ast.items {
            if let syn::Item::Use(item_use) = item {
                ctx.record_use_tree(&item_use.tree, &mut Vec::new());
            }
        }
        Ok(ctx)
    }

    fn record_use_tree(&mut self, tree: &syn::UseTree, prefix: &mut Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.record_use_tree(&path.tree, prefix);
                prefix.pop();
            }
            syn::UseTree::Name(name) => {
                self.record_import(prefix, &name.ident.to_string(), None);
            }
            syn::UseTree::Rename(rename) => {
                self.record_import(
                    prefix,
                    &rename.ident.to_string(),
                    Some(rename.rename.to_string()),
                );
            }
            syn::UseTree::Group(group) => {
                for entry in &group.items {
                    self.record_use_tree(entry, prefix);
                }
            }
            // Globs cannot be translated into canonical aliases; unqualified
            // references they satisfy fall under the origin-module rule.
            syn::UseTree::Glob(_) => {}
        }
    }

    fn record_import(&mut self, prefix: &[String], ident: &str, rename: Option<String>) {
        if ident == "self" {
            if let Some(alias) = rename.or_else(|| prefix.last().cloned()) {
                self.module_aliases.insert(alias, self.normalize(prefix));
            }
            return;
        }
        let local = rename.unwrap_or_else(|| ident.to_owned());
        if ident.starts_with(char::is_uppercase) {
            self.type_imports.insert(
                local,
                TypeImport {
                    home: self.normalize(prefix),
                    name: ident.to_owned(),
                },
            );
        } else {
            let mut full: Vec<String> = prefix.to_vec();
            full.push(ident.to_owned());
            let target = self.normalize(&full);
            self.module_aliases.insert(local, target);
        }
    }

    /// Normalises path segments against this file, resolving the `crate`,
    /// `self` and `super` prefixes.
    fn normalize(&self, segments: &[String]) -> ModulePath {
        let mut rest = segments.iter();
        let mut resolved: Vec<String> = match segments.first().map(String::as_str) {
            Some("crate") => {
                rest.next();
                vec![self.crate_ident.clone()]
            }
            Some("self") => {
                rest.next();
                self.module.segments().map(str::to_owned).collect()
            }
            Some("super") => self.module.segments().map(str::to_owned).collect(),
            _ => return ModulePath::from_segments(segments.iter().map(String::as_str)),
        };
        for segment in rest {
            if segment == "super" && resolved.len() > 1 {
                resolved.pop();
            } else {
                resolved.push(segment.clone());
            }
        }
        ModulePath::from_segments(resolved)
    }

    /// Resolves a qualified reference's path segments to the module they
    /// denote in this file.
    #[must_use]
    pub fn resolve_qualifier(&self, segments: &[String]) -> ModulePath {
        match segments.first().map(String::as_str) {
            Some("crate" | "self" | "super") => self.normalize(segments),
            Some(first) => self.module_aliases.get(first).map_or_else(
                || ModulePath::from_segments(segments.iter().map(String::as_str)),
                |target| {
                    segments
                        .iter()
                        .skip(1)
                        .fold(target.clone(), |path, segment| path.join(segment))
                },
            ),
            None => self.module.clone(),
        }
    }

    /// The named-type import recorded for `name`, if any.
    #[must_use]
    pub fn type_import(&self, name: &str) -> Option<&TypeImport> {
        self.type_imports.get(name)
    }

    /// Module paths this file's `use` declarations refer to.
    pub fn referenced_paths(&self) -> impl Iterator<Item = &ModulePath> {
        self.module_aliases
            .values()
            .chain(self.type_imports.values().map(|import| &import.home))
    }
}

/// Records every module path a type expression refers to, resolved against
/// its origin file.
pub fn collect_paths(ty: &TypeExpr, ctx: &FileContext, out: &mut BTreeSet<ModulePath>) {
    match ty {
        TypeExpr::Ident(name) => {
            if is_primitive(name) {
                return;
            }
            match ctx.type_import(name) {
                Some(import) => {
                    out.insert(import.home.clone());
                }
                None => {
                    out.insert(ctx.module.clone());
                }
            }
        }
        TypeExpr::Qualified { qualifier, name: _ } => {
            out.insert(ctx.resolve_qualifier(qualifier));
        }
        TypeExpr::Sequence(inner) | TypeExpr::OwningRef(inner) | TypeExpr::TraitObject(inner) => {
            collect_paths(inner, ctx, out);
        }
        TypeExpr::Map(key, value) => {
            collect_paths(key, ctx, out);
            collect_paths(value, ctx, out);
        }
        TypeExpr::Fn { params, ret } => {
            for param in params {
                collect_paths(param, ctx, out);
            }
            if let Some(ret) = ret {
                collect_paths(ret, ctx, out);
            }
        }
    }
}

/// Re-qualifies type expressions for relocation into the output module.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    /// Canonical alias table for the run.
    pub aliases: &'a AliasTable,
    /// Module path of the generated output file.
    pub output_module: &'a ModulePath,
}

impl Resolver<'_> {
    /// Rewrites every named-type reference in `ty` so it stays valid inside
    /// the output module.
    ///
    /// # Errors
    ///
    /// Returns [`DigwireError::Resolution`] when a referenced module path is
    /// missing from the canonical table.
    pub fn requalify(&self, ty: &TypeExpr, ctx: &FileContext) -> Result<TypeExpr, DigwireError> {
        match ty {
            TypeExpr::Ident(name) => {
                if is_primitive(name) {
                    return Ok(ty.clone());
                }
                match ctx.type_import(name) {
                    Some(import) => self.requalify_named(&import.home, &import.name),
                    None => self.requalify_named(&ctx.module, name),
                }
            }
            TypeExpr::Qualified { qualifier, name } => {
                let home = ctx.resolve_qualifier(qualifier);
                self.requalify_named(&home, name)
            }
            TypeExpr::Sequence(inner) => Ok(TypeExpr::Sequence(Box::new(
                self.requalify(inner, ctx)?,
            ))),
            TypeExpr::OwningRef(inner) => Ok(TypeExpr::OwningRef(Box::new(
                self.requalify(inner, ctx)?,
            ))),
            TypeExpr::TraitObject(inner) => Ok(TypeExpr::TraitObject(Box::new(
                self.requalify(inner, ctx)?,
            ))),
            TypeExpr::Map(key, value) => Ok(TypeExpr::Map(
                Box::new(self.requalify(key, ctx)?),
                Box::new(self.requalify(value, ctx)?),
            )),
            TypeExpr::Fn { params, ret } => {
                let params = params
                    .iter()
                    .map(|param| self.requalify(param, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = match ret {
                    Some(ret) => Some(Box::new(self.requalify(ret, ctx)?)),
                    None => None,
                };
                Ok(TypeExpr::Fn { params, ret })
            }
        }
    }

    /// Renders a reference to `name` living in `home` as seen from the
    /// output module.
    pub fn requalify_named(
        &self,
        home: &ModulePath,
        name: &str,
    ) -> Result<TypeExpr, DigwireError> {
        if home == self.output_module {
            return Ok(TypeExpr::Ident(name.to_owned()));
        }
        let alias = self.aliases.alias(home)?;
        Ok(TypeExpr::Qualified {
            qualifier: vec![alias.to_owned()],
            name: name.to_owned(),
        })
    }
}

/// The two infrastructure paths every run depends on.
#[must_use]
pub fn infrastructure_paths() -> [ModulePath; 2] {
    [
        ModulePath::new(RUNTIME_MODULE),
        ModulePath::new(CONTAINER_MODULE),
    ]
}
