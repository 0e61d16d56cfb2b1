//! Pipeline orchestration: scan, classify, resolve, synthesize, render.

use std::collections::{BTreeMap, BTreeSet};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::classify;
use crate::directive::{self, Directive};
use crate::emit::{self, ProviderKey};
use crate::error::DigwireError;
use crate::metadata::{ModulePath, WorkspaceIndex};
use crate::output;
use crate::resolve::{AliasTable, FileContext, Resolver, collect_paths, infrastructure_paths};
use crate::transform::{Synthesized, functions, structs};
use crate::type_expr::TypeExpr;

enum AnnotatedItem {
    Struct(syn::ItemStruct),
    Fn(syn::ItemFn),
}

struct ScannedFile {
    ctx: FileContext,
    decls: Vec<(AnnotatedItem, Directive)>,
    init_structs: BTreeSet<String>,
}

/// Runs the whole pipeline over `files` and returns the rendered output
/// module.
///
/// Files are processed in input order; nothing is rendered unless every
/// file succeeds. The output file itself is never scanned.
///
/// # Errors
///
/// Any scan, classification, resolution or synthesis failure aborts the
/// run.
pub fn generate(
    index: &WorkspaceIndex,
    files: &[Utf8PathBuf],
    output_path: &Utf8Path,
    tag: Option<&str>,
) -> Result<String, DigwireError> {
    let output_module = index.module_path_of(output_path)?;

    let mut scanned = Vec::new();
    let mut paths: BTreeSet<ModulePath> = infrastructure_paths().into_iter().collect();
    for file in files {
        if file == output_path {
            continue;
        }
        if let Some(entry) = scan_file(file, index, tag, &mut paths)? {
            scanned.push(entry);
        }
    }

    let aliases = AliasTable::build(paths);
    let resolver = Resolver {
        aliases: &aliases,
        output_module: &output_module,
    };

    let mut synthesized: Vec<Synthesized> = Vec::new();
    let mut buckets: BTreeMap<ProviderKey, Vec<String>> = BTreeMap::new();
    for entry in &scanned {
        for (item, item_directive) in &entry.decls {
            let out = match item {
                AnnotatedItem::Struct(strukt) => {
                    let has_init = entry.init_structs.contains(&strukt.ident.to_string());
                    structs::transform(strukt, item_directive.clone(), &entry.ctx, resolver, has_init)?
                }
                AnnotatedItem::Fn(func) => {
                    functions::transform(func, item_directive.clone(), &entry.ctx, resolver)?
                }
            };
            let key = ProviderKey {
                group: out.directive.out_group.clone(),
                name: out.directive.name.clone().unwrap_or_default(),
            };
            buckets.entry(key).or_default().push(out.fn_name.clone());
            synthesized.push(out);
        }
    }
    debug!(
        providers = synthesized.len(),
        buckets = buckets.len(),
        "synthesis complete"
    );

    emit::render(&aliases, &output_module, &synthesized, &buckets)
}

/// Parses one file and records its annotated declarations and every module
/// path their types refer to.
fn scan_file(
    file: &Utf8Path,
    index: &WorkspaceIndex,
    tag: Option<&str>,
    paths: &mut BTreeSet<ModulePath>,
) -> Result<Option<ScannedFile>, DigwireError> {
    let source = output::read_source(file)?;
    let ast = syn::parse_file(&source).map_err(|source| DigwireError::Syntax {
        path: file.to_path_buf(),
        source,
    })?;
    let ctx = FileContext::scan(file, &ast, index)?;
    let init_structs = init_methods(&ast);

    let mut decls = Vec::new();
    for item in &ast.items {
        let (attrs, decl_name) = match item {
            syn::Item::Struct(strukt) => (&strukt.attrs, strukt.ident.to_string()),
            syn::Item::Fn(func) => (&func.attrs, func.sig.ident.to_string()),
            _ => continue,
        };
        let parsed = directive::parse_directive(&directive::doc_text(attrs)).map_err(|err| {
            DigwireError::Directive {
                path: file.to_path_buf(),
                decl: decl_name.clone(),
                message: err.to_string(),
            }
        })?;
        let Some(item_directive) = parsed else { continue };
        if !tag_allows(tag, item_directive.tag.as_deref()) {
            debug!(%file, decl = %decl_name, "skipped by tag filter");
            continue;
        }

        match item {
            syn::Item::Struct(strukt) => {
                let plan = classify::classify(strukt, &ctx)?;
                for field in plan
                    .plain
                    .iter()
                    .chain(plan.tagged.iter().map(|tagged| &tagged.field))
                    .chain(plan.return_marker.iter())
                {
                    collect_paths(&field.ty, &ctx, paths);
                }
                decls.push((AnnotatedItem::Struct(strukt.clone()), item_directive));
            }
            syn::Item::Fn(func) => {
                collect_fn_paths(func, &ctx, paths);
                decls.push((AnnotatedItem::Fn(func.clone()), item_directive));
            }
            _ => {}
        }
    }

    if decls.is_empty() {
        return Ok(None);
    }
    paths.insert(ctx.module.clone());
    paths.extend(ctx.referenced_paths().cloned());
    Ok(Some(ScannedFile {
        ctx,
        decls,
        init_structs,
    }))
}

/// Names of structs with an inherent `fn init(&mut self)` lifecycle method.
fn init_methods(ast: &syn::File) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for item in &ast.items {
        let syn::Item::Impl(imp) = item else { continue };
        if imp.trait_.is_some() {
            continue;
        }
        let syn::Type::Path(self_ty) = imp.self_ty.as_ref() else {
            continue;
        };
        let Some(last) = self_ty.path.segments.last() else {
            continue;
        };
        let has_init = imp.items.iter().any(|entry| {
            matches!(
                entry,
                syn::ImplItem::Fn(method)
                    if method.sig.ident == "init"
                        && method.sig.inputs.len() == 1
                        && matches!(method.sig.inputs.first(), Some(syn::FnArg::Receiver(_)))
            )
        });
        if has_init {
            names.insert(last.ident.to_string());
        }
    }
    names
}

/// Records the module paths a function signature's types refer to.
///
/// Shape errors are skipped; the transformer reports them with full
/// context.
fn collect_fn_paths(func: &syn::ItemFn, ctx: &FileContext, paths: &mut BTreeSet<ModulePath>) {
    let mut record = |ty: &syn::Type| {
        if let Ok(expr) = TypeExpr::from_syn(ty) {
            collect_paths(&expr, ctx, paths);
        }
    };
    for input in &func.sig.inputs {
        if let syn::FnArg::Typed(arg) = input {
            record(&arg.ty);
        }
    }
    if let syn::ReturnType::Type(_, ty) = &func.sig.output {
        if let syn::Type::Path(path) = ty.as_ref()
            && let Some(last) = path.path.segments.last()
            && last.ident == "Result"
            && let syn::PathArguments::AngleBracketed(args) = &last.arguments
        {
            for arg in &args.args {
                if let syn::GenericArgument::Type(inner) = arg {
                    record(inner);
                }
            }
        } else {
            record(ty);
        }
    }
}

/// Build-tag filter: `run` is the command-line filter, `decl` the
/// declaration's tag, either side optionally `!`-negated.
fn tag_allows(run: Option<&str>, decl: Option<&str>) -> bool {
    let decl = decl.unwrap_or_default();
    match run.unwrap_or_default() {
        "" => decl.is_empty() || decl.starts_with('!'),
        run => match run.strip_prefix('!') {
            Some(negated) => decl.is_empty() || decl != negated,
            None => decl.is_empty() || decl == run,
        },
    }
}
