//! Rendering of the generated output module.

use std::collections::BTreeMap;

use quote::{format_ident, quote};
use syn::parse_quote;

use crate::directive::DEFAULT_GROUP;
use crate::error::DigwireError;
use crate::metadata::ModulePath;
use crate::resolve::{AliasTable, RUNTIME_MODULE};
use crate::transform::Synthesized;

/// Registration bucket key: every provider with the same group and name
/// binding is registered through one `must_provide` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProviderKey {
    /// Registration group, `default` for untagged providers.
    pub group: String,
    /// Named binding, empty when absent.
    pub name: String,
}

const HEADER: &str = "\
//! Wiring generated by digwire. Do not edit by hand.
#![allow(unused_imports)]
";

/// Renders the complete output module.
///
/// Layout: generated-file header, canonical import block, synthesized
/// declarations in scan order, one load-time registration function.
///
/// # Errors
///
/// Returns [`DigwireError::Resolution`] when the runtime module is missing
/// from the alias table.
pub fn render(
    aliases: &AliasTable,
    output_module: &ModulePath,
    synthesized: &[Synthesized],
    buckets: &BTreeMap<ProviderKey, Vec<String>>,
) -> Result<String, DigwireError> {
    let mut file: syn::File = match syn::parse_file(HEADER) {
        Ok(file) => file,
        Err(source) => {
            return Err(DigwireError::Syntax {
                path: output_module.as_str().into(),
                source,
            });
        }
    };

    let output_crate = output_module.segments().next().unwrap_or_default();
    for (path, alias) in aliases.entries() {
        if path == output_module {
            continue;
        }
        let alias = format_ident!("{}", alias);
        let mut segments = path.segments();
        let head = segments.next().unwrap_or_default();
        // Modules of the output file's own crate are only reachable through
        // the `crate` keyword; the bare crate name is not in scope there.
        let item: syn::Item = if head == output_crate {
            let rest: Vec<_> = segments.map(|segment| format_ident!("{}", segment)).collect();
            if rest.is_empty() {
                parse_quote! { use crate as #alias; }
            } else {
                parse_quote! { use crate::#(#rest)::* as #alias; }
            }
        } else {
            let segments = path.segments().map(|segment| format_ident!("{}", segment));
            parse_quote! { use #(#segments)::* as #alias; }
        };
        file.items.push(item);
    }

    for decl in synthesized {
        file.items.extend(decl.items.iter().cloned());
    }
    file.items.push(registration_fn(aliases, buckets)?);

    Ok(prettyplease::unparse(&file))
}

/// One `#[ctor]` function registering every bucket at module load.
fn registration_fn(
    aliases: &AliasTable,
    buckets: &BTreeMap<ProviderKey, Vec<String>>,
) -> Result<syn::Item, DigwireError> {
    let runtime = format_ident!("{}", aliases.alias(&ModulePath::new(RUNTIME_MODULE))?);

    let calls = buckets.iter().map(|(key, fn_names)| {
        let fns = fn_names.iter().map(|name| format_ident!("{}", name));
        let mut options = Vec::new();
        if key.group != DEFAULT_GROUP {
            let group = &key.group;
            options.push(quote! { #runtime::group(#group) });
        }
        if !key.name.is_empty() {
            let name = &key.name;
            options.push(quote! { #runtime::name(#name) });
        }
        quote! {
            #runtime::must_provide(#runtime::providers![#(#fns),*], vec![#(#options),*]);
        }
    });

    Ok(parse_quote! {
        #[#runtime::ctor]
        fn digwire_register() {
            #(#calls)*
        }
    })
}
