//! Forwarder synthesis for annotated constructor functions.

use quote::{format_ident, quote};
use syn::parse_quote;

use crate::directive::Directive;
use crate::error::DigwireError;
use crate::resolve::{FileContext, Resolver};
use crate::transform::Synthesized;
use crate::type_expr::TypeExpr;

/// Synthesizes an alias-prefixed forwarder for one annotated function.
///
/// The forwarder repeats the original signature with every type
/// re-qualified for the output module and delegates positionally to the
/// original function.
///
/// # Errors
///
/// Receivers, generics, `async` and pattern parameters are rejected;
/// resolution failures propagate.
pub fn transform(
    func: &syn::ItemFn,
    directive: Directive,
    ctx: &FileContext,
    resolver: Resolver<'_>,
) -> Result<Synthesized, DigwireError> {
    let decl = func.sig.ident.to_string();
    let shape_error = |message: &str| DigwireError::TypeShape {
        path: ctx.file.clone(),
        decl: decl.clone(),
        message: message.to_owned(),
    };
    if !func.sig.generics.params.is_empty() {
        return Err(shape_error("generic constructors are not supported"));
    }
    if func.sig.asyncness.is_some() {
        return Err(shape_error("async constructors are not supported"));
    }
    if func.sig.variadic.is_some() {
        return Err(shape_error("variadic constructors are not supported"));
    }

    let mut params = Vec::new();
    let mut arg_names = Vec::new();
    for input in &func.sig.inputs {
        let syn::FnArg::Typed(arg) = input else {
            return Err(shape_error("constructors cannot take a receiver"));
        };
        let syn::Pat::Ident(pat) = arg.pat.as_ref() else {
            return Err(shape_error("constructor parameters must be plain identifiers"));
        };
        let ident = &pat.ident;
        let ty = requalify_type(&arg.ty, ctx, resolver, &shape_error)?;
        params.push(quote! { #ident: #ty });
        arg_names.push(quote! { #ident });
    }

    let output = match &func.sig.output {
        syn::ReturnType::Default => quote! {},
        syn::ReturnType::Type(_, ty) => {
            let ty = requalify_return(ty, ctx, resolver, &shape_error)?;
            quote! { -> #ty }
        }
    };

    let alias = resolver.aliases.alias(&ctx.module)?;
    let fn_ident = format_ident!("{}_{}", alias, decl);
    let callee_ident = &func.sig.ident;
    let callee = if &ctx.module == resolver.output_module {
        quote!(#callee_ident)
    } else {
        let alias = format_ident!("{}", alias);
        quote!(#alias::#callee_ident)
    };

    let item = parse_quote! {
        pub fn #fn_ident(#(#params),*) #output {
            #callee(#(#arg_names),*)
        }
    };
    Ok(Synthesized {
        fn_name: fn_ident.to_string(),
        items: vec![item],
        directive,
    })
}

fn requalify_type(
    ty: &syn::Type,
    ctx: &FileContext,
    resolver: Resolver<'_>,
    shape_error: &impl Fn(&str) -> DigwireError,
) -> Result<proc_macro2::TokenStream, DigwireError> {
    let expr = TypeExpr::from_syn(ty).map_err(|err| shape_error(&err.to_string()))?;
    let expr = resolver.requalify(&expr, ctx)?;
    Ok(quote! { #expr })
}

/// Return positions additionally admit a top-level `Result<..>`, whose
/// arguments are re-qualified individually.
fn requalify_return(
    ty: &syn::Type,
    ctx: &FileContext,
    resolver: Resolver<'_>,
    shape_error: &impl Fn(&str) -> DigwireError,
) -> Result<proc_macro2::TokenStream, DigwireError> {
    if let syn::Type::Path(path) = ty
        && let Some(last) = path.path.segments.last()
        && last.ident == "Result"
        && let syn::PathArguments::AngleBracketed(args) = &last.arguments
    {
        let mut rendered = Vec::new();
        for arg in &args.args {
            let syn::GenericArgument::Type(inner) = arg else {
                return Err(shape_error("unsupported Result arguments"));
            };
            rendered.push(requalify_type(inner, ctx, resolver, shape_error)?);
        }
        return Ok(quote! { Result<#(#rendered),*> });
    }
    requalify_type(ty, ctx, resolver, shape_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ModulePath, PackageCrate, WorkspaceIndex};
    use crate::resolve::{AliasTable, infrastructure_paths};
    use camino::{Utf8Path, Utf8PathBuf};
    use rstest::rstest;

    fn run(source: &str) -> Result<Synthesized, DigwireError> {
        let index = WorkspaceIndex::from_crates(vec![PackageCrate {
            crate_ident: "app".to_owned(),
            root: Utf8PathBuf::from("/ws/app"),
        }]);
        let ast = syn::parse_file(source).expect("source parses");
        let ctx = FileContext::scan(Utf8Path::new("/ws/app/src/services.rs"), &ast, &index)
            .expect("context builds");
        let mut paths = vec![ModulePath::new("app::services")];
        paths.extend(infrastructure_paths());
        let table = AliasTable::build(paths);
        let output = ModulePath::new("app::digwire_gen");
        let resolver = Resolver {
            aliases: &table,
            output_module: &output,
        };
        let func = ast
            .items
            .iter()
            .find_map(|item| match item {
                syn::Item::Fn(f) => Some(f.clone()),
                _ => None,
            })
            .expect("function present");
        transform(&func, Directive::default(), &ctx, resolver)
    }

    fn render(out: &Synthesized) -> String {
        let file = syn::File {
            shebang: None,
            attrs: Vec::new(),
            items: out.items.clone(),
        };
        prettyplease::unparse(&file)
    }

    #[test]
    fn forwarder_requalifies_and_delegates() {
        let out = run(
            "pub fn new_service(client: std::sync::Arc<GrpcClient>) -> Result<std::sync::Arc<Service>, digwire_runtime::Error> { todo!() }",
        )
        .expect("transforms");
        assert_eq!(out.fn_name, "services_new_service");
        let text = render(&out);
        assert!(text.contains("pub fn services_new_service("));
        assert!(text.contains("client: std::sync::Arc<services::GrpcClient>"));
        assert!(text.contains("Result<std::sync::Arc<services::Service>, digwire_runtime::Error>"));
        assert!(text.contains("services::new_service(client)"));
    }

    #[rstest]
    #[case::generic("pub fn build<T>(value: T) -> T { value }")]
    #[case::pattern("pub fn build((a, b): (u32, u32)) -> u32 { a + b }")]
    #[case::asyncness("pub async fn build() -> u32 { 0 }")]
    fn unsupported_signatures_are_rejected(#[case] source: &str) {
        assert!(matches!(
            run(source),
            Err(DigwireError::TypeShape { .. })
        ));
    }
}
