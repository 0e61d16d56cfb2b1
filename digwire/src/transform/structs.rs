//! Provider synthesis for annotated structs.

use heck::{ToSnakeCase, ToUpperCamelCase};
use quote::{format_ident, quote};
use syn::parse_quote;

use crate::classify::{self, FieldPlan};
use crate::directive::Directive;
use crate::error::DigwireError;
use crate::metadata::ModulePath;
use crate::resolve::{CONTAINER_MODULE, FileContext, RUNTIME_MODULE, Resolver};
use crate::transform::Synthesized;
use crate::type_expr::TypeExpr;

/// Synthesizes the provider function (and capsule, when tagged fields exist)
/// for one annotated struct.
///
/// # Errors
///
/// Rejects generic structs and propagates classification and resolution
/// failures.
pub fn transform(
    strukt: &syn::ItemStruct,
    directive: Directive,
    ctx: &FileContext,
    resolver: Resolver<'_>,
    has_init: bool,
) -> Result<Synthesized, DigwireError> {
    if !strukt.generics.params.is_empty() {
        return Err(DigwireError::TypeShape {
            path: ctx.file.clone(),
            decl: strukt.ident.to_string(),
            message: "generic providers are not supported".to_owned(),
        });
    }
    let plan = classify::classify(strukt, ctx)?;

    let alias = resolver.aliases.alias(&ctx.module)?;
    let struct_name = strukt.ident.to_string();
    let fn_ident = format_ident!("new_{}_{}", alias, struct_name.to_snake_case());
    let runtime_alias = format_ident!(
        "{}",
        resolver.aliases.alias(&ModulePath::new(RUNTIME_MODULE))?
    );

    let ret = match &plan.return_marker {
        Some(marker) => resolver.requalify(&marker.ty, ctx)?,
        None => TypeExpr::OwningRef(Box::new(
            resolver.requalify_named(&ctx.module, &struct_name)?,
        )),
    };

    let mut params = Vec::new();
    let mut field_inits = Vec::new();
    for field in &plan.plain {
        let ident = format_ident!("{}", field.name);
        let ty = resolver.requalify(&field.ty, ctx)?;
        params.push(quote! { #ident: #ty });
        field_inits.push(quote! { #ident, });
    }

    let mut items = Vec::new();
    if !plan.tagged.is_empty() {
        let capsule_ident = format_ident!(
            "{}Deps",
            format!("{alias}_{struct_name}").to_upper_camel_case(),
        );
        let capsule = synthesize_capsule(&capsule_ident, &plan, ctx, resolver)?;
        items.push(capsule);
        params.push(quote! { deps: #capsule_ident });
        for tagged in &plan.tagged {
            let ident = format_ident!("{}", tagged.field.name);
            field_inits.push(quote! { #ident: deps.#ident, });
        }
    }
    if let Some(marker) = &plan.return_marker {
        let ident = format_ident!("{}", marker.name);
        field_inits.push(quote! { #ident: Default::default(), });
    }

    let ctor_path = constructed_path(&struct_name, ctx, resolver);
    let mutability = has_init.then(|| quote!(mut));
    let init_call = has_init.then(|| quote!(value.init()?;));
    items.push(parse_quote! {
        pub fn #fn_ident(#(#params),*) -> Result<#ret, #runtime_alias::Error> {
            let #mutability value = #ctor_path {
                #(#field_inits)*
            };
            #init_call
            Ok(std::sync::Arc::new(value))
        }
    });

    Ok(Synthesized {
        fn_name: fn_ident.to_string(),
        items,
        directive,
    })
}

fn synthesize_capsule(
    capsule_ident: &proc_macro2::Ident,
    plan: &FieldPlan,
    ctx: &FileContext,
    resolver: Resolver<'_>,
) -> Result<syn::Item, DigwireError> {
    let container_alias = format_ident!(
        "{}",
        resolver.aliases.alias(&ModulePath::new(CONTAINER_MODULE))?
    );
    let mut fields = Vec::new();
    for tagged in &plan.tagged {
        let ident = format_ident!("{}", tagged.field.name);
        let ty = resolver.requalify(&tagged.field.ty, ctx)?;
        let attr = deps_attribute(tagged.group.as_deref(), tagged.name.as_deref());
        fields.push(quote! { #attr pub #ident: #ty });
    }
    Ok(parse_quote! {
        #[derive(#container_alias::Deps)]
        pub struct #capsule_ident {
            #(#fields),*
        }
    })
}

fn deps_attribute(group: Option<&str>, name: Option<&str>) -> Option<syn::Attribute> {
    match (group, name) {
        (Some(group), Some(name)) => Some(parse_quote!(#[deps(group = #group, name = #name)])),
        (Some(group), None) => Some(parse_quote!(#[deps(group = #group)])),
        (None, Some(name)) => Some(parse_quote!(#[deps(name = #name)])),
        (None, None) => None,
    }
}

fn constructed_path(
    struct_name: &str,
    ctx: &FileContext,
    resolver: Resolver<'_>,
) -> proc_macro2::TokenStream {
    let ident = format_ident!("{}", struct_name);
    if &ctx.module == resolver.output_module {
        return quote!(#ident);
    }
    match resolver.aliases.alias(&ctx.module) {
        Ok(alias) => {
            let alias = format_ident!("{}", alias);
            quote!(#alias::#ident)
        }
        // Unreachable once the alias lookup in `transform` has succeeded.
        Err(_) => quote!(#ident),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PackageCrate, WorkspaceIndex};
    use crate::resolve::{AliasTable, infrastructure_paths};
    use camino::{Utf8Path, Utf8PathBuf};
    use rstest::rstest;

    fn context(source: &str) -> FileContext {
        let index = WorkspaceIndex::from_crates(vec![PackageCrate {
            crate_ident: "app".to_owned(),
            root: Utf8PathBuf::from("/ws/app"),
        }]);
        let ast = syn::parse_file(source).expect("source parses");
        FileContext::scan(Utf8Path::new("/ws/app/src/services.rs"), &ast, &index)
            .expect("context builds")
    }

    fn aliases() -> AliasTable {
        let mut paths = vec![ModulePath::new("app::services")];
        paths.extend(infrastructure_paths());
        AliasTable::build(paths)
    }

    fn render(items: &[syn::Item]) -> String {
        let file = syn::File {
            shebang: None,
            attrs: Vec::new(),
            items: items.to_vec(),
        };
        prettyplease::unparse(&file)
    }

    fn run(source: &str, has_init: bool) -> Synthesized {
        let ctx = context(source);
        let table = aliases();
        let output = ModulePath::new("app::digwire_gen");
        let resolver = Resolver {
            aliases: &table,
            output_module: &output,
        };
        let ast = syn::parse_file(source).expect("source parses");
        let strukt = ast
            .items
            .iter()
            .find_map(|item| match item {
                syn::Item::Struct(s) => Some(s.clone()),
                _ => None,
            })
            .expect("struct present");
        transform(&strukt, Directive::default(), &ctx, resolver, has_init)
            .expect("transforms")
    }

    #[test]
    fn plain_struct_becomes_qualified_constructor() {
        let out = run(
            "pub struct Service {\n                pub client: std::sync::Arc<GrpcClient>,\n            }",
            false,
        );
        assert_eq!(out.fn_name, "new_services_service");
        let text = render(&out.items);
        assert!(text.contains("pub fn new_services_service("));
        assert!(text.contains("client: std::sync::Arc<services::GrpcClient>"));
        assert!(text.contains("Result<std::sync::Arc<services::Service>, digwire_runtime::Error>"));
        assert!(text.contains("let value = services::Service { client };"));
        assert!(text.contains("Ok(std::sync::Arc::new(value))"));
    }

    #[test]
    fn tagged_fields_move_into_a_derived_capsule() {
        let out = run(
            "pub struct Service {\n                /// @digwire ingroup:loggers\n                pub loggers: Vec<std::sync::Arc<Logger>>,\n                /// @digwire name:ab_client\n                pub ab_client: std::sync::Arc<GrpcClient>,\n            }",
            false,
        );
        let text = render(&out.items);
        assert!(text.contains("#[derive(digwire_container::Deps)]"));
        assert!(text.contains("pub struct ServicesServiceDeps"));
        assert!(text.contains("#[deps(group = \"loggers\")]"));
        assert!(text.contains("#[deps(name = \"ab_client\")]"));
        assert!(text.contains("deps: ServicesServiceDeps"));
        assert!(text.contains("loggers: deps.loggers,"));
        assert!(text.contains("ab_client: deps.ab_client,"));
    }

    #[test]
    fn lifecycle_call_runs_before_the_return() {
        let out = run(
            "pub struct Service {\n                pub port: u16,\n            }",
            true,
        );
        let text = render(&out.items);
        assert!(text.contains("let mut value"));
        let init = text.find("value.init()?;").expect("init spliced");
        let ret = text.find("Ok(std::sync::Arc::new(value))").expect("return");
        assert!(init < ret);
    }

    #[test]
    fn return_marker_overrides_the_return_type() {
        let out = run(
            "pub struct ControllerDemo {\n                pub digwire_return: std::marker::PhantomData<std::sync::Arc<dyn Controller>>,\n                pub port: u16,\n            }",
            false,
        );
        let text = render(&out.items);
        assert!(text.contains(
            "Result<std::sync::Arc<dyn services::Controller>, digwire_runtime::Error>"
        ));
        assert!(text.contains("digwire_return: Default::default(),"));
    }

    #[test]
    fn mixed_struct_collapses_to_two_parameters() {
        let out = run(
            "pub struct Service {\n                pub grpc_client: std::sync::Arc<GrpcClient>,\n                /// @digwire ingroup:loggers\n                pub loggers: Vec<Logger>,\n                /// @digwire name:ab_grpc_client\n                pub ab_grpc_client: std::sync::Arc<GrpcClient>,\n                /// @digwire -\n                pub scratch: String,\n                secret: String,\n            }",
            false,
        );
        let syn::Item::Fn(func) = out.items.last().expect("provider fn") else {
            panic!("provider fn expected");
        };
        assert_eq!(func.sig.inputs.len(), 2);
        let text = render(&out.items);
        assert!(text.contains("grpc_client: std::sync::Arc<services::GrpcClient>"));
        assert!(text.contains("deps: ServicesServiceDeps"));
        assert!(!text.contains("scratch"));
        assert!(!text.contains("secret"));
    }

    #[rstest]
    #[case("pub struct Demo<T> { pub value: T }")]
    #[case("pub struct Demo<'a> { pub value: &'a str }")]
    fn generic_structs_are_rejected(#[case] source: &str) {
        let ctx = context(source);
        let table = aliases();
        let output = ModulePath::new("app::digwire_gen");
        let resolver = Resolver {
            aliases: &table,
            output_module: &output,
        };
        let ast = syn::parse_file(source).expect("source parses");
        let syn::Item::Struct(strukt) = &ast.items[0] else {
            panic!("struct expected");
        };
        assert!(matches!(
            transform(strukt, Directive::default(), &ctx, resolver, false),
            Err(DigwireError::TypeShape { .. })
        ));
    }
}
