//! Field classification for annotated provider structs.

use crate::directive::{self, FieldTag, RETURN_FIELD_NAME};
use crate::error::DigwireError;
use crate::resolve::FileContext;
use crate::type_expr::{TypeExpr, phantom_inner};

/// One surviving struct field with its converted type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field identifier.
    pub name: String,
    /// Declared type in node form.
    pub ty: TypeExpr,
}

/// A field injected through the parameter capsule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedField {
    /// The underlying field.
    pub field: Field,
    /// Group binding the field draws from.
    pub group: Option<String>,
    /// Named binding the field draws from.
    pub name: Option<String>,
}

/// Classified fields of one provider struct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPlan {
    /// The designated extra return value, if declared.
    pub return_marker: Option<Field>,
    /// Positional constructor parameters.
    pub plain: Vec<Field>,
    /// Capsule members.
    pub tagged: Vec<TaggedField>,
}

/// Buckets a provider struct's fields.
///
/// Rule order, each short-circuiting: non-`pub` fields are dropped
/// regardless of tag; `-`-tagged fields are dropped; a field named
/// `digwire_return` becomes the return marker (its type must wrap an
/// `Arc<dyn Trait>` in `PhantomData`); untagged fields are plain positional
/// parameters; `ingroup`/`name` fields go into the capsule. A grouped field
/// must declare a sequence type.
///
/// # Errors
///
/// Fatal at declaration granularity: malformed field tags, multiple return
/// markers, non-sequence grouped fields and unsupported type shapes all
/// abort the run.
pub fn classify(strukt: &syn::ItemStruct, ctx: &FileContext) -> Result<FieldPlan, DigwireError> {
    let decl = strukt.ident.to_string();
    let syn::Fields::Named(fields) = &strukt.fields else {
        return Err(DigwireError::TypeShape {
            path: ctx.file.clone(),
            decl,
            message: "provider structs require named fields".to_owned(),
        });
    };

    let mut plan = FieldPlan::default();
    for field in &fields.named {
        let Some(ident) = &field.ident else { continue };
        let name = ident.to_string();
        if !matches!(field.vis, syn::Visibility::Public(_)) {
            continue;
        }

        let tag = directive::parse_field_tag(&directive::doc_text(&field.attrs)).map_err(
            |err| DigwireError::Directive {
                path: ctx.file.clone(),
                decl: decl.clone(),
                message: format!("field '{name}': {err}"),
            },
        )?;
        if tag == FieldTag::Ignored {
            continue;
        }

        if name == RETURN_FIELD_NAME {
            if plan.return_marker.is_some() {
                return Err(DigwireError::MultipleReturnMarkers {
                    path: ctx.file.clone(),
                    decl,
                });
            }
            let inner = phantom_inner(&field.ty).ok_or_else(|| DigwireError::TypeShape {
                path: ctx.file.clone(),
                decl: decl.clone(),
                message: format!("'{RETURN_FIELD_NAME}' must wrap its type in PhantomData"),
            })?;
            let ty = convert(inner, ctx, &decl)?;
            // The provider value is coerced into the declared return type, so
            // only `Arc<dyn Trait>` markers can produce compiling output.
            if !matches!(&ty, TypeExpr::OwningRef(inner) if matches!(**inner, TypeExpr::TraitObject(_)))
            {
                return Err(DigwireError::TypeShape {
                    path: ctx.file.clone(),
                    decl,
                    message: format!(
                        "'{RETURN_FIELD_NAME}' must wrap an Arc<dyn Trait> in PhantomData"
                    ),
                });
            }
            plan.return_marker = Some(Field { name, ty });
            continue;
        }

        let ty = convert(&field.ty, ctx, &decl)?;
        match tag {
            FieldTag::Plain => plan.plain.push(Field { name, ty }),
            FieldTag::Tagged { group, name: binding } => {
                if group.is_some() && !ty.is_sequence() {
                    return Err(DigwireError::GroupedFieldNotSequence {
                        path: ctx.file.clone(),
                        decl,
                        field: name,
                    });
                }
                plan.tagged.push(TaggedField {
                    field: Field { name, ty },
                    group,
                    name: binding,
                });
            }
            FieldTag::Ignored => {}
        }
    }
    Ok(plan)
}

fn convert(ty: &syn::Type, ctx: &FileContext, decl: &str) -> Result<TypeExpr, DigwireError> {
    TypeExpr::from_syn(ty).map_err(|err| DigwireError::TypeShape {
        path: ctx.file.clone(),
        decl: decl.to_owned(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PackageCrate, WorkspaceIndex};
    use camino::{Utf8Path, Utf8PathBuf};
    use syn::parse_quote;

    fn context() -> FileContext {
        let index = WorkspaceIndex::from_crates(vec![PackageCrate {
            crate_ident: "app".to_owned(),
            root: Utf8PathBuf::from("/ws/app"),
        }]);
        let ast = syn::parse_file("").expect("empty file");
        FileContext::scan(Utf8Path::new("/ws/app/src/services.rs"), &ast, &index)
            .expect("context builds")
    }

    #[test]
    fn buckets_fields_by_visibility_and_tag() {
        let strukt: syn::ItemStruct = parse_quote! {
            pub struct Service {
                /// @digwire ingroup:loggers
                pub logger: Vec<Logger>,
                config: String,
                /// @digwire -
                pub skipped: String,
                pub grpc_client: Arc<GrpcClient>,
                /// @digwire name:ab_grpc_client
                pub ab_grpc_client: Arc<GrpcClient>,
            }
        };
        let plan = classify(&strukt, &context()).expect("classifies");

        assert!(plan.return_marker.is_none());
        assert_eq!(plan.plain.len(), 1);
        assert_eq!(plan.plain[0].name, "grpc_client");
        assert_eq!(plan.tagged.len(), 2);
        assert_eq!(plan.tagged[0].group.as_deref(), Some("loggers"));
        assert_eq!(plan.tagged[1].name.as_deref(), Some("ab_grpc_client"));
    }

    #[test]
    fn return_marker_unwraps_phantom_data() {
        let strukt: syn::ItemStruct = parse_quote! {
            pub struct ControllerDemo {
                pub digwire_return: std::marker::PhantomData<Arc<dyn Controller>>,
                pub service: Arc<Service>,
            }
        };
        let plan = classify(&strukt, &context()).expect("classifies");
        let marker = plan.return_marker.expect("marker recorded");
        assert_eq!(
            marker.ty,
            TypeExpr::OwningRef(Box::new(TypeExpr::TraitObject(Box::new(TypeExpr::Ident(
                "Controller".to_owned()
            )))))
        );
    }

    #[test]
    fn non_phantom_return_marker_is_rejected() {
        let strukt: syn::ItemStruct = parse_quote! {
            pub struct Demo {
                pub digwire_return: Arc<dyn Controller>,
            }
        };
        assert!(matches!(
            classify(&strukt, &context()),
            Err(DigwireError::TypeShape { .. })
        ));
    }

    #[test]
    fn concrete_return_marker_is_rejected() {
        // Arc<Logger> cannot absorb an arbitrary provider value, so the
        // marker must name a trait object.
        let strukt: syn::ItemStruct = parse_quote! {
            pub struct ConsoleLogger {
                pub digwire_return: std::marker::PhantomData<Arc<Logger>>,
            }
        };
        assert!(matches!(
            classify(&strukt, &context()),
            Err(DigwireError::TypeShape { .. })
        ));
    }

    #[test]
    fn private_return_marker_is_just_dropped() {
        let strukt: syn::ItemStruct = parse_quote! {
            pub struct Demo {
                digwire_return: std::marker::PhantomData<u32>,
                pub value: u32,
            }
        };
        let plan = classify(&strukt, &context()).expect("classifies");
        assert!(plan.return_marker.is_none());
        assert_eq!(plan.plain.len(), 1);
    }

    #[test]
    fn grouped_field_must_be_a_sequence() {
        let strukt: syn::ItemStruct = parse_quote! {
            pub struct Demo {
                /// @digwire ingroup:loggers
                pub logger: Logger,
            }
        };
        assert!(matches!(
            classify(&strukt, &context()),
            Err(DigwireError::GroupedFieldNotSequence { .. })
        ));
    }

    #[test]
    fn tuple_structs_are_rejected() {
        let strukt: syn::ItemStruct = parse_quote! {
            pub struct Demo(pub u32);
        };
        assert!(matches!(
            classify(&strukt, &context()),
            Err(DigwireError::TypeShape { .. })
        ));
    }
}
