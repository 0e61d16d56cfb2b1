//! The type-expression node model used by classification and re-qualification.
//!
//! Lifted declarations are transformed through an explicit tagged union of
//! node kinds rather than by mutating `syn` trees in place: conversion is one
//! pass, transformation is pure, and rendering happens only at emission.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use thiserror::Error;

/// Primitive names that are never re-qualified.
pub const PRIMITIVES: &[&str] = &[
    "bool", "char", "str", "String", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16",
    "i32", "i64", "i128", "isize", "f32", "f64",
];

/// Returns `true` when `name` is a built-in primitive type name.
#[must_use]
pub fn is_primitive(name: &str) -> bool {
    PRIMITIVES.contains(&name)
}

/// A type form digwire cannot lift into the generated module.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct UnsupportedType(pub String);

/// A type expression inside a provider declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A bare identifier reference, e.g. `Logger`.
    Ident(String),
    /// A path-qualified reference, e.g. `services::Logger`.
    Qualified {
        /// Path segments before the type name.
        qualifier: Vec<String>,
        /// The referenced type name.
        name: String,
    },
    /// A sequence type, `Vec<T>`.
    Sequence(Box<TypeExpr>),
    /// A map type, `HashMap<K, V>`.
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// An owning reference, `Arc<T>`.
    OwningRef(Box<TypeExpr>),
    /// A trait object, `dyn T`.
    TraitObject(Box<TypeExpr>),
    /// A function pointer, `fn(A, B) -> R`.
    Fn {
        /// Parameter types in order.
        params: Vec<TypeExpr>,
        /// Return type, if any.
        ret: Option<Box<TypeExpr>>,
    },
}

impl TypeExpr {
    /// Converts a parsed `syn` type into the node model.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedType`] for forms the generator cannot lift:
    /// references, tuples, generic user types, multi-bound trait objects and
    /// similar shapes.
    pub fn from_syn(ty: &syn::Type) -> Result<Self, UnsupportedType> {
        match ty {
            syn::Type::Path(type_path) => Self::from_path(type_path),
            syn::Type::TraitObject(object) => Self::from_trait_object(object),
            syn::Type::BareFn(bare_fn) => Self::from_bare_fn(bare_fn),
            syn::Type::Paren(inner) => Self::from_syn(&inner.elem),
            syn::Type::Group(inner) => Self::from_syn(&inner.elem),
            other => Err(UnsupportedType(format!(
                "type form '{}' is not supported",
                other.to_token_stream()
            ))),
        }
    }

    fn from_path(type_path: &syn::TypePath) -> Result<Self, UnsupportedType> {
        if type_path.qself.is_some() {
            return Err(UnsupportedType("qualified self types are not supported".to_owned()));
        }
        let path = &type_path.path;
        let last = path
            .segments
            .last()
            .ok_or_else(|| UnsupportedType("empty type path".to_owned()))?;

        if let syn::PathArguments::AngleBracketed(args) = &last.arguments {
            let inner = type_arguments(args)?;
            return match (last.ident.to_string().as_str(), inner.as_slice()) {
                ("Vec", [element]) => Ok(Self::Sequence(Box::new(element.clone()))),
                ("Arc", [target]) => Ok(Self::OwningRef(Box::new(target.clone()))),
                ("HashMap", [key, value]) => {
                    Ok(Self::Map(Box::new(key.clone()), Box::new(value.clone())))
                }
                _ => Err(UnsupportedType(format!(
                    "generic type '{}' is not supported",
                    path.to_token_stream()
                ))),
            };
        }

        if path
            .segments
            .iter()
            .any(|segment| !segment.arguments.is_none())
        {
            return Err(UnsupportedType(format!(
                "generic qualifier in '{}' is not supported",
                path.to_token_stream()
            )));
        }

        let mut segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        let name = segments
            .pop()
            .ok_or_else(|| UnsupportedType("empty type path".to_owned()))?;
        if segments.is_empty() {
            Ok(Self::Ident(name))
        } else {
            Ok(Self::Qualified {
                qualifier: segments,
                name,
            })
        }
    }

    fn from_trait_object(object: &syn::TypeTraitObject) -> Result<Self, UnsupportedType> {
        let mut traits = object.bounds.iter().filter_map(|bound| match bound {
            syn::TypeParamBound::Trait(bound) => Some(bound),
            _ => None,
        });
        let Some(first) = traits.next() else {
            return Err(UnsupportedType("trait object without a trait bound".to_owned()));
        };
        if traits.next().is_some() || object.bounds.len() != 1 {
            return Err(UnsupportedType(
                "multi-bound trait objects are not supported".to_owned(),
            ));
        }
        let inner = Self::from_path(&syn::TypePath {
            qself: None,
            path: first.path.clone(),
        })?;
        match inner {
            Self::Ident(_) | Self::Qualified { .. } => Ok(Self::TraitObject(Box::new(inner))),
            _ => Err(UnsupportedType("unsupported trait object bound".to_owned())),
        }
    }

    fn from_bare_fn(bare_fn: &syn::TypeBareFn) -> Result<Self, UnsupportedType> {
        if bare_fn.unsafety.is_some() || bare_fn.abi.is_some() || bare_fn.variadic.is_some() {
            return Err(UnsupportedType(
                "unsafe, extern or variadic function types are not supported".to_owned(),
            ));
        }
        let params = bare_fn
            .inputs
            .iter()
            .map(|arg| Self::from_syn(&arg.ty))
            .collect::<Result<Vec<_>, _>>()?;
        let ret = match &bare_fn.output {
            syn::ReturnType::Default => None,
            syn::ReturnType::Type(_, ty) => Some(Box::new(Self::from_syn(ty)?)),
        };
        Ok(Self::Fn { params, ret })
    }

    /// Returns `true` for sequence types, the only shape grouped fields may
    /// declare.
    #[must_use]
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }
}

fn type_arguments(
    args: &syn::AngleBracketedGenericArguments,
) -> Result<Vec<TypeExpr>, UnsupportedType> {
    args.args
        .iter()
        .map(|arg| match arg {
            syn::GenericArgument::Type(ty) => TypeExpr::from_syn(ty),
            other => Err(UnsupportedType(format!(
                "generic argument '{}' is not supported",
                other.to_token_stream()
            ))),
        })
        .collect()
}

impl ToTokens for TypeExpr {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let rendered = match self {
            Self::Ident(name) => {
                let ident = ident(name);
                quote!(#ident)
            }
            Self::Qualified { qualifier, name } => {
                let qualifier: Vec<_> = qualifier.iter().map(|s| ident(s)).collect();
                let name = ident(name);
                quote!(#(#qualifier)::*::#name)
            }
            Self::Sequence(element) => quote!(Vec<#element>),
            Self::Map(key, value) => quote!(std::collections::HashMap<#key, #value>),
            Self::OwningRef(target) => quote!(std::sync::Arc<#target>),
            Self::TraitObject(bound) => quote!(dyn #bound),
            Self::Fn { params, ret } => match ret {
                Some(ret) => quote!(fn(#(#params),*) -> #ret),
                None => quote!(fn(#(#params),*)),
            },
        };
        tokens.extend(rendered);
    }
}

fn ident(name: &str) -> proc_macro2::Ident {
    proc_macro2::Ident::new(name, proc_macro2::Span::call_site())
}

/// Returns the argument of `PhantomData<T>`, the return-marker wrapper.
///
/// The check is shallow: only the outermost path's final segment is
/// inspected, so fully-qualified forms like `std::marker::PhantomData<T>`
/// match too.
#[must_use]
pub fn phantom_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let last = type_path.path.segments.last()?;
    if last.ident != "PhantomData" {
        return None;
    }
    if let syn::PathArguments::AngleBracketed(args) = &last.arguments {
        return args.args.iter().find_map(|arg| match arg {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        });
    }
    None
}
