//! Parsing for `@digwire` doc-comment directives and field tags.
//!
//! Declarations opt into wiring with a doc line of the form
//! `@digwire outgroup:<g> tag:<t> name:<n>` (any subset, any order,
//! space-separated). Struct fields carry a comma-separated tag payload:
//! `@digwire ingroup:<g>,name:<n>` or the bare ignore marker `@digwire -`.

use thiserror::Error;

/// Marker that opts a declaration or field into wiring.
pub const MARKER: &str = "@digwire";

/// Reserved field name designating the provider's return value.
pub const RETURN_FIELD_NAME: &str = "digwire_return";

/// Output group used when a directive names none.
pub const DEFAULT_GROUP: &str = "default";

const KEY_OUT_GROUP: &str = "outgroup";
const KEY_IN_GROUP: &str = "ingroup";
const KEY_TAG: &str = "tag";
const KEY_NAME: &str = "name";
const IGNORE_ENTRY: &str = "-";

/// A malformed directive or field-tag payload.
///
/// The marker was present but the payload fails the grammar; the caller
/// attaches file and declaration context and aborts the run.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct DirectiveParseError(String);

/// Structured form of a declaration-level `@digwire` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Registration group the provider is emitted under.
    pub out_group: String,
    /// Build-tag filter, possibly `!`-prefixed.
    pub tag: Option<String>,
    /// Named-binding key for the provider's output.
    pub name: Option<String>,
}

impl Default for Directive {
    fn default() -> Self {
        Self {
            out_group: DEFAULT_GROUP.to_owned(),
            tag: None,
            name: None,
        }
    }
}

/// Classification payload attached to one struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTag {
    /// The field is excluded from the provider.
    Ignored,
    /// The field becomes a positional constructor parameter.
    Plain,
    /// The field is injected through the parameter capsule.
    Tagged {
        /// Group binding the field draws from.
        group: Option<String>,
        /// Named binding the field draws from.
        name: Option<String>,
    },
}

/// Joins the `#[doc = "..."]` attribute values of a declaration.
pub fn doc_text(attrs: &[syn::Attribute]) -> String {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(nv) = &attr.meta
            && let syn::Expr::Lit(lit) = &nv.value
            && let syn::Lit::Str(text) = &lit.lit
        {
            lines.push(text.value());
        }
    }
    lines.join("\n")
}

fn marker_payload(docs: &str) -> Option<&str> {
    docs.lines()
        .find_map(|line| line.split_once(MARKER).map(|(_, rest)| rest.trim()))
}

fn split_entry(entry: &str) -> Result<(&str, &str), DirectiveParseError> {
    let (key, value) = entry.split_once(':').ok_or_else(|| {
        DirectiveParseError(format!("malformed entry '{entry}': expected key:value"))
    })?;
    if value.is_empty() {
        return Err(DirectiveParseError(format!("entry '{key}' has an empty value")));
    }
    Ok((key, value))
}

/// Parses a declaration doc block into a [`Directive`].
///
/// Returns `Ok(None)` when the marker is absent: the declaration is simply
/// not a provider. Unknown keys with a well-formed `key:value` shape are
/// ignored for forward compatibility.
///
/// # Errors
///
/// Returns an error when the marker is present but a token fails the grammar.
pub fn parse_directive(docs: &str) -> Result<Option<Directive>, DirectiveParseError> {
    let Some(payload) = marker_payload(docs) else {
        return Ok(None);
    };
    let mut directive = Directive::default();
    for token in payload.split_whitespace() {
        let (key, value) = split_entry(token)?;
        match key {
            KEY_OUT_GROUP => directive.out_group = value.to_owned(),
            KEY_TAG => directive.tag = Some(value.to_owned()),
            KEY_NAME => directive.name = Some(value.to_owned()),
            _ => {}
        }
    }
    Ok(Some(directive))
}

/// Parses a field doc block into a [`FieldTag`].
///
/// No marker, or a marker whose entries are all unrecognised, yields
/// [`FieldTag::Plain`].
///
/// # Errors
///
/// Returns an error when the marker is present but an entry fails the
/// grammar.
pub fn parse_field_tag(docs: &str) -> Result<FieldTag, DirectiveParseError> {
    let Some(payload) = marker_payload(docs) else {
        return Ok(FieldTag::Plain);
    };
    let mut group = None;
    let mut name = None;
    for entry in payload.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if entry == IGNORE_ENTRY {
            return Ok(FieldTag::Ignored);
        }
        let (key, value) = split_entry(entry)?;
        match key {
            KEY_IN_GROUP => group = Some(value.to_owned()),
            KEY_NAME => name = Some(value.to_owned()),
            _ => {}
        }
    }
    if group.is_none() && name.is_none() {
        return Ok(FieldTag::Plain);
    }
    Ok(FieldTag::Tagged { group, name })
}
