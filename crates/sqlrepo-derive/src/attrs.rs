//! `#[orm(...)]` attribute parsing shared by all derives.

use syn::{Data, DeriveInput, Fields, Result};

/// How a field is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldRole {
    Writable,
    Key,
    ExplicitKey,
    Computed,
    Skip,
}

/// Parsed field-level attributes.
pub(crate) struct FieldAttr {
    pub role: FieldRole,
    pub column: Option<String>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut role = FieldRole::Writable;
        let mut column = None;

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let marker = match ident.to_string().as_str() {
                "key" => Some(FieldRole::Key),
                "explicit_key" => Some(FieldRole::ExplicitKey),
                "computed" => Some(FieldRole::Computed),
                "skip" => Some(FieldRole::Skip),
                "column" => {
                    let _: syn::Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    column = Some(value.value());
                    None
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        &ident,
                        format!(
                            "unknown orm attribute `{other}` (expected key, explicit_key, computed, skip or column = \"...\")"
                        ),
                    ));
                }
            };
            if let Some(marker) = marker {
                if role != FieldRole::Writable && role != marker {
                    return Err(syn::Error::new_spanned(
                        &ident,
                        "key, explicit_key, computed and skip are mutually exclusive",
                    ));
                }
                role = marker;
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(FieldAttr { role, column })
    }
}

/// A named struct field with its resolved mapping.
pub(crate) struct MappedField<'a> {
    pub ident: &'a syn::Ident,
    pub ty: &'a syn::Type,
    pub column: String,
    pub role: FieldRole,
}

/// Parse every named field of a struct.
pub(crate) fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<Vec<MappedField<'a>>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    format!("{derive} can only be derived for structs with named fields"),
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs"),
            ));
        }
    };

    let mut mapped = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let mut attr = FieldAttr {
            role: FieldRole::Writable,
            column: None,
        };
        for a in field.attrs.iter().filter(|a| a.path().is_ident("orm")) {
            let parsed: FieldAttr = a.parse_args()?;
            if parsed.role != FieldRole::Writable {
                attr.role = parsed.role;
            }
            if parsed.column.is_some() {
                attr.column = parsed.column;
            }
        }
        mapped.push(MappedField {
            ident,
            ty: &field.ty,
            column: attr.column.unwrap_or_else(|| ident.to_string()),
            role: attr.role,
        });
    }
    Ok(mapped)
}

/// Struct-level `#[orm(table = "...")]`, if present.
pub(crate) fn table_name(input: &DeriveInput) -> Result<Option<String>> {
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let nested: syn::MetaNameValue = attr.parse_args()?;
        if !nested.path.is_ident("table") {
            return Err(syn::Error::new_spanned(
                &nested.path,
                "expected #[orm(table = \"table_name\")]",
            ));
        }
        let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) = &nested.value
        else {
            return Err(syn::Error::new_spanned(
                &nested.value,
                "orm(table = \"...\") expects a string literal",
            ));
        };
        return Ok(Some(lit.value()));
    }
    Ok(None)
}
