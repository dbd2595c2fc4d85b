//! Entity derive macro implementation
//!
//! Emits the static descriptor, `FromRow`, `ToParams`, key write-back and an
//! `inventory` registration.

use crate::attrs::{FieldRole, named_fields, table_name};
use crate::from_row::from_row_impl;
use crate::params::to_params_impl;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let name = &input.ident;
    let type_name = name.to_string();
    let fields = named_fields(&input, "Entity")?;
    let table = match table_name(&input)? {
        Some(t) => quote! { ::core::option::Option::Some(#t) },
        None => quote! { ::core::option::Option::None },
    };

    let mapped: Vec<_> = fields.iter().filter(|f| f.role != FieldRole::Skip).collect();
    if mapped.is_empty() {
        return Err(syn::Error::new_spanned(
            &input,
            "Entity requires at least one mapped field",
        ));
    }

    let descriptors = mapped.iter().map(|f| {
        let field = f.ident.to_string();
        let column = &f.column;
        let kind = match f.role {
            FieldRole::Key => quote! { sqlrepo::ColumnKind::Key },
            FieldRole::ExplicitKey => quote! { sqlrepo::ColumnKind::ExplicitKey },
            FieldRole::Computed => quote! { sqlrepo::ColumnKind::Computed },
            FieldRole::Writable | FieldRole::Skip => quote! { sqlrepo::ColumnKind::Writable },
        };
        quote! {
            sqlrepo::FieldDescriptor {
                field: #field,
                column: #column,
                kind: #kind,
            }
        }
    });

    let setters = mapped.iter().map(|f| {
        let ident = f.ident;
        let ty = f.ty;
        let column = &f.column;
        quote! {
            if column.eq_ignore_ascii_case(#column) {
                self.#ident = <#ty as sqlrepo::FromValue>::from_value(value)?;
                return Ok(true);
            }
        }
    });

    let from_row = from_row_impl(&input, &fields);
    let to_params = to_params_impl(&input, &fields);

    Ok(quote! {
        #from_row

        #to_params

        impl sqlrepo::Entity for #name {
            fn descriptor() -> &'static sqlrepo::EntityDescriptor {
                static DESCRIPTOR: sqlrepo::EntityDescriptor = sqlrepo::EntityDescriptor {
                    type_name: #type_name,
                    table: #table,
                    fields: &[#(#descriptors),*],
                };
                &DESCRIPTOR
            }

            fn set_column(&mut self, column: &str, value: sqlrepo::Value) -> sqlrepo::RepoResult<bool> {
                #(#setters)*
                Ok(false)
            }
        }

        sqlrepo::inventory::submit! {
            sqlrepo::metadata::EntityRegistration {
                type_id: || ::core::any::TypeId::of::<#name>(),
                descriptor: <#name as sqlrepo::Entity>::descriptor,
            }
        }
    })
}
