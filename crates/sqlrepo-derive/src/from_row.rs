//! FromRow derive macro implementation

use crate::attrs::{FieldRole, MappedField, named_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let fields = named_fields(&input, "FromRow")?;
    Ok(from_row_impl(&input, &fields))
}

pub(crate) fn from_row_impl(input: &DeriveInput, fields: &[MappedField<'_>]) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let field_extracts = fields.iter().map(|f| {
        let ident = f.ident;
        let column = &f.column;
        if f.role == FieldRole::Skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! { #ident: row.try_get(#column)? }
        }
    });

    quote! {
        impl #impl_generics sqlrepo::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &sqlrepo::Row) -> sqlrepo::RepoResult<Self> {
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    }
}
