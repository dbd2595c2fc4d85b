//! Params derive macro implementation

use crate::attrs::{FieldRole, MappedField, named_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let fields = named_fields(&input, "Params")?;
    Ok(to_params_impl(&input, &fields))
}

pub(crate) fn to_params_impl(input: &DeriveInput, fields: &[MappedField<'_>]) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let bound: Vec<_> = fields.iter().filter(|f| f.role != FieldRole::Skip).collect();
    let capacity = bound.len();
    let adds = bound.iter().map(|f| {
        let ident = f.ident;
        let column = &f.column;
        quote! {
            params.add(#column, sqlrepo::Value::from(::core::clone::Clone::clone(&self.#ident)));
        }
    });

    quote! {
        impl #impl_generics sqlrepo::ToParams for #name #ty_generics #where_clause {
            fn to_params(&self) -> sqlrepo::Params {
                let mut params = sqlrepo::Params::with_capacity(#capacity);
                #(#adds)*
                params
            }
        }
    }
}
