//! Derive macros for sqlrepo
//!
//! Provides `#[derive(Entity)]`, `#[derive(FromRow)]` and `#[derive(Params)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;
mod from_row;
mod params;

/// Map a struct onto a table.
///
/// Implements `sqlrepo::Entity`, `sqlrepo::FromRow` and `sqlrepo::ToParams`,
/// and registers the entity's descriptor for `sqlrepo::metadata::preload_registered`.
/// Do not combine with `#[derive(FromRow)]` or `#[derive(Params)]`.
///
/// # Example
///
/// ```ignore
/// use sqlrepo::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "orders")]
/// struct Order {
///     #[orm(key)]
///     id: i64,
///     #[orm(column = "customer_name")]
///     customer: String,
///     #[orm(computed)]
///     created_at: Option<String>,
///     #[orm(skip)]
///     cached_total: f64,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (default: pluralized snake_case type name)
/// - `#[orm(key)]` - Database-generated key, written back after insert
/// - `#[orm(explicit_key)]` - Caller-supplied key
/// - `#[orm(computed)]` - Never inserted or updated
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` - Not mapped; filled with `Default` when reading
///
/// Without `key` or `explicit_key`, a field whose column is `id` is the key.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` for a struct.
///
/// # Example
///
/// ```ignore
/// use sqlrepo::FromRow;
///
/// #[derive(FromRow)]
/// struct OrderSummary {
///     customer: String,
///     #[orm(column = "order_count")]
///     orders: i64,
/// }
/// ```
///
/// Supports `#[orm(column = "...")]` and `#[orm(skip)]`.
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `ToParams` for a filter or patch struct.
///
/// Every mapped field becomes a named parameter whose name is the column.
///
/// ```ignore
/// #[derive(sqlrepo::Params)]
/// struct StatusPatch {
///     status: String,
/// }
///
/// repo.update_partial::<Order>(&StatusPatch { status: "shipped".into() }, Some(&filter), false).await?;
/// ```
#[proc_macro_derive(Params, attributes(orm))]
pub fn derive_params(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    params::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
