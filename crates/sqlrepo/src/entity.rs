//! The entity contract implemented by `#[derive(Entity)]`.

use crate::error::RepoResult;
use crate::metadata::EntityDescriptor;
use crate::params::ToParams;
use crate::row::FromRow;
use crate::value::Value;

/// A struct mapped onto one table.
///
/// Reading goes through [`FromRow`]; writing goes through [`ToParams`], whose
/// parameter names are the column names.
pub trait Entity: FromRow + ToParams + Send + Sync + 'static {
    /// Static shape of the entity.
    fn descriptor() -> &'static EntityDescriptor;

    /// Assign `value` to the field mapped onto `column`.
    ///
    /// Used to write back database-generated keys after insert. Returns
    /// `Ok(false)` when no field maps onto `column`.
    fn set_column(&mut self, column: &str, value: Value) -> RepoResult<bool>;
}
