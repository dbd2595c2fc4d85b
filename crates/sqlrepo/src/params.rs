//! Named statement parameters.
//!
//! Generated SQL refers to parameters by name (`@name`, or `:name` for
//! Oracle). Drivers bind a [`Params`] list by name, rewriting to positional
//! placeholders where the engine requires it.

use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// An ordered list of uniquely named parameter values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Add a parameter; an existing parameter with the same name is replaced.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Builder-style [`Params::add`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(name, value);
        self
    }

    /// Merge `other` into `self`; names in `other` win.
    pub fn extend(&mut self, other: Params) -> &mut Self {
        for (name, value) in other.entries {
            self.add(name, value);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Case-insensitive lookup, used when binding against placeholders that
    /// may differ in case from the field name.
    pub fn get_ignore_case(&self, name: &str) -> Option<&Value> {
        self.get(name).or_else(|| {
            self.entries
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.add(name, value);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Types whose public fields act as named parameters.
///
/// Entities implement this through `#[derive(Entity)]`; ad-hoc filter and
/// patch objects through `#[derive(Params)]`, a [`Params`] value, or the
/// [`params!`](crate::params!) macro. The parameter names double as column
/// names in filter and partial-update SQL.
pub trait ToParams {
    fn to_params(&self) -> Params;
}

impl ToParams for Params {
    fn to_params(&self) -> Params {
        self.clone()
    }
}

impl ToParams for () {
    fn to_params(&self) -> Params {
        Params::new()
    }
}

impl<T: ToParams + ?Sized> ToParams for &T {
    fn to_params(&self) -> Params {
        (**self).to_params()
    }
}

impl<V: Clone + Into<Value>> ToParams for BTreeMap<String, V> {
    fn to_params(&self) -> Params {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<V: Clone + Into<Value>> ToParams for HashMap<String, V> {
    fn to_params(&self) -> Params {
        // Sort for deterministic SQL text.
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Build a [`Params`] list inline.
///
/// ```ignore
/// let filter = sqlrepo::params! { "status" => "active", "owner_id" => 7 };
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::Params::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut __params = $crate::Params::new();
        $( __params.add($name, $value); )+
        __params
    }};
}
