use tracing::debug;

use crate::types::{ParamMap, RowValues};

/// Arguments for one operation call: a single mapping or a batch of mappings.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationArgs {
    Single(ParamMap),
    Batch(Vec<ParamMap>),
}

impl InvocationArgs {
    #[must_use]
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }
}

impl Default for InvocationArgs {
    fn default() -> Self {
        Self::Single(ParamMap::new())
    }
}

impl From<ParamMap> for InvocationArgs {
    fn from(params: ParamMap) -> Self {
        Self::Single(params)
    }
}

impl From<Vec<ParamMap>> for InvocationArgs {
    fn from(batch: Vec<ParamMap>) -> Self {
        Self::Batch(batch)
    }
}

impl From<()> for InvocationArgs {
    fn from((): ()) -> Self {
        Self::default()
    }
}

/// A positional argument supplied alongside keyword arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Positional {
    Mapping(ParamMap),
    Batch(Vec<ParamMap>),
}

/// Combine a call site's positional and keyword arguments.
///
/// A positional mapping replaces the keywords. A positional batch ignores them.
#[must_use]
pub fn normalize(positional: Option<Positional>, keywords: ParamMap) -> InvocationArgs {
    match positional {
        None => InvocationArgs::Single(keywords),
        Some(Positional::Mapping(mapping)) => {
            if !keywords.is_empty() {
                debug!(
                    ignored = keywords.len(),
                    "positional mapping replaces keyword arguments"
                );
            }
            InvocationArgs::Single(mapping)
        }
        Some(Positional::Batch(batch)) => {
            if !keywords.is_empty() {
                debug!(
                    ignored = keywords.len(),
                    "keyword arguments are ignored for batch calls"
                );
            }
            InvocationArgs::Batch(batch)
        }
    }
}

/// Collect the values `names` refer to, in order.
///
/// Returns the first missing name on failure.
pub(crate) fn bind(params: &ParamMap, names: &[String]) -> Result<Vec<RowValues>, String> {
    names
        .iter()
        .map(|name| params.get(name).cloned().ok_or_else(|| name.clone()))
        .collect()
}

/// Build a [`ParamMap`](crate::types::ParamMap) from `name => value` pairs.
///
/// ```rust
/// use sql_operations::params;
///
/// let map = params! { "name" => "Ada", "age" => 36 };
/// assert_eq!(map.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::types::ParamMap::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::types::ParamMap::new();
        $(map.insert($name, $value);)+
        map
    }};
}
