use error::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::trace;
use url::form_urlencoded;
use value::{Array, Query, Value};

/// How array valued fields end up in the query string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayEncoding {
    /// `Ids=a,b`, the behaviour the storefront always had.
    #[default]
    Joined,
    /// `Ids=a&Ids=b`
    Repeated,
    /// Arrays are a serialization error.
    Rejected,
}

/// Flat, ordered `(key, value)` pairs of a serialized query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SerializedQuery {
    pairs: Vec<(String, String)>,
}

impl SerializedQuery {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    fn push(&mut self, key: String, value: String) {
        self.pairs.push((key, value));
    }

    /// Renders the pairs as `application/x-www-form-urlencoded`.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

impl Display for SerializedQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Serializes with the default [`ArrayEncoding`].
pub fn serialize(query: &Query) -> Result<SerializedQuery, FetchError> {
    Serializer::default().serialize(query)
}

/// Appends a serialized query to a path.
///
/// An empty query leaves the path alone, a path which already carries a query
/// component is continued with `&`.
pub fn build_url(path: &str, query: &SerializedQuery) -> String {
    if query.is_empty() {
        return path.to_string();
    }

    let encoded = query.encode();
    match path.find('?') {
        None => format!("{path}?{encoded}"),
        Some(_) if path.ends_with('?') || path.ends_with('&') => format!("{path}{encoded}"),
        Some(_) => format!("{path}&{encoded}"),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Serializer {
    arrays: ArrayEncoding,
}

impl Serializer {
    pub fn new(arrays: ArrayEncoding) -> Self {
        Serializer { arrays }
    }

    /// Walks the query in insertion order.
    ///
    /// Nested dicts are flattened into `outer.inner` keys, null and empty text
    /// values are skipped on both levels. Anything nested deeper than one dict
    /// is rejected.
    pub fn serialize(&self, query: &Query) -> Result<SerializedQuery, FetchError> {
        let mut serialized = SerializedQuery::default();

        for (field, value) in query {
            match value {
                Value::Dict(inner) => {
                    for (inner_field, inner_value) in inner {
                        let key = format!("{field}.{inner_field}");
                        if let Value::Dict(_) = inner_value {
                            return Err(FetchError::Serialization(format!(
                                "field {key} nests deeper than one level"
                            )));
                        }
                        self.emit(&mut serialized, key, inner_value)?;
                    }
                }
                value => self.emit(&mut serialized, field.clone(), value)?,
            }
        }

        trace!("serialized query into {} pairs", serialized.len());
        Ok(serialized)
    }

    fn emit(
        &self,
        serialized: &mut SerializedQuery,
        key: String,
        value: &Value,
    ) -> Result<(), FetchError> {
        if value.is_unspecified() {
            return Ok(());
        }

        match value {
            Value::Array(array) => self.emit_array(serialized, key, array),
            Value::Dict(_) => Err(FetchError::Serialization(format!(
                "field {key} nests deeper than one level"
            ))),
            scalar => {
                serialized.push(key, scalar.to_string());
                Ok(())
            }
        }
    }

    fn emit_array(
        &self,
        serialized: &mut SerializedQuery,
        key: String,
        array: &Array,
    ) -> Result<(), FetchError> {
        if array.iter().any(holds_dict) {
            return Err(FetchError::Serialization(format!(
                "field {key} holds an array of dicts"
            )));
        }

        match self.arrays {
            ArrayEncoding::Joined => serialized.push(key, array.to_string()),
            ArrayEncoding::Repeated => {
                for value in array.iter().filter(|v| !v.is_unspecified()) {
                    serialized.push(key.clone(), value.to_string());
                }
            }
            ArrayEncoding::Rejected => {
                return Err(FetchError::Serialization(format!(
                    "field {key} is an array, which is not supported"
                )));
            }
        }
        Ok(())
    }
}

/// True for a dict or an array which holds one at any depth.
fn holds_dict(value: &Value) -> bool {
    match value {
        Value::Dict(_) => true,
        Value::Array(array) => array.iter().any(holds_dict),
        _ => false,
    }
}
