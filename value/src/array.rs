use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt::Formatter;

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Array {
    pub values: Vec<Value>,
}

impl Array {
    pub fn new(values: Vec<Value>) -> Self {
        Array { values }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::array(value)
    }
}

// Mirrors the default join of the storefront: elements separated by commas, null as nothing.
impl std::fmt::Display for Array {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match value {
                Value::Null => {}
                v => write!(f, "{v}")?,
            }
        }
        Ok(())
    }
}
