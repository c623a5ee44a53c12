use std::fmt::{Display, Formatter};

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ValType {
    Integer,
    Float,
    Text,
    Bool,
    Array,
    Dict,
    Null,
}

impl ValType {
    pub fn dump(&self) -> &'static str {
        match self {
            ValType::Integer => "int",
            ValType::Float => "float",
            ValType::Text => "text",
            ValType::Bool => "bool",
            ValType::Array => "array",
            ValType::Dict => "dict",
            ValType::Null => "null",
        }
    }

    /// Scalars are the only values which end up as a single query string value.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ValType::Integer | ValType::Float | ValType::Text | ValType::Bool
        )
    }
}

impl Display for ValType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dump())
    }
}
