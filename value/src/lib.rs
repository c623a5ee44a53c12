pub use array::Array;
pub use dict::{Dict, Query};
pub use r#type::ValType;
pub use value::Value;

mod array;
mod conversion;
mod dict;
mod r#type;
pub(crate) mod value;
