use crate::value::Value;
use crate::{Array, Dict};
use tracing::debug;

impl From<&serde_json::Map<String, serde_json::Value>> for Dict {
    fn from(value: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut dict = Dict::new();
        for (key, value) in value {
            dict.insert(key.clone(), Value::from(value));
        }
        dict
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::null(),
            serde_json::Value::Bool(b) => Value::bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::int(i),
                None => match n.as_f64() {
                    Some(f) => Value::float(f),
                    None => {
                        debug!("number {n} out of range, keeping it as text");
                        Value::text(&n.to_string())
                    }
                },
            },
            serde_json::Value::String(s) => Value::text(s),
            serde_json::Value::Array(a) => Value::Array(Array::new(a.iter().map(Value::from).collect())),
            serde_json::Value::Object(o) => Value::Dict(o.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dict, Value};
    use serde_json::json;

    #[test]
    fn json_keeps_order() {
        let json = json!({"SearchTerm": "", "PageSize": 4, "Filter": {"MinPrice": 10.5, "CategoryId": "c1"}});
        let dict = Dict::from(json.as_object().unwrap());
        assert_eq!(
            dict.keys().cloned().collect::<Vec<_>>(),
            vec!["SearchTerm", "PageSize", "Filter"]
        );
        let Some(Value::Dict(filter)) = dict.get("Filter") else {
            panic!("Filter is not a dict")
        };
        assert_eq!(
            filter.keys().cloned().collect::<Vec<_>>(),
            vec!["MinPrice", "CategoryId"]
        );
        assert_eq!(filter.get("MinPrice"), Some(&Value::float(10.5)));
    }

    #[test]
    fn deserialize_untagged() {
        let dict: Dict =
            serde_json::from_str(r#"{"a": null, "b": true, "c": 3, "d": 1.5, "e": "x", "f": [1], "g": {"h": 2}}"#)
                .unwrap();
        assert_eq!(dict.get("a"), Some(&Value::Null));
        assert_eq!(dict.get("b"), Some(&Value::bool(true)));
        assert_eq!(dict.get("c"), Some(&Value::int(3)));
        assert_eq!(dict.get("d"), Some(&Value::float(1.5)));
        assert_eq!(dict.get("e"), Some(&Value::text("x")));
        assert_eq!(dict.get("f"), Some(&Value::array(vec![1.into()])));
        assert_eq!(
            dict.get("g"),
            Some(&Value::from(Dict::new().with("h", 2)))
        );
    }

    #[test]
    fn unsigned_overflow_becomes_float() {
        let json = json!({"big": u64::MAX, "small": 7});
        let dict = Dict::from(json.as_object().unwrap());
        assert_eq!(dict.get("big"), Some(&Value::float(u64::MAX as f64)));
        assert_eq!(dict.get("small"), Some(&Value::int(7)));
    }
}
