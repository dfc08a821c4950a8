use serde::de::DeserializeOwned;
use thiserror::Error;

/// A parse failure located by the JSON path where deserialization stopped.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("at JSON path {path} → {message}")]
pub struct ParseError {
    pub path: String,
    pub message: String,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, ParseError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ParseError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

fn located(err: serde_path_to_error::Error<serde_json::Error>) -> ParseError {
    ParseError {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Outer {
        inner: Inner,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Inner {
        count: u32,
    }

    #[test]
    fn reports_the_failing_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner": {"count": "many"}}"#).unwrap_err();
        assert_eq!(err.path, "inner.count");
        assert!(err.to_string().contains("inner.count"));
    }

    #[test]
    fn slices_parse_plain_values() {
        let v: serde_json::Value = from_slice_with_path(br#"{"a": [1, 2]}"#).unwrap();
        assert_eq!(v["a"][1], 2);
    }
}
