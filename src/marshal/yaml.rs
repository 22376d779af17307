//! YAML record format

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{KvError, Result};

use super::Marshaler;

/// YAML records
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMarshaler;

impl Marshaler for YamlMarshaler {
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| KvError::Serialization(e.to_string()))
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_yaml::from_slice(bytes).map_err(|e| KvError::Serialization(e.to_string()))
    }

    fn file_extension(&self) -> &str {
        ".yml"
    }
}
