//! JSON record format

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{KvError, Result};

use super::Marshaler;

/// JSON records, tab-indented by default
#[derive(Debug, Clone, Copy)]
pub struct JsonMarshaler {
    pretty: bool,
}

impl JsonMarshaler {
    /// Indented output (one tab per level)
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Single-line output
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonMarshaler {
    fn default() -> Self {
        Self::pretty()
    }
}

impl Marshaler for JsonMarshaler {
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        if !self.pretty {
            return serde_json::to_vec(value).map_err(|e| KvError::Serialization(e.to_string()));
        }

        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
        value
            .serialize(&mut serializer)
            .map_err(|e| KvError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| KvError::Serialization(e.to_string()))
    }

    fn file_extension(&self) -> &str {
        ".json"
    }
}
