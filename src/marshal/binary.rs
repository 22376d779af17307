//! Bincode record format
//!
//! Compact binary records. Bincode is not self-describing: a record can
//! only be read back into the same type shape it was written with.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{KvError, Result};

use super::Marshaler;

/// Bincode records
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeMarshaler;

impl Marshaler for BincodeMarshaler {
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| KvError::Serialization(e.to_string()))
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| KvError::Serialization(e.to_string()))
    }

    fn file_extension(&self) -> &str {
        ".bin"
    }
}
