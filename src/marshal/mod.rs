//! Marshal Module
//!
//! Pluggable record formats.
//!
//! ## Responsibilities
//! - Encode a value into the bytes written to a record file
//! - Decode a record file's bytes back into a value
//! - Name the file extension the format's records carry
//!
//! ## Formats
//! | Marshaler          | Extension | Notes                          |
//! |--------------------|-----------|--------------------------------|
//! | `JsonMarshaler`    | `.json`   | default, tab-indented          |
//! | `YamlMarshaler`    | `.yml`    |                                |
//! | `BincodeMarshaler` | `.bin`    | compact, not self-describing   |

mod binary;
mod json;
mod yaml;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use self::binary::BincodeMarshaler;
pub use self::json::JsonMarshaler;
pub use self::yaml::YamlMarshaler;

/// Encodes and decodes record contents
///
/// The store only relies on these three methods; any format can be
/// plugged in by implementing them.
pub trait Marshaler: Send + Sync {
    /// Serialize `value` into the bytes of a record file
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a record file's bytes
    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Extension appended to the placed path, including the leading dot
    fn file_extension(&self) -> &str;
}
