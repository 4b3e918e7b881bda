//! XDR (RFC 4506) encoding for libvirt remote protocol messages.
//!
//! Messages are plain serde structs. Structs and tuples encode as the
//! concatenation of their fields, `Option<T>` as an XDR optional-data
//! pointer, `Vec<T>` and strings as variable-length arrays, and [`Uuid`] as
//! 16 bytes of fixed-length opaque data.

mod de;
mod error;
mod ser;
mod uuid;

pub use de::XdrDeserializer;
pub use error::{Error, Result};
pub use ser::XdrSerializer;
pub use uuid::Uuid;

use serde::{de::DeserializeOwned, Serialize};

/// Encode a value as XDR.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut serializer = XdrSerializer::new();
    value.serialize(&mut serializer)?;
    Ok(serializer.into_bytes())
}

/// Decode a value from XDR, rejecting trailing bytes.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = XdrDeserializer::new(bytes);
    let value = T::deserialize(&mut deserializer)?;
    deserializer.finish()?;
    Ok(value)
}

/// Decode a value from the front of `bytes`, ignoring whatever follows.
pub fn from_prefix<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = XdrDeserializer::new(bytes);
    T::deserialize(&mut deserializer)
}

/// Number of zero bytes needed to pad `len` to a 4-byte boundary.
pub(crate) fn padding(len: usize) -> usize {
    (4 - (len % 4)) % 4
}
