//! Fixed-length 16-byte opaque data, used for domain UUIDs.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Newtype name the codec recognises to switch to fixed-length encoding.
pub(crate) const UUID_TOKEN: &str = "$virt_inventory_xdr::Uuid";

/// A 16-byte UUID carried as XDR `opaque[16]`: raw bytes, no length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uuid(pub [u8; 16]);

impl Uuid {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for Uuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(UUID_TOKEN, &RawBytes(&self.0))
    }
}

struct RawBytes<'a>(&'a [u8]);

impl Serialize for RawBytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

impl<'de> Deserialize<'de> for Uuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UuidVisitor;

        impl<'de> de::Visitor<'de> for UuidVisitor {
            type Value = Uuid;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("16 bytes of opaque data")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Uuid, E> {
                let bytes: [u8; 16] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(Uuid(bytes))
            }
        }

        deserializer.deserialize_newtype_struct(UUID_TOKEN, UuidVisitor)
    }
}
