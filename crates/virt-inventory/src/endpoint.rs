//! Hypervisor endpoint identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Opaque URI naming a hypervisor management service, e.g.
/// `qemu:///system` or `qemu+tcp://host/system`.
///
/// Only non-emptiness is checked here; interpretation is up to the
/// [`Connector`](crate::Connector) that opens it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(Error::connection("(empty)", "endpoint URI is empty"));
        }
        Ok(Self(uri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
