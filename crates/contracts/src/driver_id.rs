//! Driver identifier.
//!
//! The feed keys every car by its racing number as a string ("1", "44").

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Racing number of a driver.
///
/// Carried by every lap, stream sample and channel table, so it is shared
/// rather than copied. Ordering and hashing follow the number's string form,
/// which keeps map lookups by `&str` consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(Arc<str>);

impl DriverId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for DriverId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DriverId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DriverId {
    fn from(number: &str) -> Self {
        Self(Arc::from(number))
    }
}

impl From<String> for DriverId {
    fn from(number: String) -> Self {
        Self(Arc::from(number))
    }
}

impl PartialEq<str> for DriverId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for DriverId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
