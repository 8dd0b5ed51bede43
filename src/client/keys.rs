//! Key arguments for multi-key operations
//!
//! Multi-key calls accept any collection whose items can be viewed as a
//! key. Items without a key view (non-string `Value`s) are skipped.

use crate::codec::Value;

/// Something usable as a storage key
pub trait AsKey {
    /// Key bytes, or `None` when this item is not a key
    fn as_key(&self) -> Option<&[u8]>;
}

impl AsKey for str {
    fn as_key(&self) -> Option<&[u8]> {
        Some(self.as_bytes())
    }
}

impl AsKey for String {
    fn as_key(&self) -> Option<&[u8]> {
        Some(self.as_bytes())
    }
}

impl AsKey for [u8] {
    fn as_key(&self) -> Option<&[u8]> {
        Some(self)
    }
}

impl<const N: usize> AsKey for [u8; N] {
    fn as_key(&self) -> Option<&[u8]> {
        Some(self)
    }
}

impl AsKey for Vec<u8> {
    fn as_key(&self) -> Option<&[u8]> {
        Some(self)
    }
}

impl AsKey for Value {
    fn as_key(&self) -> Option<&[u8]> {
        self.as_bytes()
    }
}

impl<T: AsKey + ?Sized> AsKey for &T {
    fn as_key(&self) -> Option<&[u8]> {
        (**self).as_key()
    }
}
