//! Ordered key/value diagnostics carried by an error.

use alloc::string::String;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

/// Ordered key/value diagnostics attached to an error.
///
/// Insertion order is preserved, which keeps rendered and persisted output
/// stable.
pub type DataMap = IndexMap<String, String, FxBuildHasher>;

/// Returns an empty map that can be borrowed for the lifetime of the program.
///
/// Singletons hand this out from [`ErrorInstance::data`].
///
/// [`ErrorInstance::data`]: crate::ErrorInstance::data
pub(crate) fn empty() -> &'static DataMap {
    static EMPTY: spin::Once<DataMap> = spin::Once::new();
    EMPTY.call_once(|| DataMap::with_hasher(FxBuildHasher))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_shared() {
        assert!(empty().is_empty());
        assert!(core::ptr::eq(empty(), empty()));
    }

    #[test]
    fn test_insertion_order() {
        let mut data = DataMap::default();
        data.insert("zeta".into(), "1".into());
        data.insert("alpha".into(), "2".into());
        let keys: alloc::vec::Vec<_> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha"]);
    }
}
