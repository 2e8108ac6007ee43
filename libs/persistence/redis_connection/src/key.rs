use std::borrow::Cow;

use serde::{Serialize, de::DeserializeOwned};

/// A typed cache key. Implementors are unit structs declared through the
/// [`cache_key!`](crate::cache_key) macro; the key string is a pure
/// function of the arguments, so identical logical queries always land on
/// the same entry.
pub trait CacheKey {
    /// Value stored under this key, serialized as JSON.
    type Value: Serialize + DeserializeOwned + Send + Sync;
    type Args<'r>;

    fn key_with_args(&self, args: Self::Args<'_>) -> Cow<'static, str>;
}
