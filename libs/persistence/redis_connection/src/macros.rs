/// Declare a typed cache key binding.
///
/// ```ignore
/// cache_key!(EventSummaryKey::<EventSummary> =>
///     "stats:event:{}:{}:{}"[app_id: Uuid, event: String, range: String]);
/// ```
#[macro_export]
macro_rules! cache_key {
    ($name:ident::<$t:ty> => $format_key:literal[$($arg:ident: $ty:ty),*]) => {
        #[doc = concat!("Cache key `", $format_key, "` storing `", stringify!($t), "` as JSON")]
        pub struct $name;

        impl $crate::key::CacheKey for $name {
            type Value = $t;
            type Args<'r> = ($(&'r $ty,)*);

            fn key_with_args(&self, args: Self::Args<'_>) -> std::borrow::Cow<'static, str> {
                let ($($arg,)*) = args;

                (format!($format_key, $($arg),*)).into()
            }
        }
    };
}
