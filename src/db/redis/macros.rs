/// Read-through caching around an async block.
///
/// Looks the key up in the cache first; on a miss, runs the block, queues the
/// result for a background cache write, and returns it. The wrapped block
/// must evaluate to an `AppResult` — errors are returned as-is and never
/// cached.
///
/// # Arguments
/// * `$cache`: a [`crate::db::Cache`]
/// * `$key`: the [`crate::db::CacheKey`] under which the value lives
/// * `$ttl`: time-to-live for the cached value, in seconds
/// * `$block`: async block computing the value on a miss
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            $crate::error::AppResult::Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
