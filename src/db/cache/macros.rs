/// Read-through caching for fallible async computations.
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`,
/// hands the result to the background writer with a flat `$ttl` (seconds) and
/// returns it. Errors from the cache read or from `$block` are propagated with `?`,
/// so the macro must be used inside a function returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// async fn details(cache: &Cache, provider: &dyn MetadataProvider) -> AppResult<TmdbDetails> {
///     cached!(
///         cache,
///         CacheKey::TmdbDetails(MediaType::Movie, 27205),
///         DETAILS_TTL,
///         provider.details(27205, MediaType::Movie)
///     )
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
