/// Read-through caching around an async computation.
///
/// `$cache` is an `Option<&Cache>`; with `None` the block simply runs. On a hit the
/// cached value is returned, on a miss (or a failed cache read) the block runs and its
/// value is queued for a background write. Errors from the block propagate with `?`.
///
/// ```rust,ignore
/// let similar: Vec<Movie> = cached!(state.cache.as_ref(), CacheKey::Similar(id), async {
///     recommendations::similar_to(store, &movie).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        match $cache {
            Some(cache) => {
                let key = $key;
                match cache.get(&key).await {
                    Ok(Some(hit)) => Ok(hit),
                    outcome => {
                        if let Err(e) = outcome {
                            tracing::warn!(error = %e, key = %key, "Cache read failed, computing");
                        }
                        let value = $block.await?;
                        cache.set_in_background(&key, &value);
                        Ok(value)
                    }
                }
            }
            None => $block.await,
        }
    }};
}
