//! Canonical cache keys.

use std::fmt;

use url::Url;
use url::form_urlencoded;

/// Deterministic signature of a request, used as the response cache key.
///
/// The key is the canonical request string itself rather than a hash, so
/// distinct requests can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the cache key for `url` plus any extra cache-relevant `params`.
///
/// Query pairs from the URL and `params` are merged and sorted by name,
/// then value, so parameter order never affects the key. The URL is
/// normalised by the `url` crate (lowercase scheme and host, default port
/// dropped) and any fragment is discarded. Strings that do not parse as
/// absolute URLs are kept verbatim with the sorted params appended.
pub fn generate_key(url: &str, params: &[(&str, &str)]) -> CacheKey {
    let extra = params.iter().map(|(k, v)| (k.to_string(), v.to_string()));

    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            let mut pairs: Vec<(String, String)> =
                parsed.query_pairs().into_owned().chain(extra).collect();
            pairs.sort();
            parsed.set_fragment(None);
            if pairs.is_empty() {
                parsed.set_query(None);
            } else {
                parsed.query_pairs_mut().clear().extend_pairs(&pairs);
            }
            CacheKey(parsed.into())
        }
        Err(_) => {
            let mut pairs: Vec<(String, String)> = extra.collect();
            if pairs.is_empty() {
                return CacheKey(url.trim().to_string());
            }
            pairs.sort();
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&pairs)
                .finish();
            CacheKey(format!("{}?{query}", url.trim()))
        }
    }
}
