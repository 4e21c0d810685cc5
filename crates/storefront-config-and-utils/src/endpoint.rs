//! URL building against the configured API base.

use crate::CoreResult;
use url::Url;

/// Join an API path onto a base URL.
///
/// Unlike `Url::join`, a path prefix on the base survives:
/// `https://host/shop/` + `/api/auth/me` gives `https://host/shop/api/auth/me`.
pub fn build_url_with_base(base_url: &str, path: &str) -> CoreResult<Url> {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim().trim_start_matches('/');
    Ok(Url::parse(&format!("{}/{}", base, path))?)
}
