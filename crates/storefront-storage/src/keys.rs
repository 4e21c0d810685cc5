//! Storage key constants.

/// Keys the client persists in durable storage.
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer access token
    pub const ACCESS_TOKEN: &'static str = "storefront_access_token";

    /// Refresh token exchanged for a new access token
    pub const REFRESH_TOKEN: &'static str = "storefront_refresh_token";
}
