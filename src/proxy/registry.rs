//! Central proxy and lookup-service registry.

/// Default CORS proxies. Each one drives its own scan lane.
pub const DEFAULT_PROXIES: &[&str] = &[
    "https://web-production-99ed.up.railway.app/",
    "https://web-production-6259f.up.railway.app/",
    "https://web-production-9824.up.railway.app/",
    "https://web-production-034d.up.railway.app/",
    "https://web-production-787c.up.railway.app/",
];

/// Single profile lookup; the username is appended.
pub const PROFILE_LOOKUP_URL: &str = "https://api.mojang.com/users/profiles/minecraft/";

/// Bulk profile lookup, takes a JSON array of up to [`BULK_LOOKUP_LIMIT`] names.
pub const BULK_LOOKUP_URL: &str =
    "https://api.minecraftservices.com/minecraft/profile/lookup/bulk/byname";

/// Upper bound on names per bulk request
pub const BULK_LOOKUP_LIMIT: usize = 10;

/// Build the proxied single lookup URL for `name`.
///
/// The proxy forwards whatever follows its prefix, so the pieces are joined verbatim.
pub fn profile_url(proxy: &str, profile_base: &str, name: &str) -> String {
    format!("{proxy}{profile_base}{name}")
}

/// Build the proxied bulk lookup URL.
pub fn bulk_url(proxy: &str, bulk_base: &str) -> String {
    format!("{proxy}{bulk_base}")
}
