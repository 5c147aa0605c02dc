//! Username Sniper - Minecraft username availability checking and enumeration
//!
//! Checks single names through the profile endpoint and enumerates every name of
//! a chosen length and character set through the bulk lookup endpoint, spread
//! across a pool of proxies.

pub mod error;
pub mod lookup;
pub mod proxy;
pub mod snipe;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SniperError};
pub use types::{
    CharacterClass, LookupResult, LookupSettings, LookupStatus, ScanConfig, ScanPhase,
};

// Re-export main functionality
pub use lookup::{NameLookup, ProfileClient, UsernameValidator};
pub use snipe::{ResultLog, ScanController, ScanEvent, ScanProgress};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
