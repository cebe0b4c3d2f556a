//! Static per-platform User-Agent pools.
//!
//! The engine is handed one browser identity per request, drawn uniformly from the
//! pool of the selected platform. Mobile identities are included for the
//! platforms that serve lighter pages to phones.

use rand::{Rng, seq::SliceRandom};

use crate::platform::Platform;

const DESKTOP_CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const DESKTOP_CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";
const DESKTOP_FIREFOX: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0";
const DESKTOP_SAFARI: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15";
const DESKTOP_EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0";
const MOBILE_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1";
const MOBILE_CHROME: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36";

const YOUTUBE_POOL: &[&str] = &[
    DESKTOP_CHROME_WINDOWS,
    DESKTOP_CHROME_MAC,
    DESKTOP_FIREFOX,
    DESKTOP_EDGE,
];
const INSTAGRAM_POOL: &[&str] = &[
    MOBILE_SAFARI,
    MOBILE_CHROME,
    DESKTOP_CHROME_WINDOWS,
    DESKTOP_SAFARI,
];
const TIKTOK_POOL: &[&str] = &[MOBILE_SAFARI, MOBILE_CHROME, DESKTOP_CHROME_WINDOWS];
const FACEBOOK_POOL: &[&str] = &[
    DESKTOP_CHROME_WINDOWS,
    DESKTOP_FIREFOX,
    DESKTOP_SAFARI,
    MOBILE_CHROME,
];

pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

pub fn pool(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::YouTube => YOUTUBE_POOL,
        Platform::Instagram => INSTAGRAM_POOL,
        Platform::TikTok => TIKTOK_POOL,
        Platform::Facebook => FACEBOOK_POOL,
    }
}

/// Picks one User-Agent for `platform`. Every pool is non-empty, the fallback only
/// keeps the signature infallible.
pub fn sample<R: Rng + ?Sized>(platform: Platform, rng: &mut R) -> &'static str {
    pool(platform)
        .choose(rng)
        .copied()
        .unwrap_or(DESKTOP_CHROME_WINDOWS)
}
