use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "yt")]
    YouTube,
    #[serde(alias = "ig")]
    Instagram,
    TikTok,
    #[serde(alias = "fb")]
    Facebook,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::YouTube,
        Platform::Instagram,
        Platform::TikTok,
        Platform::Facebook,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
            Platform::Facebook => "facebook",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::TikTok => "TikTok",
            Platform::Facebook => "Facebook",
        }
    }

    /// Landing page sent as the default `Referer` to the engine.
    pub fn home_url(self) -> &'static str {
        match self {
            Platform::YouTube => "https://www.youtube.com/",
            Platform::Instagram => "https://www.instagram.com/",
            Platform::TikTok => "https://www.tiktok.com/",
            Platform::Facebook => "https://www.facebook.com/",
        }
    }

    pub fn example_url(self) -> &'static str {
        match self {
            Platform::YouTube => "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            Platform::Instagram => "https://www.instagram.com/reel/C1a2b3c4d5e/",
            Platform::TikTok => "https://www.tiktok.com/@user/video/7300000000000000000",
            Platform::Facebook => "https://www.facebook.com/user/videos/1234567890/",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
