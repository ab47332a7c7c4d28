pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";

pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_MEDIA_BYTES: usize = 100 * 1024 * 1024;

/// Content types accepted for upload, matching the media types the
/// feed can render (image, gif, video).
pub const ALLOWED_MEDIA_CONTENT_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/gif", "video/mp4"];

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn media_key(id: &str) -> String {
    format!("media:{}", id)
}

pub fn media_meta_key(id: &str) -> String {
    format!("mediameta:{}", id)
}

pub fn token_expiration_hours() -> i64 {
    std::env::var("PULSE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}
