use serde::{Serialize, Deserialize};

/// One edge of the follow graph as stored on a user document.
/// The same shape is used for both `followers` and `following`;
/// the relationship engine keeps the two sides mirrored.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FollowEntry {
    pub user_id: String,
    pub followed_at: String,
}

/// A pending follow request, embedded in the receiver's document.
/// Presence in `follow_requests` is what "pending" means; accepted
/// and denied requests are simply removed.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub sender: String,
    pub receiver: String,
    pub requested_at: String,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile_url: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub followers: Vec<FollowEntry>,
    #[serde(default)]
    pub following: Vec<FollowEntry>,
    #[serde(default)]
    pub follow_requests: Vec<FollowRequest>,
    #[serde(default)]
    pub posts: Vec<String>,
    #[serde(default)]
    pub post_count: u32,
    #[serde(default)]
    pub profile_views: u32,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Gif,
}

impl MediaType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            "gif" => Some(MediaType::Gif),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_id: String,
    pub text: String,
    #[serde(default)]
    pub likes: Vec<String>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub media_type: MediaType,
    pub media_url: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}

/// Profile fields safe to hand out when joining another user into a
/// response (no password, no email).
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_url: String,
    pub profession: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_url: user.profile_url.clone(),
            profession: user.profession.clone(),
        }
    }
}
