use serde::Serialize;
use spin_sdk::http::{Request, Response};
use std::collections::HashSet;
use uuid::Uuid;
use crate::models::models::{Comment, MediaType, Post, User};
use crate::config::{post_key, user_key, FEED_KEY, MAX_COMMENT_LENGTH, MAX_DESCRIPTION_LENGTH};
use crate::core::errors::ApiError;
use crate::core::helpers::{store, now_iso, sanitize_text};
use crate::core::store::KvStore;
use crate::auth::validate_token;

/// Denormalized owner fields attached to every post in a feed response.
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub first_name: String,
    pub last_name: String,
    pub profile_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub owner: OwnerSummary,
    pub description: String,
    pub media_type: MediaType,
    pub media_url: String,
    pub likes: Vec<String>,
    pub comments: Vec<Comment>,
    pub created_at: String,
}

impl PostView {
    fn new(post: Post, owner: &User) -> Self {
        PostView {
            id: post.id,
            owner: OwnerSummary {
                first_name: owner.first_name.clone(),
                last_name: owner.last_name.clone(),
                profile_url: owner.profile_url.clone(),
            },
            description: post.description,
            media_type: post.media_type,
            media_url: post.media_url,
            likes: post.likes,
            comments: post.comments,
            created_at: post.created_at,
        }
    }
}

/// Store a new post and wire it into its owner's document and the
/// global feed list.
pub fn store_post<S: KvStore>(
    store: &S,
    owner: &mut User,
    description: String,
    media_type: MediaType,
    media_url: String,
) -> anyhow::Result<Post> {
    let id = Uuid::new_v4().to_string();
    let post = Post {
        id: id.clone(),
        user_id: owner.id.clone(),
        description,
        media_type,
        media_url,
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&post_key(&id), &post)?;

    owner.posts.push(id.clone());
    owner.post_count += 1;
    store.set_json(&user_key(&owner.id), owner)?;

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.insert(0, id);
    store.set_json(FEED_KEY, &feed)?;

    Ok(post)
}

/// Posts the caller may see, newest first: their own, plus anyone in
/// their following set, plus mutual followers. Visibility is derived
/// from the relationship graph on every read; nothing is materialized.
pub fn visible_posts<S: KvStore>(store: &S, caller: &User) -> anyhow::Result<Vec<PostView>> {
    let following: HashSet<&str> = caller.following.iter().map(|f| f.user_id.as_str()).collect();
    let followers: HashSet<&str> = caller.followers.iter().map(|f| f.user_id.as_str()).collect();
    // Mutuals are a subset of following today; the clause stays separate
    // so the rule survives if the two sets ever diverge.
    let mutual: HashSet<&str> = following.intersection(&followers).copied().collect();

    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();

    let mut posts = Vec::new();
    for post_id in &feed {
        let Some(post) = store.get_json::<Post>(&post_key(post_id))? else {
            continue;
        };
        let owner_id = post.user_id.as_str();
        let visible = owner_id == caller.id
            || following.contains(owner_id)
            || mutual.contains(owner_id);
        if !visible {
            continue;
        }
        // Posts whose owner record has vanished are dropped
        if let Some(owner) = store.get_json::<User>(&user_key(owner_id))? {
            posts.push(PostView::new(post, &owner));
        }
    }

    // RFC3339 UTC timestamps order lexically
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

/// Toggle the caller's like on a post. Returns the updated post, or
/// None when the post does not exist.
pub fn toggle_like<S: KvStore>(
    store: &S,
    post_id: &str,
    user_id: &str,
) -> anyhow::Result<Option<Post>> {
    let key = post_key(post_id);
    let Some(mut post) = store.get_json::<Post>(&key)? else {
        return Ok(None);
    };

    if post.likes.iter().any(|id| id == user_id) {
        post.likes.retain(|id| id != user_id);
    } else {
        post.likes.push(user_id.to_string());
    }
    store.set_json(&key, &post)?;
    Ok(Some(post))
}

/// Append a comment to a post. Returns None when the post is missing.
pub fn add_comment<S: KvStore>(
    store: &S,
    post_id: &str,
    user_id: &str,
    text: String,
) -> anyhow::Result<Option<Post>> {
    let key = post_key(post_id);
    let Some(mut post) = store.get_json::<Post>(&key)? else {
        return Ok(None);
    };

    post.comments.push(Comment {
        user_id: user_id.to_string(),
        text,
        likes: Vec::new(),
        created_at: now_iso(),
    });
    store.set_json(&key, &post)?;
    Ok(Some(post))
}

// === HTTP Handlers ===

pub fn create_post(req: Request) -> anyhow::Result<Response> {
    let Some(user_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let store = store();
    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let description = body["description"].as_str().unwrap_or_default();
    let media_url = body["mediaUrl"].as_str().unwrap_or_default();

    if description.is_empty() || description.len() > MAX_DESCRIPTION_LENGTH {
        return Ok(ApiError::BadRequest("Invalid description".to_string()).into());
    }
    let Some(media_type) = body["mediaType"].as_str().and_then(MediaType::parse) else {
        return Ok(ApiError::BadRequest("mediaType must be image, video or gif".to_string()).into());
    };
    if media_url.is_empty() {
        return Ok(ApiError::BadRequest("mediaUrl is required".to_string()).into());
    }

    let Some(mut owner) = store.get_json::<User>(&user_key(&user_id))? else {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    };

    let post = store_post(
        &store,
        &mut owner,
        sanitize_text(description),
        media_type,
        media_url.to_string(),
    )?;

    let resp = serde_json::json!({
        "message": "Post created successfully",
        "post": PostView::new(post, &owner)
    });
    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn get_posts(req: Request) -> anyhow::Result<Response> {
    let Some(user_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let store = store();
    let Some(caller) = store.get_json::<User>(&user_key(&user_id))? else {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    };

    let posts = visible_posts(&store, &caller)?;
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "posts": posts }))?)
        .build())
}

fn post_id_from_path<'a>(path: &'a str, suffix: &str) -> &'a str {
    path.trim_start_matches("/api/posts/").trim_end_matches(suffix)
}

pub fn like_post(req: Request) -> anyhow::Result<Response> {
    let Some(user_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let path = req.path().to_string();
    let post_id = post_id_from_path(&path, "/like");
    if post_id.is_empty() {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    match toggle_like(&store, post_id, &user_id)? {
        Some(post) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({ "likes": post.likes }))?)
            .build()),
        None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
    }
}

pub fn comment_post(req: Request) -> anyhow::Result<Response> {
    let Some(user_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let path = req.path().to_string();
    let post_id = post_id_from_path(&path, "/comment");
    if post_id.is_empty() {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let text = body["text"].as_str().unwrap_or_default();
    if text.is_empty() || text.len() > MAX_COMMENT_LENGTH {
        return Ok(ApiError::BadRequest("Invalid comment".to_string()).into());
    }

    let store = store();
    match add_comment(&store, post_id, &user_id, sanitize_text(text))? {
        Some(post) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({ "comments": post.comments }))?)
            .build()),
        None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
    }
}
