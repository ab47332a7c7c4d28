use serde::Serialize;
use spin_sdk::http::{Request, Response};
use std::collections::HashSet;
use crate::models::models::{FollowEntry, FollowRequest, User, UserSummary};
use crate::config::{user_key, USERS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{store, now_iso};
use crate::core::store::KvStore;
use crate::auth::validate_token;

/// Derived follow state shown next to each user on the explore page.
#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum FollowStatus {
    #[serde(rename = "Follow")]
    Follow,
    #[serde(rename = "Following You")]
    FollowingYou,
    #[serde(rename = "Follow Request Sent")]
    RequestSent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverEntry {
    #[serde(flatten)]
    pub user: UserSummary,
    pub status: FollowStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_url: String,
    pub profession: Option<String>,
    pub followed_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequestView {
    pub sender: String,
    pub receiver: String,
    pub requested_at: String,
    pub sender_details: Option<UserSummary>,
}

/// Every user except the caller and the caller's current following set,
/// annotated with the derived follow status. "Following You" wins over
/// "Follow Request Sent" when both conditions hold.
pub fn discover_users<S: KvStore>(store: &S, caller: &User) -> anyhow::Result<Vec<DiscoverEntry>> {
    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();

    let following: HashSet<&str> = caller.following.iter().map(|f| f.user_id.as_str()).collect();
    let followers: HashSet<&str> = caller.followers.iter().map(|f| f.user_id.as_str()).collect();

    let mut entries = Vec::new();
    for id in &ids {
        if id == &caller.id || following.contains(id.as_str()) {
            continue;
        }
        let Some(user) = store.get_json::<User>(&user_key(id))? else {
            continue;
        };

        let status = if followers.contains(id.as_str()) {
            FollowStatus::FollowingYou
        } else if user.follow_requests.iter().any(|r| r.sender == caller.id) {
            FollowStatus::RequestSent
        } else {
            FollowStatus::Follow
        };

        entries.push(DiscoverEntry {
            user: UserSummary::from(&user),
            status,
        });
    }

    Ok(entries)
}

/// Append a pending request to the receiver's inbox. Returns false when
/// the receiver does not exist. A request already pending from the same
/// sender is left as-is rather than duplicated.
pub fn send_follow_request<S: KvStore>(
    store: &S,
    sender_id: &str,
    receiver_id: &str,
) -> anyhow::Result<bool> {
    let key = user_key(receiver_id);
    let Some(mut receiver) = store.get_json::<User>(&key)? else {
        return Ok(false);
    };

    if !receiver.follow_requests.iter().any(|r| r.sender == sender_id) {
        receiver.follow_requests.push(FollowRequest {
            sender: sender_id.to_string(),
            receiver: receiver_id.to_string(),
            requested_at: now_iso(),
        });
        store.set_json(&key, &receiver)?;
    }

    Ok(true)
}

/// The caller's pending requests joined with each sender's summary
/// profile. A sender deleted since the request was made shows as null.
pub fn pending_requests<S: KvStore>(
    store: &S,
    caller: &User,
) -> anyhow::Result<Vec<PendingRequestView>> {
    let mut views = Vec::new();
    for request in &caller.follow_requests {
        let sender_details = store
            .get_json::<User>(&user_key(&request.sender))?
            .map(|u| UserSummary::from(&u));
        views.push(PendingRequestView {
            sender: request.sender.clone(),
            receiver: request.receiver.clone(),
            requested_at: request.requested_at.clone(),
            sender_details,
        });
    }
    Ok(views)
}

/// Accept a pending request: requester joins the current user's
/// followers, the request leaves the inbox, and the current user joins
/// the requester's following. Both edges carry the same timestamp.
///
/// Both user records are loaded before anything is written, so a
/// missing user returns false with no partial edge. The writes
/// themselves are two independent single-document updates; a crash
/// between them leaves a half-applied follow. Repeat calls are
/// absorbed by the unique-add on both sides.
pub fn accept_follow_request<S: KvStore>(
    store: &S,
    current_user_id: &str,
    requester_id: &str,
) -> anyhow::Result<bool> {
    let current_key = user_key(current_user_id);
    let requester_key = user_key(requester_id);

    let Some(mut current) = store.get_json::<User>(&current_key)? else {
        return Ok(false);
    };
    let Some(mut requester) = store.get_json::<User>(&requester_key)? else {
        return Ok(false);
    };

    let followed_at = now_iso();

    if !current.followers.iter().any(|f| f.user_id == requester_id) {
        current.followers.push(FollowEntry {
            user_id: requester_id.to_string(),
            followed_at: followed_at.clone(),
        });
    }
    current.follow_requests.retain(|r| r.sender != requester_id);
    store.set_json(&current_key, &current)?;

    // Second document write: the mirror edge on the requester
    if !requester.following.iter().any(|f| f.user_id == current_user_id) {
        requester.following.push(FollowEntry {
            user_id: current_user_id.to_string(),
            followed_at,
        });
    }
    store.set_json(&requester_key, &requester)?;

    Ok(true)
}

/// Remove the matching pending request; no relationship is created.
pub fn deny_follow_request<S: KvStore>(
    store: &S,
    current_user_id: &str,
    requester_id: &str,
) -> anyhow::Result<bool> {
    let key = user_key(current_user_id);
    let Some(mut current) = store.get_json::<User>(&key)? else {
        return Ok(false);
    };

    current.follow_requests.retain(|r| r.sender != requester_id);
    store.set_json(&key, &current)?;
    Ok(true)
}

/// Resolve the caller's follower and following id references to display
/// summaries, keeping the stored followedAt per entry. Dangling
/// references are skipped.
pub fn followers_and_following<S: KvStore>(
    store: &S,
    caller: &User,
) -> anyhow::Result<(Vec<FollowView>, Vec<FollowView>)> {
    let resolve = |entries: &[FollowEntry]| -> anyhow::Result<Vec<FollowView>> {
        let mut views = Vec::new();
        for entry in entries {
            if let Some(user) = store.get_json::<User>(&user_key(&entry.user_id))? {
                views.push(FollowView {
                    id: user.id,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    profile_url: user.profile_url,
                    profession: user.profession,
                    followed_at: entry.followed_at.clone(),
                });
            }
        }
        Ok(views)
    };

    Ok((resolve(&caller.followers)?, resolve(&caller.following)?))
}

// === HTTP Handlers ===

fn json_response<T: Serialize>(status: u16, body: &T) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(body)?)
        .build())
}

fn load_caller<S: KvStore>(store: &S, caller_id: &str) -> anyhow::Result<Option<User>> {
    store.get_json::<User>(&user_key(caller_id))
}

pub fn explore(req: Request) -> anyhow::Result<Response> {
    let Some(caller_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let store = store();
    let Some(caller) = load_caller(&store, &caller_id)? else {
        return Ok(ApiError::NotFound("Current user not found".to_string()).into());
    };

    let users = discover_users(&store, &caller)?;
    json_response(200, &serde_json::json!({ "users": users }))
}

pub fn handle_send_request(req: Request) -> anyhow::Result<Response> {
    let Some(caller_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let sender_id = body["senderId"].as_str().unwrap_or(&caller_id).to_string();
    let receiver_id = body["receiverId"].as_str().unwrap_or_default();

    if receiver_id.is_empty() || receiver_id == sender_id {
        return Ok(ApiError::BadRequest("Invalid receiver".to_string()).into());
    }

    let store = store();
    if !send_follow_request(&store, &sender_id, receiver_id)? {
        return Ok(ApiError::NotFound("Receiver not found".to_string()).into());
    }

    json_response(200, &serde_json::json!({ "message": "Follow request sent" }))
}

pub fn list_follow_requests(req: Request) -> anyhow::Result<Response> {
    let Some(caller_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let store = store();
    let Some(caller) = load_caller(&store, &caller_id)? else {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    };

    let requests = pending_requests(&store, &caller)?;
    json_response(200, &serde_json::json!({ "followRequests": requests }))
}

pub fn accept_follow(req: Request) -> anyhow::Result<Response> {
    let Some(caller_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let current_user_id = body["currentUserId"].as_str().unwrap_or(&caller_id).to_string();
    let requester_id = body["requesterId"].as_str().unwrap_or_default();

    if requester_id.is_empty() {
        return Ok(ApiError::BadRequest("Requester ID required".to_string()).into());
    }

    let store = store();
    if !accept_follow_request(&store, &current_user_id, requester_id)? {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    }

    json_response(200, &serde_json::json!({ "message": "Follow request accepted" }))
}

pub fn deny_follow(req: Request) -> anyhow::Result<Response> {
    let Some(caller_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let current_user_id = body["currentUserId"].as_str().unwrap_or(&caller_id).to_string();
    let requester_id = body["requesterId"].as_str().unwrap_or_default();

    if requester_id.is_empty() {
        return Ok(ApiError::BadRequest("Requester ID required".to_string()).into());
    }

    let store = store();
    if !deny_follow_request(&store, &current_user_id, requester_id)? {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    }

    json_response(200, &serde_json::json!({ "message": "Follow request denied" }))
}

pub fn followers_following(req: Request) -> anyhow::Result<Response> {
    let Some(caller_id) = validate_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    let store = store();
    let Some(caller) = load_caller(&store, &caller_id)? else {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    };

    let (followers, following) = followers_and_following(&store, &caller)?;
    json_response(
        200,
        &serde_json::json!({ "followers": followers, "following": following }),
    )
}
