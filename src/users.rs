use spin_sdk::http::{Request, Response};
use uuid::Uuid;
use crate::models::models::User;
use crate::config::{user_key, MAX_NAME_LENGTH, MIN_PASSWORD_LENGTH, USERS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{store, hash_password, now_iso, sanitize_text, validate_uuid};
use crate::core::store::KvStore;
use crate::auth::validate_token;

/// Public view of a user document: everything except password and email.
fn profile_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "firstName": user.first_name,
        "lastName": user.last_name,
        "profileUrl": user.profile_url,
        "location": user.location,
        "profession": user.profession,
        "followers": user.followers,
        "following": user.following,
        "postCount": user.post_count,
        "profileViews": user.profile_views,
        "createdAt": user.created_at,
    })
}

/// Insert a new user document and register it in the users list.
/// Returns false when the email is already taken; nothing is written
/// in that case.
pub fn create_user<S: KvStore>(store: &S, user: &User) -> anyhow::Result<bool> {
    let existing_users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &existing_users {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            if u.email == user.email {
                return Ok(false);
            }
        }
    }

    store.set_json(&user_key(&user.id), user)?;

    let mut users = existing_users;
    users.push(user.id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;
    Ok(true)
}

/// Bump a profile's view counter. Returns the new count, or None when
/// the user does not exist.
pub fn increment_profile_views<S: KvStore>(
    store: &S,
    user_id: &str,
) -> anyhow::Result<Option<u32>> {
    let key = user_key(user_id);
    let Some(mut user) = store.get_json::<User>(&key)? else {
        return Ok(None);
    };
    user.profile_views += 1;
    store.set_json(&key, &user)?;
    Ok(Some(user.profile_views))
}

pub fn register(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let body: serde_json::Value = serde_json::from_slice(req.body())?;

    let first_name = body["firstName"].as_str().unwrap_or("").trim();
    let last_name = body["lastName"].as_str().unwrap_or("").trim();
    let email = body["email"].as_str().unwrap_or("").trim().to_lowercase();
    let password = body["password"].as_str().unwrap_or("");

    if first_name.is_empty() || last_name.is_empty() {
        return Ok(ApiError::BadRequest("First and last name are required".to_string()).into());
    }
    if first_name.len() > MAX_NAME_LENGTH || last_name.len() > MAX_NAME_LENGTH {
        return Ok(ApiError::BadRequest("Name too long".to_string()).into());
    }
    if email.is_empty() || !email.contains('@') {
        return Ok(ApiError::BadRequest("A valid email is required".to_string()).into());
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Ok(ApiError::BadRequest("Password must be at least 3 characters".to_string()).into());
    }

    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        first_name: sanitize_text(first_name),
        last_name: sanitize_text(last_name),
        email,
        password: hash_password(password)?,
        profile_url: body["profileUrl"].as_str().unwrap_or("").to_string(),
        location: body["location"].as_str().map(sanitize_text),
        profession: body["profession"].as_str().map(sanitize_text),
        followers: Vec::new(),
        following: Vec::new(),
        follow_requests: Vec::new(),
        posts: Vec::new(),
        post_count: 0,
        profile_views: 0,
        created_at: now_iso(),
    };

    if !create_user(&store, &user)? {
        return Ok(ApiError::Conflict("User already exists".to_string()).into());
    }

    let resp = serde_json::json!({
        "message": "User registered successfully",
        "userId": id
    });
    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn get_profile(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let path = req.path().to_string();
    let user_id = path.trim_start_matches("/api/users/profile/");
    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    if let Some(user) = store.get_json::<User>(&user_key(user_id))? {
        Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&profile_json(&user))?)
            .build())
    } else {
        Ok(ApiError::NotFound("User not found".to_string()).into())
    }
}

pub fn update_profile(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let path = req.path().to_string();
    let user_id = path.trim_start_matches("/api/users/profile/");
    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    let key = user_key(user_id);
    let Some(mut user) = store.get_json::<User>(&key)? else {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    };

    let body: serde_json::Value = serde_json::from_slice(req.body())?;

    if let Some(first_name) = body["firstName"].as_str() {
        let first_name = first_name.trim();
        if first_name.is_empty() || first_name.len() > MAX_NAME_LENGTH {
            return Ok(ApiError::BadRequest("Invalid first name".to_string()).into());
        }
        user.first_name = sanitize_text(first_name);
    }
    if let Some(last_name) = body["lastName"].as_str() {
        let last_name = last_name.trim();
        if last_name.is_empty() || last_name.len() > MAX_NAME_LENGTH {
            return Ok(ApiError::BadRequest("Invalid last name".to_string()).into());
        }
        user.last_name = sanitize_text(last_name);
    }
    if let Some(location) = body["location"].as_str() {
        let location = sanitize_text(location);
        user.location = if location.is_empty() { None } else { Some(location) };
    }
    if let Some(profession) = body["profession"].as_str() {
        let profession = sanitize_text(profession);
        user.profession = if profession.is_empty() { None } else { Some(profession) };
    }
    if let Some(profile_url) = body["profileUrl"].as_str() {
        user.profile_url = profile_url.to_string();
    }

    store.set_json(&key, &user)?;

    let resp = serde_json::json!({
        "message": "User details updated successfully",
        "updatedUser": profile_json(&user)
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn view_profile(req: Request) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let user_id = path
        .trim_start_matches("/api/users/profile/")
        .trim_end_matches("/view");
    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    match increment_profile_views(&store, user_id)? {
        Some(views) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({ "profileViews": views }))?)
            .build()),
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::test_support::seed_user;
    use uuid::Uuid;

    fn build_user(email: &str) -> User {
        User {
            id: Uuid::new_v4().to_string(),
            first_name: "Ana".to_string(),
            last_name: "Pop".to_string(),
            email: email.to_string(),
            password: "digest".to_string(),
            profile_url: String::new(),
            location: None,
            profession: None,
            followers: Vec::new(),
            following: Vec::new(),
            follow_requests: Vec::new(),
            posts: Vec::new(),
            post_count: 0,
            profile_views: 0,
            created_at: now_iso(),
        }
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        assert!(create_user(&store, &build_user("ana@example.com")).unwrap());

        let second = build_user("ana@example.com");
        assert!(!create_user(&store, &second).unwrap());

        // The refused registration left nothing behind
        let users: Vec<String> = store.get_json(USERS_LIST_KEY).unwrap().unwrap();
        assert_eq!(users.len(), 1);
        assert!(store
            .get_json::<User>(&user_key(&second.id))
            .unwrap()
            .is_none());
    }

    #[test]
    fn distinct_emails_both_register() {
        let store = MemoryStore::new();
        assert!(create_user(&store, &build_user("ana@example.com")).unwrap());
        assert!(create_user(&store, &build_user("bogdan@example.com")).unwrap());

        let users: Vec<String> = store.get_json(USERS_LIST_KEY).unwrap().unwrap();
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn profile_views_increment_per_view() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "Ana", "Pop");

        assert_eq!(increment_profile_views(&store, &a).unwrap(), Some(1));
        assert_eq!(increment_profile_views(&store, &a).unwrap(), Some(2));

        let user: User = store.get_json(&user_key(&a)).unwrap().unwrap();
        assert_eq!(user.profile_views, 2);
    }

    #[test]
    fn viewing_a_missing_profile_is_none() {
        let store = MemoryStore::new();
        assert!(increment_profile_views(&store, "missing").unwrap().is_none());
    }
}
