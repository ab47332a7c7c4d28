use spin_sdk::http::{Request, Response};
use uuid::Uuid;
use crate::models::models::{User, TokenData};
use crate::config::{token_expiration_hours, token_key, user_key, USERS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{store, now_iso, verify_password};
use crate::core::store::KvStore;

pub fn login(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let creds: serde_json::Value = serde_json::from_slice(req.body())?;
    let email = creds["email"].as_str().unwrap_or_default();
    let password = creds["password"].as_str().unwrap_or_default();

    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();

    for id in users {
        if let Some(u) = store.get_json::<User>(&user_key(&id))? {
            if u.email == email && verify_password(password, &u.password) {
                let token = Uuid::new_v4().to_string();
                let data = TokenData {
                    user_id: u.id.clone(),
                    created_at: now_iso(),
                };
                store.set_json(&token_key(&token), &data)?;

                let resp = serde_json::json!({
                    "message": "Login successful",
                    "token": token,
                    "userId": u.id
                });
                return Ok(Response::builder()
                    .status(200)
                    .header("Content-Type", "application/json")
                    .body(serde_json::to_vec(&resp)?)
                    .build());
            }
        }
    }

    Ok(ApiError::Unauthorized.into())
}

pub fn logout(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let auth_header = req.header("Authorization").and_then(|h| h.as_str()).unwrap_or_default();

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return Ok(ApiError::Unauthorized.into());
    };
    KvStore::delete(&store, &token_key(token))?;

    let resp = serde_json::json!({ "message": "Logged out successfully" });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

fn token_expired(created_at: &str) -> bool {
    match chrono::DateTime::parse_from_rfc3339(created_at) {
        Ok(created) => {
            let now = chrono::Utc::now();
            let age_hours = (now - created.with_timezone(&chrono::Utc)).num_hours();
            age_hours > token_expiration_hours()
        }
        Err(_) => false,
    }
}

/// Look up a bearer token and resolve it to a live user id. Expired
/// tokens and tokens whose user record has been deleted resolve to
/// nothing.
pub fn resolve_token<S: KvStore>(store: &S, token: &str) -> anyhow::Result<Option<String>> {
    let Some(data) = store.get_json::<TokenData>(&token_key(token))? else {
        return Ok(None);
    };
    if token_expired(&data.created_at) {
        return Ok(None);
    }
    if store.get_json::<User>(&user_key(&data.user_id))?.is_none() {
        return Ok(None);
    }
    Ok(Some(data.user_id))
}

/// Resolve the caller identity from the bearer token, or reject.
pub fn validate_token(req: &Request) -> Option<String> {
    let auth_header = req.header("Authorization")?.as_str().unwrap_or_default();
    let token = auth_header.strip_prefix("Bearer ")?;
    resolve_token(&store(), token).ok()?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{KvStore, MemoryStore};
    use crate::test_support::seed_user;

    fn issue_token<S: KvStore>(store: &S, user_id: &str, created_at: String) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let data = TokenData {
            user_id: user_id.to_string(),
            created_at,
        };
        store.set_json(&token_key(&token), &data).unwrap();
        token
    }

    #[test]
    fn fresh_token_resolves_to_its_user() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "Ana", "Pop");
        let token = issue_token(&store, &a, now_iso());

        assert_eq!(resolve_token(&store, &token).unwrap(), Some(a));
    }

    #[test]
    fn expired_token_is_rejected() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "Ana", "Pop");

        // Two days old, well past the default 24h expiry window
        let stale = (chrono::Utc::now() - chrono::Duration::hours(48)).to_rfc3339();
        let token = issue_token(&store, &a, stale);

        assert_eq!(resolve_token(&store, &token).unwrap(), None);
    }

    #[test]
    fn token_for_deleted_user_is_rejected() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "Ana", "Pop");
        let token = issue_token(&store, &a, now_iso());

        store.delete(&user_key(&a)).unwrap();
        assert_eq!(resolve_token(&store, &token).unwrap(), None);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = MemoryStore::new();
        assert_eq!(resolve_token(&store, "no-such-token").unwrap(), None);
    }
}
