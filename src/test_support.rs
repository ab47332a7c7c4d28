use uuid::Uuid;
use crate::models::models::User;
use crate::config::{user_key, USERS_LIST_KEY};
use crate::core::helpers::now_iso;
use crate::core::store::KvStore;

pub fn seed_user<S: KvStore>(store: &S, first_name: &str, last_name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!("{}@example.com", first_name.to_lowercase()),
        password: "digest".to_string(),
        profile_url: String::new(),
        location: None,
        profession: Some("tester".to_string()),
        followers: Vec::new(),
        following: Vec::new(),
        follow_requests: Vec::new(),
        posts: Vec::new(),
        post_count: 0,
        profile_views: 0,
        created_at: now_iso(),
    };
    store.set_json(&user_key(&id), &user).unwrap();

    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY).unwrap().unwrap_or_default();
    users.push(id.clone());
    store.set_json(USERS_LIST_KEY, &users).unwrap();
    id
}
