//! End-to-end scenario over the relationship and feed engines: two users
//! sign up, one requests to follow the other, the request is accepted,
//! and the new follower starts seeing the followee's posts.

use pulse::config::{user_key, USERS_LIST_KEY};
use pulse::core::helpers::now_iso;
use pulse::core::store::{KvStore, MemoryStore};
use pulse::models::models::{MediaType, User};
use pulse::posts::{store_post, visible_posts};
use pulse::relationship::{
    accept_follow_request, discover_users, followers_and_following, pending_requests,
    send_follow_request, FollowStatus,
};
use uuid::Uuid;

fn register(store: &MemoryStore, first_name: &str, last_name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!("{}@example.com", first_name.to_lowercase()),
        password: "digest".to_string(),
        profile_url: format!("/avatars/{}.png", first_name.to_lowercase()),
        location: None,
        profession: Some("engineer".to_string()),
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

fn load(store: &MemoryStore, id: &str) -> User {
    store.get_json(&user_key(id)).unwrap().unwrap()
}

#[test]
fn follow_request_to_feed_flow() {
    let store = MemoryStore::new();

    // Two users register
    let alice = register(&store, "Alice", "Munteanu");
    let bob = register(&store, "Bob", "Petrescu");

    // Before any relationship, Alice sees Bob on explore with "Follow"
    let entries = discover_users(&store, &load(&store, &alice)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user.id, bob);
    assert_eq!(entries[0].status, FollowStatus::Follow);

    // Alice sends Bob a follow request
    assert!(send_follow_request(&store, &alice, &bob).unwrap());

    // Bob's inbox shows exactly one request, from Alice, with her details
    let inbox = pending_requests(&store, &load(&store, &bob)).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].sender, alice);
    assert_eq!(
        inbox[0].sender_details.as_ref().unwrap().first_name,
        "Alice"
    );

    // Alice's explore now shows the request as sent
    let entries = discover_users(&store, &load(&store, &alice)).unwrap();
    assert_eq!(entries[0].status, FollowStatus::RequestSent);

    // Bob's posts are not visible to Alice yet
    let mut bob_doc = load(&store, &bob);
    store_post(
        &store,
        &mut bob_doc,
        "Bob's first post".to_string(),
        MediaType::Image,
        "/api/media/bob1".to_string(),
    )
    .unwrap();
    assert!(visible_posts(&store, &load(&store, &alice)).unwrap().is_empty());

    // Bob accepts
    assert!(accept_follow_request(&store, &bob, &alice).unwrap());

    // Both sides of the relationship are mirrored
    let (_, alice_following) = followers_and_following(&store, &load(&store, &alice)).unwrap();
    assert_eq!(alice_following.len(), 1);
    assert_eq!(alice_following[0].id, bob);

    let (bob_followers, _) = followers_and_following(&store, &load(&store, &bob)).unwrap();
    assert_eq!(bob_followers.len(), 1);
    assert_eq!(bob_followers[0].id, alice);

    // The inbox is clear and Bob has left Alice's explore list
    assert!(pending_requests(&store, &load(&store, &bob)).unwrap().is_empty());
    assert!(discover_users(&store, &load(&store, &alice)).unwrap().is_empty());

    // Bob's post is now in Alice's feed, with his denormalized summary
    let feed = visible_posts(&store, &load(&store, &alice)).unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].description, "Bob's first post");
    assert_eq!(feed[0].owner.first_name, "Bob");

    // The follow is one-directional: Bob still sees only his own post
    let bob_feed = visible_posts(&store, &load(&store, &bob)).unwrap();
    assert_eq!(bob_feed.len(), 1);
    assert_eq!(bob_feed[0].owner.first_name, "Bob");
}
