use spin_sdk::{
    http::{IntoResponse, Request, Response},
    http_component,
};

pub mod auth;
pub mod config;
pub mod core;
pub mod media;
pub mod models;
pub mod posts;
pub mod relationship;
pub mod users;

#[cfg(test)]
pub mod test_support;

// === Component entrypoint ===
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let path = req.path().to_string();
    let method = req.method().to_string();
    log::debug!("{} {}", method, path);

    match (method.as_str(), path.as_str()) {
        ("POST", "/api/users/register") => users::register(req),
        ("POST", "/api/users/login") => auth::login(req),
        ("POST", "/api/users/logout") => auth::logout(req),
        ("GET", p) if p.starts_with("/api/users/profile/") => users::get_profile(req),
        ("PUT", p) if p.starts_with("/api/users/profile/") => users::update_profile(req),
        ("POST", p) if p.starts_with("/api/users/profile/") && p.ends_with("/view") => {
            users::view_profile(req)
        }
        ("GET", "/api/users/explore") => relationship::explore(req),
        ("POST", "/api/users/send-follow-request") => relationship::handle_send_request(req),
        ("GET", "/api/users/follow-requests") => relationship::list_follow_requests(req),
        ("POST", "/api/users/accept-follow") => relationship::accept_follow(req),
        ("POST", "/api/users/deny-follow") => relationship::deny_follow(req),
        ("GET", "/api/users/followers-following") => relationship::followers_following(req),
        ("POST", "/api/posts/new-post") => posts::create_post(req),
        ("GET", "/api/posts/getall-posts") => posts::get_posts(req),
        ("POST", p) if p.starts_with("/api/posts/") && p.ends_with("/like") => {
            posts::like_post(req)
        }
        ("POST", p) if p.starts_with("/api/posts/") && p.ends_with("/comment") => {
            posts::comment_post(req)
        }
        ("POST", "/api/media/upload") => media::upload(req),
        ("GET", p) if p.starts_with("/api/media/") => media::serve(req),
        _ => Ok(Response::builder()
            .status(404)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({"message": "Not found"}))?)
            .build()),
    }
}
