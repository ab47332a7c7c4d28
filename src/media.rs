use serde::{Serialize, Deserialize};
use spin_sdk::http::{Request, Response};
use uuid::Uuid;
use crate::models::models::MediaType;
use crate::config::{media_key, media_meta_key, ALLOWED_MEDIA_CONTENT_TYPES, MAX_MEDIA_BYTES};
use crate::core::errors::ApiError;
use crate::core::helpers::store;
use crate::core::store::KvStore;
use crate::auth::validate_token;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMeta {
    pub content_type: String,
    pub media_type: MediaType,
    pub size: usize,
}

/// Classify an upload by its filename. Only the formats the feed can
/// render are accepted; anything else is a validation failure.
pub fn classify(file_name: &str) -> Option<(MediaType, String)> {
    let mime = mime_guess::from_path(file_name).first()?;
    let essence = mime.essence_str().to_string();
    if !ALLOWED_MEDIA_CONTENT_TYPES.contains(&essence.as_str()) {
        return None;
    }
    let media_type = if essence == "image/gif" {
        MediaType::Gif
    } else if mime.type_() == mime_guess::mime::VIDEO {
        MediaType::Video
    } else {
        MediaType::Image
    };
    Some((media_type, essence))
}

pub fn save_media<S: KvStore>(
    store: &S,
    media_type: MediaType,
    content_type: String,
    data: &[u8],
) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    store.set_raw(&media_key(&id), data)?;
    store.set_json(
        &media_meta_key(&id),
        &MediaMeta {
            content_type,
            media_type,
            size: data.len(),
        },
    )?;
    Ok(id)
}

pub fn load_media<S: KvStore>(store: &S, id: &str) -> anyhow::Result<Option<(MediaMeta, Vec<u8>)>> {
    let Some(meta) = store.get_json::<MediaMeta>(&media_meta_key(id))? else {
        return Ok(None);
    };
    let Some(data) = store.get_raw(&media_key(id))? else {
        return Ok(None);
    };
    Ok(Some((meta, data)))
}

// === HTTP Handlers ===

pub fn upload(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let file_name = req
        .header("X-File-Name")
        .and_then(|h| h.as_str())
        .unwrap_or_default()
        .to_string();
    if file_name.is_empty() {
        return Ok(ApiError::BadRequest("X-File-Name header required".to_string()).into());
    }

    let body = req.body();
    if body.is_empty() {
        return Ok(ApiError::BadRequest("Empty upload".to_string()).into());
    }
    if body.len() > MAX_MEDIA_BYTES {
        return Ok(ApiError::BadRequest("File exceeds 100MB limit".to_string()).into());
    }

    let Some((media_type, content_type)) = classify(&file_name) else {
        return Ok(ApiError::BadRequest("Unsupported media format".to_string()).into());
    };

    let store = store();
    let id = save_media(&store, media_type, content_type, body)?;

    let resp = serde_json::json!({
        "mediaType": media_type,
        "mediaUrl": format!("/api/media/{}", id)
    });
    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn serve(req: Request) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let id = path.trim_start_matches("/api/media/");
    if id.is_empty() {
        return Ok(ApiError::BadRequest("Media ID required".to_string()).into());
    }

    let store = store();
    match load_media(&store, id)? {
        Some((meta, data)) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", meta.content_type.as_str())
            .body(data)
            .build()),
        None => Ok(ApiError::NotFound("Media not found".to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    #[test]
    fn classify_maps_extensions_to_media_types() {
        assert_eq!(classify("cat.gif").unwrap().0, MediaType::Gif);
        assert_eq!(classify("cat.jpg").unwrap().0, MediaType::Image);
        assert_eq!(classify("cat.png").unwrap().0, MediaType::Image);
        assert_eq!(classify("clip.mp4").unwrap().0, MediaType::Video);
    }

    #[test]
    fn classify_rejects_unsupported_formats() {
        assert!(classify("notes.txt").is_none());
        assert!(classify("page.html").is_none());
        assert!(classify("noextension").is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let store = MemoryStore::new();
        let data = b"fake image bytes";
        let id = save_media(&store, MediaType::Image, "image/png".to_string(), data).unwrap();

        let (meta, loaded) = load_media(&store, &id).unwrap().unwrap();
        assert_eq!(meta.content_type, "image/png");
        assert_eq!(meta.size, data.len());
        assert_eq!(loaded, data);
    }

    #[test]
    fn load_missing_media_is_none() {
        let store = MemoryStore::new();
        assert!(load_media(&store, "missing").unwrap().is_none());
    }
}
