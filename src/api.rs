//! Contract with the network collaborator.
//!
//! The transport itself lives outside this crate; everything here talks to it
//! through the [`Api`] trait, which mirrors the one call the app makes:
//! `fetch(method, path, body?, token?)` returning a status and a body. Typed
//! helpers below wrap the individual endpoints and map non-2xx responses into
//! the [`ApiError`] taxonomy.

use futures_util::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use thiserror::Error as ThisError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// Raw response from the transport: the status code and the body text,
/// whether that text turns out to be JSON or not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|err| ApiError::Network(format!("unreadable server response: {}", err)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ApiError {
    /// Refused client-side, before any network call.
    #[error("you need to be logged in to do that")]
    Unauthenticated,
    /// The server rejected an attached credential (401).
    #[error("your session has expired, please log in again")]
    SessionExpired,
    #[error("{0}")]
    NotFound(String),
    /// Any other non-2xx response, carrying the server's error payload.
    #[error("{0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Network(String),
}

/// Single-threaded transport handle. Futures are not `Send`; everything in
/// this crate runs on the one browser event loop.
pub trait Api {
    fn fetch<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<serde_json::Value>,
        token: Option<&'a str>,
    ) -> LocalBoxFuture<'a, Result<ApiResponse, ApiError>>;
}

/// Pulls the message out of an error payload. The backend answers failures
/// with `{"error": "..."}`, but some proxies hand back plain text.
fn error_message(resp: &ApiResponse) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(&resp.body) {
        Ok(parsed) => parsed.error,
        Err(_) if !resp.body.trim().is_empty() => resp.body.clone(),
        Err(_) => format!("request failed with status {}", resp.status),
    }
}

/// Maps a settled response into the error taxonomy. A 401 always means the
/// attached credential is no longer good; callers react by expiring the
/// session (see `session::SessionStore::force_expire`).
pub fn accept(resp: ApiResponse) -> Result<ApiResponse, ApiError> {
    match resp.status {
        200..=299 => Ok(resp),
        401 => Err(ApiError::SessionExpired),
        404 => Err(ApiError::NotFound(error_message(&resp))),
        _ => Err(ApiError::Rejected(error_message(&resp))),
    }
}

// Wire payloads. Field names follow the backend's JSON (camelCase, mongo-style
// `_id`); anything the server may omit is defaulted so older payloads never
// fail to parse.

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPayload {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: Option<AuthorPayload>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    /// Only present when the request carried a token.
    #[serde(default)]
    pub liked_by_me: Option<bool>,
    /// Only present when the request carried a token.
    #[serde(default)]
    pub can_delete: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PostsPage {
    #[serde(default)]
    pub posts: Vec<PostPayload>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: crate::session::Profile,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub author: Option<AuthorPayload>,
    pub body: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

impl PostDraft {
    /// Builds a draft from raw form fields; tags and images arrive as
    /// comma-separated text.
    pub fn from_form(title: &str, body: &str, tags: &str, images: &str) -> Self {
        let split = |raw: &str| {
            raw.split(',')
                .map(|part| part.trim().to_owned())
                .filter(|part| !part.is_empty())
                .collect()
        };

        PostDraft {
            title: title.trim().to_owned(),
            body: body.trim().to_owned(),
            tags: split(tags),
            images: split(images),
        }
    }
}

pub async fn login(api: &dyn Api, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let body = serde_json::json!({ "email": email, "password": password });
    let resp = api.fetch(Method::Post, "/api/auth/login", Some(body), None).await?;

    // A 401 here is bad credentials, not an expired session.
    if !resp.ok() {
        return Err(ApiError::Rejected(error_message(&resp)));
    }
    resp.json()
}

pub async fn create_user(api: &dyn Api, email: &str, password: &str) -> Result<(), ApiError> {
    let body = serde_json::json!({ "email": email, "password": password });
    let resp = api.fetch(Method::Post, "/api/users", Some(body), None).await?;
    accept(resp).map(|_| ())
}

pub async fn fetch_posts(
    api: &dyn Api,
    page: u32,
    limit: u32,
    token: Option<&str>,
) -> Result<PostsPage, ApiError> {
    let path = format!("/api/posts?page={}&limit={}", page, limit);
    let resp = api.fetch(Method::Get, &path, None, token).await?;
    accept(resp)?.json()
}

pub async fn fetch_post(api: &dyn Api, slug: &str) -> Result<PostPayload, ApiError> {
    let path = format!("/api/posts/{}", slug);
    let resp = api.fetch(Method::Get, &path, None, None).await?;
    accept(resp)?.json()
}

pub async fn create_post(
    api: &dyn Api,
    draft: &PostDraft,
    token: &str,
) -> Result<PostPayload, ApiError> {
    let body = serde_json::to_value(draft)
        .map_err(|err| ApiError::Network(format!("unencodable post draft: {}", err)))?;
    let resp = api.fetch(Method::Post, "/api/posts", Some(body), Some(token)).await?;
    accept(resp)?.json()
}

pub async fn toggle_like(api: &dyn Api, post_id: &str, token: &str) -> Result<LikeOutcome, ApiError> {
    let path = format!("/api/posts/{}/like", post_id);
    let resp = api.fetch(Method::Post, &path, None, Some(token)).await?;
    accept(resp)?.json()
}

pub async fn delete_post(api: &dyn Api, post_id: &str, token: &str) -> Result<(), ApiError> {
    let path = format!("/api/posts/{}", post_id);
    let resp = api.fetch(Method::Delete, &path, None, Some(token)).await?;
    accept(resp).map(|_| ())
}

pub async fn fetch_comments(api: &dyn Api, post_id: &str) -> Result<Vec<CommentPayload>, ApiError> {
    let path = format!("/api/comments/{}", post_id);
    let resp = api.fetch(Method::Get, &path, None, None).await?;
    accept(resp)?.json()
}

pub async fn create_comment(
    api: &dyn Api,
    post_id: &str,
    body: &str,
    token: &str,
) -> Result<CommentPayload, ApiError> {
    let path = format!("/api/comments/{}", post_id);
    let payload = serde_json::json!({ "body": body });
    let resp = api.fetch(Method::Post, &path, Some(payload), Some(token)).await?;
    accept(resp)?.json()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(status: u16, body: &str) -> ApiResponse {
        ApiResponse { status, body: body.to_owned() }
    }

    #[test]
    fn accept_passes_2xx_through() {
        assert_eq!(accept(resp(204, "")), Ok(resp(204, "")));
    }

    #[test]
    fn accept_maps_401_to_session_expiry() {
        assert_eq!(accept(resp(401, r#"{"error":"bad token"}"#)), Err(ApiError::SessionExpired));
    }

    #[test]
    fn accept_extracts_error_payload() {
        assert_eq!(
            accept(resp(404, r#"{"error":"post not found"}"#)),
            Err(ApiError::NotFound("post not found".to_owned())),
        );
        assert_eq!(
            accept(resp(500, "upstream blew up")),
            Err(ApiError::Rejected("upstream blew up".to_owned())),
        );
        assert_eq!(
            accept(resp(503, "")),
            Err(ApiError::Rejected("request failed with status 503".to_owned())),
        );
    }

    #[test]
    fn post_payload_defaults_missing_flags() {
        let payload: PostPayload =
            serde_json::from_str(r#"{"_id":"p1","title":"Leg day","likesCount":3}"#).unwrap();
        assert_eq!(payload.liked_by_me, None);
        assert_eq!(payload.can_delete, None);
        assert_eq!(payload.likes_count, 3);
        assert!(payload.tags.is_empty());
    }

    #[test]
    fn draft_from_form_trims_and_splits() {
        let draft = PostDraft::from_form(
            "  My routine ",
            " body text ",
            "legs, cardio , ,",
            "",
        );
        assert_eq!(draft.title, "My routine");
        assert_eq!(draft.body, "body text");
        assert_eq!(draft.tags, vec!["legs".to_owned(), "cardio".to_owned()]);
        assert!(draft.images.is_empty());
    }
}
