use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// One feed post. Ids are numeric and lower-cased on the wire; `user` and
/// `project` are references resolved elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub user: i64,
    pub project: i64,
    #[serde(default)]
    pub likes: i64,
    pub content: String,
    #[serde(default)]
    pub comments: Vec<i64>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub user: i64,
    #[serde(default)]
    pub post: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub parent_comment: Option<i64>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub created_on: Option<DateTime<Utc>>,
    pub content: String,
}

impl Comment {
    /// The backend encodes "no parent" as either null or 0.
    pub fn is_top_level(&self) -> bool {
        matches!(self.parent_comment, None | Some(0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub picture: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Timestamps come from a trusted backend, but a bad one must not take the
/// feed down; it decodes to `None` and the display layer shows a placeholder.
fn lenient_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc)))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("api returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("feed client user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(10)))
                .build()?,
        };

        let base_url = if config.base_url.trim().is_empty() {
            DEFAULT_API_BASE.to_string()
        } else {
            config.base_url.trim_end_matches('/').to_string()
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        self.get_json(&format!("/posts/{post_id}/comments"))
    }

    pub fn user(&self, username: &str) -> Result<User> {
        self.get_json(&format!("/users/{username}"))
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()).into());
        }
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .map(|body| {
                    if body.message.is_empty() {
                        body.error
                    } else {
                        body.message
                    }
                })
                .unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(response.json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_decodes_lowercase_numeric_contract() {
        let raw = r#"{
            "id": 1,
            "user": 2,
            "project": 1,
            "likes": 69,
            "content": "This is a test post.",
            "comments": [4, 7],
            "created_on": "2021-01-01T00:00:00Z"
        }"#;
        let post: Post = serde_json::from_str(raw).expect("decode post");
        assert_eq!(post.id, 1);
        assert_eq!(post.user, 2);
        assert_eq!(post.likes, 69);
        assert_eq!(post.comments, vec![4, 7]);
        let created = post.created_on.expect("timestamp parsed");
        assert_eq!(created.to_rfc3339(), "2021-01-01T00:00:00+00:00");
    }

    #[test]
    fn malformed_timestamp_decodes_soft() {
        let raw = r#"{
            "id": 3,
            "user": 2,
            "project": 1,
            "content": "bad clock",
            "created_on": "not-a-date"
        }"#;
        let post: Post = serde_json::from_str(raw).expect("decode post");
        assert!(post.created_on.is_none());
    }

    #[test]
    fn comment_parent_zero_is_top_level() {
        let raw = r#"{"id": 5, "user": 3, "post": 1, "parent_comment": 0, "content": "hi"}"#;
        let comment: Comment = serde_json::from_str(raw).expect("decode comment");
        assert!(comment.is_top_level());

        let raw = r#"{"id": 6, "user": 3, "post": 1, "parent_comment": 5, "content": "re: hi"}"#;
        let reply: Comment = serde_json::from_str(raw).expect("decode comment");
        assert!(!reply.is_top_level());
    }

    #[test]
    fn user_decodes_profile_payload() {
        let raw = r#"{
            "username": "dev_user1",
            "bio": "builds things",
            "links": ["https://example.com"],
            "created_on": "2020-06-01T12:00:00Z",
            "picture": ""
        }"#;
        let user: User = serde_json::from_str(raw).expect("decode user");
        assert_eq!(user.username, "dev_user1");
        assert_eq!(user.links.len(), 1);
        assert!(user.created_on.is_some());
    }

    #[test]
    fn client_requires_user_agent() {
        let err = Client::new(ClientConfig::default());
        assert!(err.is_err());
    }
}
