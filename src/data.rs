use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};

use crate::feed::{self, Comment, Post, User};

pub trait FeedService: Send + Sync {
    fn load_feed(&self) -> Result<Vec<Post>>;
}

pub trait CommentService: Send + Sync {
    fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>>;
}

pub trait UserService: Send + Sync {
    fn user(&self, username: &str) -> Result<User>;
}

pub struct HttpCommentService {
    client: Arc<feed::Client>,
}

impl HttpCommentService {
    pub fn new(client: Arc<feed::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for HttpCommentService {
    fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        self.client
            .comments_for_post(post_id)
            .context("fetch comments")
    }
}

pub struct HttpUserService {
    client: Arc<feed::Client>,
}

impl HttpUserService {
    pub fn new(client: Arc<feed::Client>) -> Self {
        Self { client }
    }
}

impl UserService for HttpUserService {
    fn user(&self, username: &str) -> Result<User> {
        self.client.user(username).context("fetch user")
    }
}

/// The backend has no live feed endpoint yet; the feed ships as bundled
/// sample posts, the same ones the mobile client inlines.
#[derive(Default)]
pub struct SampleFeedService;

impl FeedService for SampleFeedService {
    fn load_feed(&self) -> Result<Vec<Post>> {
        Ok(sample_posts())
    }
}

#[derive(Default)]
pub struct SampleCommentService;

impl CommentService for SampleCommentService {
    fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        Ok(sample_comments(post_id))
    }
}

pub fn sample_posts() -> Vec<Post> {
    let created = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).single();
    let content = "This is a test post. It should be displayed in the app. \
                   This is a test post. It should be displayed in the app. \
                   This is a test post. It should be displayed in the app.";
    (1..=4)
        .map(|id| Post {
            id,
            user: 2,
            project: 1,
            likes: 69,
            content: content.to_string(),
            comments: vec![id * 10 + 1, id * 10 + 2],
            created_on: created,
        })
        .collect()
}

pub fn sample_comments(post_id: i64) -> Vec<Comment> {
    let created = Utc.with_ymd_and_hms(2021, 1, 2, 9, 30, 0).single();
    vec![
        Comment {
            id: post_id * 10 + 1,
            user: 3,
            post: post_id,
            likes: 4,
            parent_comment: None,
            created_on: created,
            content: "Great post!".to_string(),
        },
        Comment {
            id: post_id * 10 + 2,
            user: 4,
            post: post_id,
            likes: 1,
            parent_comment: None,
            created_on: created,
            content: "I agree!".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_feed_has_unique_post_ids() {
        let posts = SampleFeedService.load_feed().expect("sample feed");
        assert_eq!(posts.len(), 4);
        let mut ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(posts[0].likes, 69);
        assert!(posts[0].created_on.is_some());
    }

    #[test]
    fn sample_comments_arrive_in_server_order() {
        let comments = SampleCommentService
            .comments_for_post(1)
            .expect("sample comments");
        let bodies: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(bodies, vec!["Great post!", "I agree!"]);
        assert!(comments.iter().all(|c| c.post == 1));
        assert!(comments.iter().all(Comment::is_top_level));
    }
}
