//! Domain types returned by the gateway services.

use crate::proto;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn timestamp(ts: Option<prost_types::Timestamp>) -> Option<DateTime<Utc>> {
    ts.and_then(|ts| DateTime::from_timestamp(ts.seconds, ts.nanos.max(0) as u32))
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPasswordInput {
    pub password: String,
    pub password_re: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<proto::sso::GetUserResponse> for User {
    fn from(user: proto::sso::GetUserResponse) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            email: user.email,
            is_verified: user.is_verified,
            created_at: timestamp(user.created_at),
        }
    }
}

/// Image upload already read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub chunk: Vec<u8>,
    pub content_type: String,
    pub name: String,
}

impl From<ImageUpload> for proto::Image {
    fn from(image: ImageUpload) -> Self {
        Self {
            chunk: image.chunk,
            content_type: image.content_type,
            name: image.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTweetRequest {
    pub user_id: String,
    pub text: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTweetRequest {
    pub user_id: String,
    pub tweet_id: String,
    pub text: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub tweet_id: String,
    pub user_id: String,
    pub text: String,
    #[serde(rename = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<proto::tweets::Tweet> for Tweet {
    fn from(tweet: proto::tweets::Tweet) -> Self {
        Self {
            tweet_id: tweet.tweet_id,
            user_id: tweet.user_id,
            text: tweet.text,
            image_url: non_empty(tweet.image_url),
            created_at: timestamp(tweet.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommentRequest {
    pub user_id: String,
    pub tweet_id: String,
    pub text: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCommentRequest {
    pub comment_id: String,
    pub user_id: String,
    pub tweet_id: String,
    pub text: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub user_id: String,
    pub tweet_id: String,
    pub text: String,
    #[serde(rename = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<proto::comments::Comment> for Comment {
    fn from(comment: proto::comments::Comment) -> Self {
        Self {
            comment_id: comment.comment_id,
            user_id: comment.user_id,
            tweet_id: comment.tweet_id,
            text: comment.text,
            image_url: non_empty(comment.image_url),
            created_at: timestamp(comment.created_at),
        }
    }
}

/// A stored notification as listed by the notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: String,
    pub user_id: String,
    pub sender_id: String,
    pub read: bool,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<proto::notifications::Notification> for Notification {
    fn from(n: proto::notifications::Notification) -> Self {
        Self {
            notification_id: n.notification_id,
            user_id: n.user_id,
            sender_id: n.sender_id,
            read: n.read,
            created_at: timestamp(n.created_at),
            kind: n.r#type,
        }
    }
}

/// One page of a cursor-paginated listing. An empty cursor means no more pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: String,
}
