//! Typed façades over the backend services.
//!
//! Each service wraps one [`RpcChannel`], so every call goes through the
//! shared tracing and retry chain. Methods open a `Service.<Name>` span,
//! log failures, and hand the backend's `tonic::Status` back unchanged.

mod auth;
mod comments;
mod notifications;
mod tweets;

pub use auth::AuthService;
pub use comments::CommentService;
pub use notifications::NotificationService;
pub use tweets::TweetService;

use crate::config::ServicesConfig;
use crate::error::Result;
use rpc_client::{make_client, RetryPolicy, RpcChannel};
use tracing::info;

pub const AUTH_SERVICE: &str = "sso.Auth";
pub const TWEETS_SERVICE: &str = "tweets.Tweets";
pub const COMMENTS_SERVICE: &str = "comments.Comments";
pub const NOTIFICATIONS_SERVICE: &str = "notifications.Notifications";

/// All backend services the gateway talks to.
#[derive(Debug, Clone)]
pub struct Services {
    pub auth: AuthService,
    pub tweets: TweetService,
    pub comments: CommentService,
    pub notifications: NotificationService,
}

impl Services {
    /// Dial every backend once. Any failure is returned; callers treat it as fatal.
    pub async fn connect(config: &ServicesConfig, policy: &RetryPolicy) -> Result<Self> {
        let timeout = config.connect_timeout;

        let auth = make_client(AUTH_SERVICE, &config.auth_addr, policy.clone(), timeout).await?;
        let tweets = make_client(TWEETS_SERVICE, &config.tweets_addr, policy.clone(), timeout).await?;
        let comments =
            make_client(COMMENTS_SERVICE, &config.comments_addr, policy.clone(), timeout).await?;
        let notifications = make_client(
            NOTIFICATIONS_SERVICE,
            &config.notifications_addr,
            policy.clone(),
            timeout,
        )
        .await?;

        info!("Connected to all backend services");
        Ok(Self::from_channels(auth, tweets, comments, notifications))
    }

    /// Build from already established channels.
    pub fn from_channels(
        auth: RpcChannel,
        tweets: RpcChannel,
        comments: RpcChannel,
        notifications: RpcChannel,
    ) -> Self {
        Self {
            auth: AuthService::new(auth),
            tweets: TweetService::new(tweets),
            comments: CommentService::new(comments),
            notifications: NotificationService::new(notifications),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_fails_on_bad_address() {
        let config = ServicesConfig {
            auth_addr: "not a uri".to_string(),
            tweets_addr: "http://127.0.0.1:1".to_string(),
            comments_addr: "http://127.0.0.1:1".to_string(),
            notifications_addr: "http://127.0.0.1:1".to_string(),
            connect_timeout: Duration::from_millis(100),
        };
        let err = Services::connect(&config, &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::GatewayError::Rpc(_)));
    }
}
