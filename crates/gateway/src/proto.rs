//! Protobuf wire types for the backend services.
//!
//! Hand-maintained prost messages mirroring the backends' `.proto` files,
//! plus the fully-qualified method paths the gateway calls.

/// Empty request/response body.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct Empty {}

/// Image attachment shared by tweets and comments.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Image {
    #[prost(bytes = "vec", tag = "1")]
    pub chunk: Vec<u8>,
    #[prost(string, tag = "2")]
    pub content_type: String,
    #[prost(string, tag = "3")]
    pub name: String,
}

pub mod sso {
    pub const REGISTER: &str = "/sso.Auth/Register";
    pub const VERIFY_USER: &str = "/sso.Auth/VerifyUser";
    pub const CHECK_VERIFY: &str = "/sso.Auth/CheckVerify";
    pub const LOGIN: &str = "/sso.Auth/Login";
    pub const GET_USER_BY_ID: &str = "/sso.Auth/GetUserByID";
    pub const FORGOT_PASSWORD: &str = "/sso.Auth/ForgotPassword";
    pub const VERIFY_PASSWORD: &str = "/sso.Auth/VerifyPassword";
    pub const RESET_PASSWORD: &str = "/sso.Auth/ResetPassword";

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct RegisterRequest {
        #[prost(string, tag = "1")]
        pub username: String,
        #[prost(string, tag = "2")]
        pub email: String,
        #[prost(string, tag = "3")]
        pub password: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct RegisterResponse {
        #[prost(string, tag = "1")]
        pub user_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct VerifyRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CheckVerifyRequest {
        #[prost(string, tag = "1")]
        pub code: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct LoginRequest {
        #[prost(string, tag = "1")]
        pub email: String,
        #[prost(string, tag = "2")]
        pub password: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct LoginResponse {
        #[prost(string, tag = "1")]
        pub token: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetUserRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetUserResponse {
        #[prost(string, tag = "1")]
        pub user_id: String,
        #[prost(string, tag = "2")]
        pub username: String,
        #[prost(string, tag = "3")]
        pub email: String,
        #[prost(bool, tag = "4")]
        pub is_verified: bool,
        #[prost(message, optional, tag = "5")]
        pub created_at: Option<prost_types::Timestamp>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ForgotPasswordRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct VerifyPasswordRequest {
        #[prost(string, tag = "1")]
        pub code: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ResetPasswordRequest {
        #[prost(string, tag = "1")]
        pub code: String,
        #[prost(string, tag = "2")]
        pub user_id: String,
        #[prost(string, tag = "3")]
        pub password: String,
        #[prost(string, tag = "4")]
        pub password_re: String,
    }
}

pub mod tweets {
    use super::Image;

    pub const CREATE_TWEET: &str = "/tweets.Tweets/CreateTweet";
    pub const GET_TWEET: &str = "/tweets.Tweets/GetTweet";
    pub const GET_ALL_TWEETS: &str = "/tweets.Tweets/GetAllTweets";
    pub const UPDATE_TWEET: &str = "/tweets.Tweets/UpdateTweet";
    pub const DELETE_TWEET: &str = "/tweets.Tweets/DeleteTweet";

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CreateTweetRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
        #[prost(string, tag = "2")]
        pub text: String,
        #[prost(message, optional, tag = "3")]
        pub image: Option<Image>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CreateTweetResponse {
        #[prost(string, tag = "1")]
        pub tweet_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetTweetRequest {
        #[prost(string, tag = "1")]
        pub tweet_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Tweet {
        #[prost(string, tag = "1")]
        pub tweet_id: String,
        #[prost(string, tag = "2")]
        pub user_id: String,
        #[prost(string, tag = "3")]
        pub text: String,
        #[prost(string, tag = "4")]
        pub image_url: String,
        #[prost(message, optional, tag = "5")]
        pub created_at: Option<prost_types::Timestamp>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetAllTweetsRequest {
        #[prost(string, tag = "1")]
        pub cursor: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetAllTweetsResponse {
        #[prost(message, repeated, tag = "1")]
        pub tweets: Vec<Tweet>,
        #[prost(string, tag = "2")]
        pub cursor: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct UpdateTweetRequest {
        #[prost(string, tag = "1")]
        pub tweet_id: String,
        #[prost(string, tag = "2")]
        pub user_id: String,
        #[prost(string, tag = "3")]
        pub text: String,
        #[prost(message, optional, tag = "4")]
        pub image: Option<Image>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct DeleteTweetRequest {
        #[prost(string, tag = "1")]
        pub tweet_id: String,
        #[prost(string, tag = "2")]
        pub user_id: String,
    }
}

pub mod comments {
    use super::Image;

    pub const CREATE_COMMENT: &str = "/comments.Comments/CreateComment";
    pub const GET_COMMENT: &str = "/comments.Comments/GetComment";
    pub const GET_ALL_TWEET_COMMENTS: &str = "/comments.Comments/GetAllTweetComments";
    pub const UPDATE_COMMENT: &str = "/comments.Comments/UpdateComment";
    pub const DELETE_COMMENT: &str = "/comments.Comments/DeleteComment";

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CreateCommentRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
        #[prost(string, tag = "2")]
        pub tweet_id: String,
        #[prost(string, tag = "3")]
        pub text: String,
        #[prost(message, optional, tag = "4")]
        pub image: Option<Image>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CreateCommentResponse {
        #[prost(string, tag = "1")]
        pub comment_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetCommentRequest {
        #[prost(string, tag = "1")]
        pub comment_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Comment {
        #[prost(string, tag = "1")]
        pub comment_id: String,
        #[prost(string, tag = "2")]
        pub user_id: String,
        #[prost(string, tag = "3")]
        pub tweet_id: String,
        #[prost(string, tag = "4")]
        pub text: String,
        #[prost(string, tag = "5")]
        pub image_url: String,
        #[prost(message, optional, tag = "6")]
        pub created_at: Option<prost_types::Timestamp>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetAllTweetCommentsRequest {
        #[prost(string, tag = "1")]
        pub cursor: String,
        #[prost(string, tag = "2")]
        pub tweet_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetAllTweetCommentsResponse {
        #[prost(message, repeated, tag = "1")]
        pub comments: Vec<Comment>,
        #[prost(string, tag = "2")]
        pub cursor: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct UpdateCommentRequest {
        #[prost(string, tag = "1")]
        pub comment_id: String,
        #[prost(string, tag = "2")]
        pub user_id: String,
        #[prost(string, tag = "3")]
        pub tweet_id: String,
        #[prost(string, tag = "4")]
        pub text: String,
        #[prost(message, optional, tag = "5")]
        pub image: Option<Image>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct DeleteCommentRequest {
        #[prost(string, tag = "1")]
        pub comment_id: String,
        #[prost(string, tag = "2")]
        pub user_id: String,
    }
}

pub mod notifications {
    pub const SUBSCRIBE_TO_USER: &str = "/notifications.Notifications/SubscribeToUser";
    pub const UNSUBSCRIBE_FROM_USER: &str = "/notifications.Notifications/UnSubscribeFromUser";
    pub const GET_NOTIFICATIONS: &str = "/notifications.Notifications/GetNotifications";
    pub const MARK_NOTIFICATION_AS_READ: &str =
        "/notifications.Notifications/MarkNotificationAsRead";
    pub const READ_ALL_NOTIFICATIONS: &str = "/notifications.Notifications/ReadAllNotifications";

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SubscribeToUserRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
        #[prost(string, tag = "2")]
        pub to_user_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct UnSubscribeFromUserRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
        #[prost(string, tag = "2")]
        pub to_user_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetNotificationsRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Notification {
        #[prost(string, tag = "1")]
        pub notification_id: String,
        #[prost(string, tag = "2")]
        pub user_id: String,
        #[prost(string, tag = "3")]
        pub sender_id: String,
        #[prost(bool, tag = "4")]
        pub read: bool,
        #[prost(message, optional, tag = "5")]
        pub created_at: Option<prost_types::Timestamp>,
        #[prost(string, tag = "6")]
        pub r#type: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetNotificationsResponse {
        #[prost(message, repeated, tag = "1")]
        pub notifications: Vec<Notification>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct MarkNotificationAsReadRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
        #[prost(string, tag = "2")]
        pub notification_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ReadAllNotificationsRequest {
        #[prost(string, tag = "1")]
        pub user_id: String,
    }
}
