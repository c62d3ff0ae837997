use crate::domain::{CreateTweetRequest, Page, Tweet, UpdateTweetRequest};
use crate::proto::{tweets, Empty};
use rpc_client::RpcChannel;
use tonic::Status;
use tracing::{error, instrument};

/// Tweet storage service.
#[derive(Debug, Clone)]
pub struct TweetService {
    channel: RpcChannel,
}

impl TweetService {
    pub fn new(channel: RpcChannel) -> Self {
        Self { channel }
    }

    /// Returns the new tweet's id.
    #[instrument(name = "Service.CreateTweet", skip_all, fields(user_id = %input.user_id))]
    pub async fn create(&self, input: CreateTweetRequest) -> Result<String, Status> {
        let request = tweets::CreateTweetRequest {
            user_id: input.user_id,
            text: input.text,
            image: input.image.map(Into::into),
        };
        let resp: tweets::CreateTweetResponse = self
            .channel
            .unary(tweets::CREATE_TWEET, &request)
            .await
            .inspect_err(|e| error!("cannot create tweet: {}", e))?;
        Ok(resp.tweet_id)
    }

    #[instrument(name = "Service.GetTweet", skip(self))]
    pub async fn get(&self, tweet_id: &str) -> Result<Tweet, Status> {
        let request = tweets::GetTweetRequest {
            tweet_id: tweet_id.to_string(),
        };
        let resp: tweets::Tweet = self
            .channel
            .unary(tweets::GET_TWEET, &request)
            .await
            .inspect_err(|e| error!("cannot get tweet: {}", e))?;
        Ok(resp.into())
    }

    /// One page of tweets starting after `cursor` (empty for the first page).
    #[instrument(name = "Service.GetAllTweets", skip(self))]
    pub async fn list(&self, cursor: &str) -> Result<Page<Tweet>, Status> {
        let request = tweets::GetAllTweetsRequest {
            cursor: cursor.to_string(),
        };
        let resp: tweets::GetAllTweetsResponse = self
            .channel
            .unary(tweets::GET_ALL_TWEETS, &request)
            .await
            .inspect_err(|e| error!("cannot get all tweets: {}", e))?;
        Ok(Page {
            items: resp.tweets.into_iter().map(Into::into).collect(),
            cursor: resp.cursor,
        })
    }

    #[instrument(name = "Service.UpdateTweet", skip_all, fields(tweet_id = %input.tweet_id))]
    pub async fn update(&self, input: UpdateTweetRequest) -> Result<Tweet, Status> {
        let request = tweets::UpdateTweetRequest {
            tweet_id: input.tweet_id,
            user_id: input.user_id,
            text: input.text,
            image: input.image.map(Into::into),
        };
        let resp: tweets::Tweet = self
            .channel
            .unary(tweets::UPDATE_TWEET, &request)
            .await
            .inspect_err(|e| error!("cannot update tweet: {}", e))?;
        Ok(resp.into())
    }

    #[instrument(name = "Service.DeleteTweet", skip(self))]
    pub async fn delete(&self, user_id: &str, tweet_id: &str) -> Result<(), Status> {
        let request = tweets::DeleteTweetRequest {
            tweet_id: tweet_id.to_string(),
            user_id: user_id.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(tweets::DELETE_TWEET, &request)
            .await
            .inspect_err(|e| error!("cannot delete tweet: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageUpload;
    use crate::services::testing::{reply, services, FakeBackend};

    fn tweet(id: &str) -> tweets::Tweet {
        tweets::Tweet {
            tweet_id: id.to_string(),
            user_id: "alice".to_string(),
            text: format!("tweet {}", id),
            image_url: String::new(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_with_image() {
        let backend = FakeBackend::new(|_, _| {
            reply(&tweets::CreateTweetResponse {
                tweet_id: "t1".to_string(),
            })
        });
        let id = services(backend.clone())
            .tweets
            .create(CreateTweetRequest {
                user_id: "alice".to_string(),
                text: "hello".to_string(),
                image: Some(ImageUpload {
                    chunk: vec![1, 2, 3],
                    content_type: "image/png".to_string(),
                    name: "a.png".to_string(),
                }),
            })
            .await
            .unwrap();

        assert_eq!(id, "t1");
        let sent: tweets::CreateTweetRequest = backend.request(0);
        assert_eq!(sent.image.unwrap().chunk, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_list_returns_page() {
        let backend = FakeBackend::new(|_, _| {
            reply(&tweets::GetAllTweetsResponse {
                tweets: vec![tweet("t1"), tweet("t2")],
                cursor: "next".to_string(),
            })
        });
        let page = services(backend).tweets.list("").await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].tweet_id, "t2");
        assert_eq!(page.cursor, "next");
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let backend = FakeBackend::new(|_, _| Err(Status::not_found("no such tweet")));
        let err = services(backend.clone())
            .tweets
            .delete("alice", "t9")
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
        assert_eq!(backend.methods(), vec![tweets::DELETE_TWEET]);
    }
}
