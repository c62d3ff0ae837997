use crate::domain::{Comment, CreateCommentRequest, Page, UpdateCommentRequest};
use crate::proto::{comments, Empty};
use rpc_client::RpcChannel;
use tonic::Status;
use tracing::{error, instrument};

/// Comment storage service.
#[derive(Debug, Clone)]
pub struct CommentService {
    channel: RpcChannel,
}

impl CommentService {
    pub fn new(channel: RpcChannel) -> Self {
        Self { channel }
    }

    #[instrument(name = "Service.CreateComment", skip_all, fields(tweet_id = %input.tweet_id))]
    pub async fn create(&self, input: CreateCommentRequest) -> Result<String, Status> {
        let request = comments::CreateCommentRequest {
            user_id: input.user_id,
            tweet_id: input.tweet_id,
            text: input.text,
            image: input.image.map(Into::into),
        };
        let resp: comments::CreateCommentResponse = self
            .channel
            .unary(comments::CREATE_COMMENT, &request)
            .await
            .inspect_err(|e| error!("cannot create comment: {}", e))?;
        Ok(resp.comment_id)
    }

    #[instrument(name = "Service.GetComment", skip(self))]
    pub async fn get(&self, comment_id: &str) -> Result<Comment, Status> {
        let request = comments::GetCommentRequest {
            comment_id: comment_id.to_string(),
        };
        let resp: comments::Comment = self
            .channel
            .unary(comments::GET_COMMENT, &request)
            .await
            .inspect_err(|e| error!("cannot get comment: {}", e))?;
        Ok(resp.into())
    }

    #[instrument(name = "Service.GetAllTweetComments", skip(self))]
    pub async fn list_for_tweet(&self, tweet_id: &str, cursor: &str) -> Result<Page<Comment>, Status> {
        let request = comments::GetAllTweetCommentsRequest {
            cursor: cursor.to_string(),
            tweet_id: tweet_id.to_string(),
        };
        let resp: comments::GetAllTweetCommentsResponse = self
            .channel
            .unary(comments::GET_ALL_TWEET_COMMENTS, &request)
            .await
            .inspect_err(|e| error!("cannot get all tweet comments: {}", e))?;
        Ok(Page {
            items: resp.comments.into_iter().map(Into::into).collect(),
            cursor: resp.cursor,
        })
    }

    #[instrument(name = "Service.UpdateComment", skip_all, fields(comment_id = %input.comment_id))]
    pub async fn update(&self, input: UpdateCommentRequest) -> Result<Comment, Status> {
        let request = comments::UpdateCommentRequest {
            comment_id: input.comment_id,
            user_id: input.user_id,
            tweet_id: input.tweet_id,
            text: input.text,
            image: input.image.map(Into::into),
        };
        let resp: comments::Comment = self
            .channel
            .unary(comments::UPDATE_COMMENT, &request)
            .await
            .inspect_err(|e| error!("cannot update comment: {}", e))?;
        Ok(resp.into())
    }

    #[instrument(name = "Service.DeleteComment", skip(self))]
    pub async fn delete(&self, comment_id: &str, user_id: &str) -> Result<(), Status> {
        let request = comments::DeleteCommentRequest {
            comment_id: comment_id.to_string(),
            user_id: user_id.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(comments::DELETE_COMMENT, &request)
            .await
            .inspect_err(|e| error!("cannot delete comment: {}", e))?;
        Ok(())
    }
}
