use crate::domain::Notification;
use crate::proto::{notifications, Empty};
use rpc_client::RpcChannel;
use tonic::Status;
use tracing::{error, instrument};

/// Subscriptions and stored notifications.
#[derive(Debug, Clone)]
pub struct NotificationService {
    channel: RpcChannel,
}

impl NotificationService {
    pub fn new(channel: RpcChannel) -> Self {
        Self { channel }
    }

    #[instrument(name = "Service.SubscribeToUser", skip(self))]
    pub async fn subscribe_to_user(&self, user_id: &str, to_user_id: &str) -> Result<(), Status> {
        let request = notifications::SubscribeToUserRequest {
            user_id: user_id.to_string(),
            to_user_id: to_user_id.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(notifications::SUBSCRIBE_TO_USER, &request)
            .await
            .inspect_err(|e| error!("cannot subscribe to user: {}", e))?;
        Ok(())
    }

    #[instrument(name = "Service.UnSubscribeFromUser", skip(self))]
    pub async fn unsubscribe_from_user(&self, user_id: &str, to_user_id: &str) -> Result<(), Status> {
        let request = notifications::UnSubscribeFromUserRequest {
            user_id: user_id.to_string(),
            to_user_id: to_user_id.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(notifications::UNSUBSCRIBE_FROM_USER, &request)
            .await
            .inspect_err(|e| error!("cannot unsubscribe from user: {}", e))?;
        Ok(())
    }

    #[instrument(name = "Service.GetNotifications", skip(self))]
    pub async fn get_notifications(&self, user_id: &str) -> Result<Vec<Notification>, Status> {
        let request = notifications::GetNotificationsRequest {
            user_id: user_id.to_string(),
        };
        let resp: notifications::GetNotificationsResponse = self
            .channel
            .unary(notifications::GET_NOTIFICATIONS, &request)
            .await
            .inspect_err(|e| error!("cannot get user notifications: {}", e))?;
        Ok(resp.notifications.into_iter().map(Into::into).collect())
    }

    #[instrument(name = "Service.MarkNotificationAsRead", skip(self))]
    pub async fn mark_notification_as_read(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> Result<(), Status> {
        let request = notifications::MarkNotificationAsReadRequest {
            user_id: user_id.to_string(),
            notification_id: notification_id.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(notifications::MARK_NOTIFICATION_AS_READ, &request)
            .await
            .inspect_err(|e| error!("cannot mark notification as read: {}", e))?;
        Ok(())
    }

    #[instrument(name = "Service.ReadAllNotifications", skip(self))]
    pub async fn read_all_notifications(&self, user_id: &str) -> Result<(), Status> {
        let request = notifications::ReadAllNotificationsRequest {
            user_id: user_id.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(notifications::READ_ALL_NOTIFICATIONS, &request)
            .await
            .inspect_err(|e| error!("cannot read all notifications: {}", e))?;
        Ok(())
    }
}
