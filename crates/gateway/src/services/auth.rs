use crate::domain::{ResetPasswordInput, SignInInput, SignUpInput, User};
use crate::proto::{sso, Empty};
use rpc_client::RpcChannel;
use tonic::Status;
use tracing::{error, instrument};

/// Identity service: registration, login, verification and password reset.
#[derive(Debug, Clone)]
pub struct AuthService {
    channel: RpcChannel,
}

impl AuthService {
    pub fn new(channel: RpcChannel) -> Self {
        Self { channel }
    }

    /// Returns the new user's id.
    #[instrument(name = "Service.Register", skip_all)]
    pub async fn register(&self, input: SignUpInput) -> Result<String, Status> {
        let request = sso::RegisterRequest {
            username: input.username,
            email: input.email,
            password: input.password,
        };
        let resp: sso::RegisterResponse = self
            .channel
            .unary(sso::REGISTER, &request)
            .await
            .inspect_err(|e| error!("cannot register user: {}", e))?;
        Ok(resp.user_id)
    }

    #[instrument(name = "Service.VerifyUser", skip(self))]
    pub async fn verify_user(&self, user_id: &str) -> Result<(), Status> {
        let request = sso::VerifyRequest {
            user_id: user_id.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(sso::VERIFY_USER, &request)
            .await
            .inspect_err(|e| error!("cannot verify user: {}", e))?;
        Ok(())
    }

    #[instrument(name = "Service.CheckVerify", skip_all)]
    pub async fn check_verify(&self, code: &str) -> Result<(), Status> {
        let request = sso::CheckVerifyRequest {
            code: code.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(sso::CHECK_VERIFY, &request)
            .await
            .inspect_err(|e| error!("cannot check verify: {}", e))?;
        Ok(())
    }

    /// Returns a signed bearer token.
    #[instrument(name = "Service.Login", skip_all)]
    pub async fn login(&self, input: SignInInput) -> Result<String, Status> {
        let request = sso::LoginRequest {
            email: input.email,
            password: input.password,
        };
        let resp: sso::LoginResponse = self
            .channel
            .unary(sso::LOGIN, &request)
            .await
            .inspect_err(|e| error!("cannot login user: {}", e))?;
        Ok(resp.token)
    }

    #[instrument(name = "Service.GetUserByID", skip(self))]
    pub async fn get_user_by_id(&self, user_id: &str) -> Result<User, Status> {
        let request = sso::GetUserRequest {
            user_id: user_id.to_string(),
        };
        let resp: sso::GetUserResponse = self
            .channel
            .unary(sso::GET_USER_BY_ID, &request)
            .await
            .inspect_err(|e| error!("cannot get user by id: {}", e))?;
        Ok(resp.into())
    }

    #[instrument(name = "Service.ForgotPassword", skip(self))]
    pub async fn forgot_password(&self, user_id: &str) -> Result<(), Status> {
        let request = sso::ForgotPasswordRequest {
            user_id: user_id.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(sso::FORGOT_PASSWORD, &request)
            .await
            .inspect_err(|e| error!("cannot send forgot password request: {}", e))?;
        Ok(())
    }

    #[instrument(name = "Service.VerifyPassword", skip_all)]
    pub async fn verify_password(&self, code: &str) -> Result<(), Status> {
        let request = sso::VerifyPasswordRequest {
            code: code.to_string(),
        };
        let _: Empty = self
            .channel
            .unary(sso::VERIFY_PASSWORD, &request)
            .await
            .inspect_err(|e| error!("cannot verify password: {}", e))?;
        Ok(())
    }

    #[instrument(name = "Service.ResetPassword", skip(self, code, input))]
    pub async fn reset_password(
        &self,
        code: &str,
        user_id: &str,
        input: ResetPasswordInput,
    ) -> Result<(), Status> {
        let request = sso::ResetPasswordRequest {
            code: code.to_string(),
            user_id: user_id.to_string(),
            password: input.password,
            password_re: input.password_re,
        };
        let _: Empty = self
            .channel
            .unary(sso::RESET_PASSWORD, &request)
            .await
            .inspect_err(|e| error!("cannot reset password: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{reply, services, FakeBackend};
    use tonic::Code;

    #[tokio::test]
    async fn test_login_returns_token() {
        let backend = FakeBackend::new(|method, _| {
            assert_eq!(method, sso::LOGIN);
            reply(&sso::LoginResponse {
                token: "jwt".to_string(),
            })
        });
        let auth = services(backend.clone()).auth;

        let token = auth
            .login(SignInInput {
                email: "alice@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(token, "jwt");
        let sent: sso::LoginRequest = backend.request(0);
        assert_eq!(sent.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_get_user_maps_response() {
        let backend = FakeBackend::new(|_, _| {
            reply(&sso::GetUserResponse {
                user_id: "u1".to_string(),
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                is_verified: true,
                created_at: None,
            })
        });
        let user = services(backend).auth.get_user_by_id("u1").await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.is_verified);
    }

    #[tokio::test]
    async fn test_deterministic_error_passes_through_once() {
        let backend = FakeBackend::new(|_, _| Err(Status::already_exists("email taken")));
        let err = services(backend.clone())
            .auth
            .register(SignUpInput {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), Code::AlreadyExists);
        assert_eq!(err.message(), "email taken");
        assert_eq!(backend.methods(), vec![sso::REGISTER]);
    }

    #[tokio::test]
    async fn test_reset_password_sends_all_fields() {
        let backend = FakeBackend::new(|_, _| reply(&Empty {}));
        services(backend.clone())
            .auth
            .reset_password(
                "123456",
                "u1",
                ResetPasswordInput {
                    password: "newpass1".to_string(),
                    password_re: "newpass1".to_string(),
                },
            )
            .await
            .unwrap();

        let sent: sso::ResetPasswordRequest = backend.request(0);
        assert_eq!(sent.code, "123456");
        assert_eq!(sent.user_id, "u1");
        assert_eq!(sent.password_re, "newpass1");
    }
}
