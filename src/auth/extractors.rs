use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::{AppError, CREDENTIALS_ERROR};
use crate::models::User;

/// The authenticated user, as resolved by `AuthMiddleware`.
///
/// Only usable on routes wrapped by the middleware; elsewhere extraction
/// fails with `AppError::Unauthorized`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.user_id
    }
}

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<User>().cloned() {
            Some(user) => ready(Ok(CurrentUser(user))),
            None => {
                log::error!("CurrentUser requested on {} without AuthMiddleware", req.path());
                let err = AppError::Unauthorized(CREDENTIALS_ERROR.to_string());
                ready(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::Utc;

    #[actix_rt::test]
    async fn test_current_user_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(User {
            user_id: 123,
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });

        let mut payload = Payload::None;
        let extracted = CurrentUser::from_request(&req, &mut payload).await.unwrap();
        assert_eq!(extracted.id(), 123);
        assert_eq!(extracted.0.email, "a@x.com");
    }

    #[actix_rt::test]
    async fn test_current_user_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let result = CurrentUser::from_request(&req, &mut payload).await;

        let err = result.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
