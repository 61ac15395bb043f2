use axum::{
    async_trait,
    extract::{
        rejection::{FormRejection, JsonRejection},
        FromRequest, Request,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Request body accepted either as JSON or as an urlencoded form.
#[derive(Debug)]
pub struct Payload<T>(pub T);

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("{}", .0.body_text())]
    Json(#[from] JsonRejection),
    #[error("{}", .0.body_text())]
    Form(#[from] FormRejection),
}

impl PayloadError {
    /// Oversized bodies keep their 413; every other malformed body is a 400.
    pub fn status(&self) -> StatusCode {
        let inner = match self {
            PayloadError::Json(e) => e.status(),
            PayloadError::Form(e) => e.status(),
        };
        if inner == StatusCode::PAYLOAD_TOO_LARGE {
            inner
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}

impl IntoResponse for PayloadError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.to_string() }))).into_response()
    }
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

#[async_trait]
impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PayloadError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Payload(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Payload(value))
        }
    }
}
