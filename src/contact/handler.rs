use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::debug;

use crate::{
    error::ContactError,
    models::{ContactRequest, ContactResponse, Message},
    store::MessageStore,
    validation::validate,
};

pub const CONTACT_PATH: &str = "/api/contact";

pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<dyn MessageStore>: FromRef<S>,
{
    Router::new().route(CONTACT_PATH, post(submit_message))
}

async fn submit_message(
    State(store): State<Arc<dyn MessageStore>>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ContactResponse>), ContactError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(%rejection, "unreadable contact body");
            ContactRequest::default()
        }
    };

    validate(&request.email, &request.name, &request.message)?;
    let mut message = Message::from(request);

    let mut conn = store
        .connect()
        .await
        .map_err(ContactError::StorageUnavailable)?;

    let id = match conn.insert(&message).await {
        Ok(id) => id,
        Err(e) => {
            conn.close().await;
            return Err(ContactError::StorageWriteFailed(e));
        }
    };
    conn.close().await;

    message.id = Some(id);
    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            message: "Successfully stored message!".to_string(),
            outgoing_message: message,
        }),
    ))
}
