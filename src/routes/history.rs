use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::HistoryResponse,
    routes::auth::CurrentUser,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/history", get(my_history))
        .route("/history/all", get(all_history))
}

async fn my_history(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<HistoryResponse>, AppError> {
    let history = state.store.file_history(&user.id)?;
    Ok(Json(HistoryResponse {
        success: true,
        history,
    }))
}

async fn all_history(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        success: true,
        history: state.store.all_file_history(),
    })
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::routes::{self, auth::USER_ID_HEADER};
    use crate::services::store::FileUpload;
    use crate::AppState;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn history_is_scoped_to_the_caller() {
        let state = Arc::new(AppState::new(Config::default()));
        for (user, name) in [("u1", "a.csv"), ("u2", "b.xlsx"), ("u1", "c.xls")] {
            state
                .store
                .save_file_history(
                    user,
                    FileUpload {
                        name: name.to_string(),
                        size: 1,
                        content_type: None,
                        sheet_names: vec!["Sheet1".to_string()],
                    },
                )
                .unwrap();
        }
        let app = routes::router(state);

        let request = Request::builder()
            .uri("/history")
            .header(USER_ID_HEADER, "u1")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap())
                .unwrap();
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r["userId"] == "u1"));

        let request = Request::builder()
            .uri("/history/all")
            .header(USER_ID_HEADER, "u2")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap())
                .unwrap();
        assert_eq!(body["history"].as_array().unwrap().len(), 3);
    }
}
