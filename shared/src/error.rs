use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    InvalidUserId(String),
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    #[error("リクエスト間で更新が競合しました: {0}")]
    TransactionConflict(String),
    #[error("トランザクションを実行できませんでした")]
    TransactionError(#[source] sqlx::Error),
    #[error("データベース処理の実行中にエラーが発生しました")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error("{0}")]
    KeyValueStoreError(#[from] redis::RedisError),
    #[error("{0}")]
    ExternalServiceError(String),
    #[error("ログインが必要です")]
    UnauthenticatedError,
    #[error("認可情報が誤っています")]
    UnauthorizedError,
    #[error("この操作を行う権限がありません")]
    ForbiddenOperation,
    #[error("{0}")]
    ConversionEntityError(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// データベースに到達できない種類の失敗。クエリ自体の誤りと区別して
/// 503 として返す
fn is_connection_failure(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match self {
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidUserId(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::TransactionConflict(_) => StatusCode::CONFLICT,
            AppError::TransactionError(ref e) | AppError::SpecificOperationError(ref e)
                if is_connection_failure(e) =>
            {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::ConversionEntityError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::KeyValueStoreError(_) | AppError::ExternalServiceError(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::UnauthenticatedError | AppError::UnauthorizedError => {
                StatusCode::UNAUTHORIZED
            }
            AppError::ForbiddenOperation => StatusCode::FORBIDDEN,
        };

        if status_code.is_server_error() {
            tracing::error!(
                error.cause_chain = ?self,
                error.message = %self,
                "Unexpected error happened"
            );
        } else {
            tracing::warn!(
                error.cause_chain = ?self,
                error.message = %self,
                "Client error happened"
            );
        }

        (status_code, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
