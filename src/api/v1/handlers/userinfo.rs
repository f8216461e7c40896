/*
 * Responsibility
 * - GET/POST /userinfo
 * - token gate が添付した AccessToken の identity を返す
 */
use axum::Json;

use crate::api::v1::dto::userinfo::UserInfoResponse;
use crate::api::v1::extractors::AuthCtxExtractor;

pub async fn userinfo(AuthCtxExtractor(token): AuthCtxExtractor) -> Json<UserInfoResponse> {
    Json(UserInfoResponse::from(token))
}
