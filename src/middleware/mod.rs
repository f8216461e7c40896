/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: token gate, http: request-id / trace / body limit / timeout
 */
pub mod auth;
pub mod http;
