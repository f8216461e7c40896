/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - token gate を通過したリクエストの AccessToken を handler に提供する
 */

mod core;

pub use core::AuthCtxExtractor;
