/*
 * Responsibility
 * - HTTP Basic の credentials (`basic <base64(id:secret)>`) を分解する
 * - scheme の判定は呼び出し側の責務。ここは先頭 6 byte を捨てるだけ
 */
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

const PREFIX_LEN: usize = "basic ".len();

// Clients are sloppy about padding; accept both forms.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BasicCredentialsError {
    #[error("authorization header is too short")]
    TooShort,
    #[error("credentials are not valid base64")]
    InvalidBase64,
    #[error("credentials are not valid utf-8")]
    InvalidUtf8,
    #[error("credentials have no ':' separator")]
    MissingSeparator,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub id: String,
    pub secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Decode `basic <base64(id:secret)>`.
///
/// The payload is split on the first `:`, so the secret may itself contain
/// colons. Each half is percent-decoded afterwards (`a%40b` -> `a@b`).
pub fn decode_client_credentials(
    auth_header: &str,
) -> Result<ClientCredentials, BasicCredentialsError> {
    let encoded = auth_header
        .get(PREFIX_LEN..)
        .ok_or(BasicCredentialsError::TooShort)?
        .trim();

    let raw = LENIENT
        .decode(encoded)
        .map_err(|_| BasicCredentialsError::InvalidBase64)?;
    let raw = String::from_utf8(raw).map_err(|_| BasicCredentialsError::InvalidUtf8)?;

    let (id, secret) = raw
        .split_once(':')
        .ok_or(BasicCredentialsError::MissingSeparator)?;

    Ok(ClientCredentials {
        id: unescape(id)?,
        secret: unescape(secret)?,
    })
}

fn unescape(part: &str) -> Result<String, BasicCredentialsError> {
    urlencoding::decode(part)
        .map(|s| s.into_owned())
        .map_err(|_| BasicCredentialsError::InvalidUtf8)
}
