//! Redirect URL construction for the login flow.
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RedirectError {
    #[error("invalid redirect base url: {0}")]
    InvalidBase(#[from] url::ParseError),
    #[error("redirect origin is not allowed: {0}")]
    OriginNotAllowed(String),
}

/// Origins the login endpoint may redirect to.
///
/// Compared by scheme, host and port. An empty policy allows nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectPolicy {
    allowed_origins: Vec<String>,
}

impl RedirectPolicy {
    /// Each entry is a URL; only its origin is kept (`https://app.example/cb`
    /// allows everything under `https://app.example`).
    pub fn new<I, S>(origins: I) -> Result<Self, RedirectError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_origins = origins
            .into_iter()
            .map(|origin| tuple_origin(&Url::parse(origin.as_ref())?))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { allowed_origins })
    }

    pub fn is_empty(&self) -> bool {
        self.allowed_origins.is_empty()
    }

    pub fn check(&self, redirect_uri: &str) -> Result<(), RedirectError> {
        let origin = tuple_origin(&Url::parse(redirect_uri)?)?;
        if self.allowed_origins.contains(&origin) {
            Ok(())
        } else {
            Err(RedirectError::OriginNotAllowed(origin))
        }
    }
}

fn tuple_origin(url: &Url) -> Result<String, RedirectError> {
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(RedirectError::OriginNotAllowed(url.scheme().to_string()));
    }
    Ok(origin.ascii_serialization())
}

/// Build `base` with its query replaced by `options` and, optionally, a fragment.
///
/// Options keep their input order. A key given twice keeps its first
/// position and takes the last value.
pub fn build_url<K, V>(
    base: &str,
    options: &[(K, V)],
    fragment: Option<&str>,
) -> Result<String, RedirectError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = Url::parse(base)?;
    url.set_query(None);

    let mut merged: Vec<(&str, &str)> = Vec::with_capacity(options.len());
    for (key, value) in options {
        let (key, value) = (key.as_ref(), value.as_ref());
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => merged.push((key, value)),
        }
    }

    if !merged.is_empty() {
        url.query_pairs_mut().extend_pairs(merged);
    }

    if let Some(fragment) = fragment {
        url.set_fragment(Some(fragment));
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_query_and_sets_fragment() {
        let url = build_url("http://x/y?old=1", &[("a", "1"), ("b", "2")], Some("frag")).unwrap();
        assert_eq!(url, "http://x/y?a=1&b=2#frag");
    }

    #[test]
    fn later_duplicate_overwrites_in_place() {
        let url = build_url(
            "https://client.example/cb",
            &[("code", "1"), ("state", "s"), ("code", "2")],
            None,
        )
        .unwrap();
        assert_eq!(url, "https://client.example/cb?code=2&state=s");
    }

    #[test]
    fn no_options_drops_query_entirely() {
        let url = build_url::<&str, &str>("http://x/y?old=1#keep", &[], None).unwrap();
        assert_eq!(url, "http://x/y#keep");
    }

    #[test]
    fn values_are_form_encoded() {
        let url = build_url("http://x/cb", &[("state", "a b&c")], None).unwrap();
        assert_eq!(url, "http://x/cb?state=a+b%26c");
    }

    #[test]
    fn owned_pairs_are_accepted() {
        let opts = vec![("sub".to_string(), "7B2A-BE88-08817Z".to_string())];
        let url = build_url("http://x/cb", &opts, None).unwrap();
        assert_eq!(url, "http://x/cb?sub=7B2A-BE88-08817Z");
    }

    #[test]
    fn policy_allows_listed_origin_only() {
        let policy = RedirectPolicy::new(["https://client.example/cb", "http://localhost:3000"])
            .unwrap();

        assert!(policy.check("https://client.example/other/path?x=1").is_ok());
        assert!(policy.check("http://localhost:3000/cb").is_ok());
        assert_eq!(
            policy.check("https://evil.example/steal"),
            Err(RedirectError::OriginNotAllowed("https://evil.example".into()))
        );
        // port and scheme are part of the origin
        assert!(policy.check("http://client.example/cb").is_err());
        assert!(policy.check("http://localhost:4000/cb").is_err());
    }

    #[test]
    fn empty_policy_allows_nothing() {
        let policy = RedirectPolicy::default();
        assert!(policy.is_empty());
        assert!(policy.check("https://client.example/cb").is_err());
    }

    #[test]
    fn opaque_origins_are_refused() {
        assert!(RedirectPolicy::new(["data:text/plain,hi"]).is_err());

        let policy = RedirectPolicy::new(["https://client.example"]).unwrap();
        assert!(policy.check("javascript:alert(1)").is_err());
    }

    #[test]
    fn relative_base_is_rejected() {
        assert!(matches!(
            build_url::<&str, &str>("/just/a/path", &[], None),
            Err(RedirectError::InvalidBase(_))
        ));
    }
}
