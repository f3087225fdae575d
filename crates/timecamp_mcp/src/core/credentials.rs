use crate::core::error::{TimeCampError, TimeCampResult};

/// Strip an optional `Bearer` scheme; blank values and other schemes count as absent.
fn bearer_token(value: &str) -> Option<&str> {
    let value = value.trim();
    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => "",
        None if value.eq_ignore_ascii_case("bearer") => "",
        None => value,
    };
    (!token.is_empty()).then_some(token)
}

/// Pick the credential for one call: the request's Authorization header wins
/// over the configured default.
pub fn resolve_credential(header: Option<&str>, default: Option<&str>) -> TimeCampResult<String> {
    header
        .and_then(bearer_token)
        .or_else(|| default.and_then(bearer_token))
        .map(str::to_string)
        .ok_or(TimeCampError::Unauthorized)
}
