use crate::consts::route_const::{FALLBACK_REDIRECT, RETURN_PARAM, SIGN_IN};

/// Only same-site absolute paths survive; anything else lands on the news feed.
pub fn sanitize_return_target(raw: Option<&str>) -> String {
    match raw {
        Some(target) if target.starts_with('/') && !target.starts_with("//") => target.to_string(),
        _ => FALLBACK_REDIRECT.to_string(),
    }
}

pub fn sign_in_location(return_to: &str) -> String {
    let query = serde_urlencoded::to_string([(RETURN_PARAM, return_to)]).unwrap_or_default();
    format!("{SIGN_IN}?{query}")
}
