//! Track locator recognition. Two URI forms map to the same track identity.

/// Scheme-style locator prefix.
pub const TRACK_SCHEME_PREFIX: &str = "tidal://track/";

/// Web-player locator prefix.
pub const TRACK_WEB_PREFIX: &str = "https://listen.tidal.com/track/";

/// Extracts the track id from a locator. `None` means the locator is not
/// handled by this input (unknown prefix or empty id), which is not an
/// error.
pub fn track_id(uri: &str) -> Option<&str> {
    let id = uri
        .strip_prefix(TRACK_SCHEME_PREFIX)
        .or_else(|| uri.strip_prefix(TRACK_WEB_PREFIX))?;
    if id.is_empty() { None } else { Some(id) }
}

#[cfg(test)]
mod tests {
    use super::track_id;

    #[test]
    fn both_locator_forms_yield_the_same_id() {
        assert_eq!(track_id("tidal://track/42"), Some("42"));
        assert_eq!(track_id("https://listen.tidal.com/track/42"), Some("42"));
    }

    #[test]
    fn empty_id_is_not_handled() {
        assert_eq!(track_id("tidal://track/"), None);
        assert_eq!(track_id("https://listen.tidal.com/track/"), None);
    }

    #[test]
    fn unrelated_locators_are_not_handled() {
        assert_eq!(track_id("file:///music/42.flac"), None);
        assert_eq!(track_id("tidal://album/42"), None);
        assert_eq!(track_id("http://listen.tidal.com/track/42"), None);
    }
}
