//! HTTP media-type negotiation.
//!
//! A header list is comma-separated with optional parameters after `;`.
//! Parsing only classifies: several variants may be recognized at once, and
//! the response encoder owns the precedence between them.

/// Media-type constants for response Content-Type values.
pub const MEDIA_TYPE_TAXII21: &str = "application/taxii+json; charset=utf-8; version=2.1";
pub const MEDIA_TYPE_TAXII20: &str = "application/vnd.oasis.taxii+json; charset=utf-8; version=2.0";
pub const MEDIA_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const MEDIA_TYPE_HTML: &str = "text/html; charset=utf-8";

/// Recognized media variants of one header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MediaType {
    pub taxii21: bool,
    pub taxii20: bool,
    pub stix21: bool,
    pub stix20: bool,
    pub json: bool,
    pub html: bool,
}

impl MediaType {
    /// Classify every variant of an `Accept` header.
    pub fn from_accept(header: &str) -> Self {
        let mut media = Self::default();
        media.parse_taxii(header);
        media.parse_stix(header);
        media
    }

    /// Parse a header against the TAXII media types.
    pub fn parse_taxii(&mut self, header: &str) {
        // Remove whitespace after each semicolon before matching.
        let cleaned = header.replace("; ", ";");

        for item in cleaned.split(',') {
            let item = item.trim();
            match item {
                "*" | "*/*" | "application/taxii+json"
                | "application/taxii+json;version=2.1" => self.taxii21 = true,
                "application/vnd.oasis.taxii+json"
                | "application/vnd.oasis.taxii+json;version=2.0" => self.taxii20 = true,
                _ if item.contains("application/json") => self.json = true,
                _ if item.contains("text/html") => self.html = true,
                _ => {}
            }
        }
    }

    /// Parse a header against the STIX media types.
    pub fn parse_stix(&mut self, header: &str) {
        let cleaned = header.replace(' ', "");

        for item in cleaned.split(',') {
            match item {
                "*" | "*/*" | "application/stix+json" | "application/stix+json;version=2.1" => {
                    self.stix21 = true
                }
                "application/vnd.oasis.stix+json"
                | "application/vnd.oasis.stix+json;version=2.0" => self.stix20 = true,
                _ if item.contains("application/json") => self.json = true,
                _ if item.contains("text/html") => self.html = true,
                _ => {}
            }
        }
    }

    /// Whether any recognized variant was requested.
    pub fn any(&self) -> bool {
        self.taxii21 || self.taxii20 || self.stix21 || self.stix20 || self.json || self.html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_taxii21() {
        let mut media = MediaType::default();
        media.parse_taxii("*/*");
        assert!(media.taxii21);
        assert!(!media.taxii20);
    }

    #[test]
    fn versioned_taxii21_with_space_after_semicolon() {
        let mut media = MediaType::default();
        media.parse_taxii("application/taxii+json; version=2.1");
        assert!(media.taxii21);
    }

    #[test]
    fn taxii20_legacy_media_type() {
        let mut media = MediaType::default();
        media.parse_taxii("application/vnd.oasis.taxii+json;version=2.0");
        assert!(media.taxii20);
        assert!(!media.taxii21);
    }

    #[test]
    fn json_and_html_are_substring_matches() {
        let mut media = MediaType::default();
        media.parse_taxii("application/json;q=0.9,text/html");
        assert!(media.json);
        assert!(media.html);
        assert!(!media.taxii21);
    }

    #[test]
    fn comma_separated_list_sets_multiple_variants() {
        let mut media = MediaType::default();
        media.parse_taxii("application/taxii+json;version=2.1, application/json");
        assert!(media.taxii21);
        assert!(media.json);
    }

    #[test]
    fn stix_variants() {
        let mut media = MediaType::default();
        media.parse_stix("application/stix+json; version=2.1");
        assert!(media.stix21);

        let mut media = MediaType::default();
        media.parse_stix("application/vnd.oasis.stix+json");
        assert!(media.stix20);
    }

    #[test]
    fn unknown_media_types_match_nothing() {
        let media = MediaType::from_accept("text/plain");
        assert!(!media.any());

        let media = MediaType::from_accept("");
        assert!(!media.any());
    }

    #[test]
    fn from_accept_merges_taxii_and_stix() {
        let media = MediaType::from_accept("application/stix+json, application/taxii+json");
        assert!(media.taxii21);
        assert!(media.stix21);
    }
}
