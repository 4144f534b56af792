//! Search query encoding
//!
//! Catalog search endpoints disagree on how a space is written in the query
//! string: some expect form encoding (`+`), others percent encoding (`%20`).
//! Encoding is otherwise standard `application/x-www-form-urlencoded`.

use serde::Deserialize;
use url::form_urlencoded;

/// How spaces are written in an encoded query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpaceEncoding {
    /// `air max` -> `air+max`
    #[default]
    Plus,
    /// `air max` -> `air%20max`
    Percent,
}

/// Trims a query and collapses internal whitespace runs to single spaces
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Encodes a query for substitution into a search URL template
///
/// The query is whitespace-normalized first. The output only contains
/// characters that are safe inside a URL query component.
///
/// # Examples
///
/// ```
/// use catalog_crawler::url::{encode_query, SpaceEncoding};
///
/// assert_eq!(encode_query("air  max", SpaceEncoding::Plus), "air+max");
/// assert_eq!(encode_query("air max", SpaceEncoding::Percent), "air%20max");
/// assert_eq!(encode_query("90's & co", SpaceEncoding::Plus), "90%27s+%26+co");
/// ```
pub fn encode_query(query: &str, spaces: SpaceEncoding) -> String {
    let normalized = normalize_query(query);
    let encoded: String = form_urlencoded::byte_serialize(normalized.as_bytes()).collect();

    match spaces {
        SpaceEncoding::Plus => encoded,
        // A literal '+' is serialized as %2B, so every remaining '+' is a space
        SpaceEncoding::Percent => encoded.replace('+', "%20"),
    }
}

/// Decodes a query produced by [`encode_query`] (either space convention)
pub fn decode_query(encoded: &str) -> String {
    form_urlencoded::parse(format!("q={}", encoded).as_bytes())
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_encoding() {
        assert_eq!(encode_query("air max", SpaceEncoding::Plus), "air+max");
    }

    #[test]
    fn test_percent_encoding() {
        assert_eq!(encode_query("air max 90", SpaceEncoding::Percent), "air%20max%2090");
    }

    #[test]
    fn test_whitespace_is_normalized() {
        assert_eq!(encode_query("  air \t max  ", SpaceEncoding::Plus), "air+max");
    }

    #[test]
    fn test_literal_plus_survives_percent_mode() {
        let encoded = encode_query("c++ tee", SpaceEncoding::Percent);
        assert_eq!(encoded, "c%2B%2B%20tee");
        assert_eq!(decode_query(&encoded), "c++ tee");
    }

    #[test]
    fn test_round_trip_both_conventions() {
        let queries = ["air max", "Tech Fleece & joggers", "über-cool 50% off", "a/b?c=d#e"];
        for query in queries {
            for spaces in [SpaceEncoding::Plus, SpaceEncoding::Percent] {
                let encoded = encode_query(query, spaces);
                assert!(
                    encoded
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || "%+-._*".contains(c)),
                    "unsafe character in {}",
                    encoded
                );
                assert_eq!(decode_query(&encoded), normalize_query(query));
            }
        }
    }

    #[test]
    fn test_round_trip_modulo_whitespace() {
        let encoded = encode_query("  running   shoes ", SpaceEncoding::Plus);
        assert_eq!(decode_query(&encoded), "running shoes");
    }
}
