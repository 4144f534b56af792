use url::Url;

/// Tracking query parameters dropped from product links
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid"];

/// Resolves a product card href into the absolute link used as record identity
///
/// # Normalization Steps
///
/// 1. Reject empty hrefs, fragment-only hrefs, and `javascript:`, `mailto:`,
///    `tel:`, `data:` schemes
/// 2. Resolve against the site origin (root-relative `/t/air-max` becomes
///    `https://origin/t/air-max`; absolute links are kept as-is)
/// 3. Reject anything that is not HTTP(S) after resolution
/// 4. Remove the fragment
/// 5. Remove tracking query parameters (`utm_*`, `fbclid`, `gclid`),
///    keeping the remaining parameters in their original order
///
/// # Arguments
///
/// * `href` - The raw href attribute text
/// * `origin` - The site origin listing pages belong to
///
/// # Returns
///
/// * `Some(String)` - The absolute link
/// * `None` - The href cannot identify a product
///
/// # Examples
///
/// ```
/// use catalog_crawler::url::absolutize_link;
/// use url::Url;
///
/// let origin = Url::parse("https://www.nike.com").unwrap();
/// assert_eq!(
///     absolutize_link("/t/air-max-90?utm_source=x", &origin).as_deref(),
///     Some("https://www.nike.com/t/air-max-90")
/// );
/// ```
pub fn absolutize_link(href: &str, origin: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut url = origin.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Some(url.to_string())
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://www.nike.com").unwrap()
    }

    #[test]
    fn test_root_relative_link() {
        let link = absolutize_link("/t/air-max-90-shoes-kRsBnD/CN8490-002", &origin());
        assert_eq!(
            link.as_deref(),
            Some("https://www.nike.com/t/air-max-90-shoes-kRsBnD/CN8490-002")
        );
    }

    #[test]
    fn test_absolute_link_is_kept() {
        let link = absolutize_link("https://cdn.example.com/p/1", &origin());
        assert_eq!(link.as_deref(), Some("https://cdn.example.com/p/1"));
    }

    #[test]
    fn test_protocol_relative_link() {
        let link = absolutize_link("//www.nike.com/t/x", &origin());
        assert_eq!(link.as_deref(), Some("https://www.nike.com/t/x"));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let link = absolutize_link("  /t/x \n", &origin());
        assert_eq!(link.as_deref(), Some("https://www.nike.com/t/x"));
    }

    #[test]
    fn test_fragment_removed() {
        let link = absolutize_link("/t/x#reviews", &origin());
        assert_eq!(link.as_deref(), Some("https://www.nike.com/t/x"));
    }

    #[test]
    fn test_tracking_params_removed_others_kept() {
        let link = absolutize_link("/t/x?utm_medium=a&colour=red&fbclid=zz&size=9", &origin());
        assert_eq!(
            link.as_deref(),
            Some("https://www.nike.com/t/x?colour=red&size=9")
        );
    }

    #[test]
    fn test_product_params_distinguish_links() {
        let a = absolutize_link("/t/x?ref=a1&source=feed", &origin());
        let b = absolutize_link("/t/x?ref=b2&source=feed", &origin());
        assert_eq!(
            a.as_deref(),
            Some("https://www.nike.com/t/x?ref=a1&source=feed")
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejected_hrefs() {
        for href in [
            "",
            "   ",
            "#top",
            "javascript:void(0)",
            "JavaScript:void(0)",
            "mailto:help@nike.com",
            "tel:+44123",
            "data:text/html,hi",
            "ftp://files.nike.com/x",
        ] {
            assert_eq!(absolutize_link(href, &origin()), None, "href {:?}", href);
        }
    }
}
