//! Category resolution from breadcrumbs or an explicit override

use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-level category labels for a product; absent levels are empty strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPath {
    pub category: String,
    pub subcategory: String,
    pub sub_subcategory: String,
}

impl CategoryPath {
    pub fn new(
        category: impl Into<String>,
        subcategory: impl Into<String>,
        sub_subcategory: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
            sub_subcategory: sub_subcategory.into(),
        }
    }

    /// Returns true if every level is empty
    pub fn is_empty(&self) -> bool {
        self.category.is_empty() && self.subcategory.is_empty() && self.sub_subcategory.is_empty()
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels: Vec<&str> = [
            self.category.as_str(),
            self.subcategory.as_str(),
            self.sub_subcategory.as_str(),
        ]
        .into_iter()
        .filter(|level| !level.is_empty())
        .collect();

        if levels.is_empty() {
            write!(f, "(uncategorized)")
        } else {
            write!(f, "{}", levels.join(" > "))
        }
    }
}

/// Resolves the category triple for a product
///
/// An override, when given, wins outright. Otherwise breadcrumb entries map
/// positionally to category, subcategory and sub-subcategory. Entries are
/// trimmed but keep their position, so a blank first crumb leaves the
/// category empty. Anything past the third level is ignored.
///
/// # Example
///
/// ```
/// use catalog_crawler::crawler::{resolve_category, CategoryPath};
///
/// let crumbs = vec!["Men".to_string(), "Shoes".to_string()];
/// let path = resolve_category(&crumbs, None);
/// assert_eq!(path, CategoryPath::new("Men", "Shoes", ""));
/// ```
pub fn resolve_category(breadcrumbs: &[String], override_path: Option<&CategoryPath>) -> CategoryPath {
    if let Some(path) = override_path {
        return path.clone();
    }

    let mut levels = breadcrumbs.iter().map(|crumb| crumb.trim().to_string());

    CategoryPath {
        category: levels.next().unwrap_or_default(),
        subcategory: levels.next().unwrap_or_default(),
        sub_subcategory: levels.next().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crumbs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_no_breadcrumbs_is_empty() {
        let path = resolve_category(&[], None);
        assert!(path.is_empty());
        assert_eq!(path.to_string(), "(uncategorized)");
    }

    #[test]
    fn test_positional_mapping() {
        let path = resolve_category(&crumbs(&["Men", "Shoes", "Running", "Road"]), None);
        assert_eq!(path, CategoryPath::new("Men", "Shoes", "Running"));
        assert_eq!(path.to_string(), "Men > Shoes > Running");
    }

    #[test]
    fn test_blank_crumbs_keep_position() {
        let path = resolve_category(&crumbs(&["", "Women", "Running"]), None);
        assert_eq!(path, CategoryPath::new("", "Women", "Running"));

        let path = resolve_category(&crumbs(&["  ", " Women ", ""]), None);
        assert_eq!(path, CategoryPath::new("", "Women", ""));
    }

    #[test]
    fn test_override_wins() {
        let label = CategoryPath::new("Sale", "", "");
        let path = resolve_category(&crumbs(&["Men", "Shoes"]), Some(&label));
        assert_eq!(path, label);
    }
}
