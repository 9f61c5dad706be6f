//! DocLauncher configurations.
//!
//! The listing endpoint returns [`ConfigurationPage`]s; the client folds
//! them into one [`ConfigurationList`] in server order.

use serde::{Deserialize, Serialize};

/// A named generation template, referenced by its opaque `Href`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Configuration {
    /// Server-side identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Reference passed back when launching a task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Configuration {
    /// Label used when presenting the configuration to an operator.
    ///
    /// `"{name} ({id})"` when both are known, the name alone when only it
    /// is, `"Unnamed"` otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use clm_models::Configuration;
    ///
    /// let cfg = Configuration {
    ///     id: Some("42".into()),
    ///     name: Some("NDA".into()),
    ///     href: None,
    /// };
    /// assert_eq!(cfg.display_name(), "NDA (42)");
    /// ```
    pub fn display_name(&self) -> String {
        let name = self.name.as_deref().filter(|n| !n.is_empty());
        let id = self.id.as_deref().filter(|i| !i.is_empty());
        match (name, id) {
            (Some(name), Some(id)) => format!("{name} ({id})"),
            (Some(name), None) => name.to_string(),
            _ => "Unnamed".to_string(),
        }
    }

    /// Case-insensitive substring match against [`display_name`](Self::display_name).
    /// An empty term matches everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty() || self.display_name().to_lowercase().contains(&term)
    }
}

/// One page of the configuration listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigurationPage {
    /// Configurations on this page.
    #[serde(default)]
    pub items: Vec<Configuration>,
    /// Absolute URL of the next page, absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

/// All configurations of an account, aggregated across pages.
///
/// Duplicates returned by the server are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigurationList {
    /// Configurations in server order.
    pub items: Vec<Configuration>,
    /// Number of items, always `items.len()`.
    pub total: usize,
}

impl ConfigurationList {
    /// Build a list from already aggregated items.
    pub fn new(items: Vec<Configuration>) -> Self {
        let total = items.len();
        Self { items, total }
    }

    /// Append a page's items, preserving order.
    pub fn extend_page(&mut self, page: Vec<Configuration>) {
        self.items.extend(page);
        self.total = self.items.len();
    }

    /// Configurations matching `term`, in list order.
    pub fn filter(&self, term: &str) -> Vec<&Configuration> {
        self.items.iter().filter(|c| c.matches(term)).collect()
    }

    /// First configuration whose display name or id equals `key`.
    pub fn find(&self, key: &str) -> Option<&Configuration> {
        self.items
            .iter()
            .find(|c| c.display_name() == key || c.id.as_deref() == Some(key))
    }

    /// `true` when no configuration was returned.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
