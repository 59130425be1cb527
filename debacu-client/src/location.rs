//! Navigation context
//!
//! The loader only needs to look for the checkout marker and strip it by
//! replacing the current history entry.

use reqwest::Url;

use crate::{ClientError, ClientResult};

/// Current location with history-replacement support
pub trait NavigationContext: Send {
    /// Whether the current URL carries query parameter `name`
    fn has_param(&self, name: &str) -> bool;

    /// Drop every occurrence of `name` by replacing the current history
    /// entry (no navigation, no reload)
    fn remove_param(&mut self, name: &str);
}

/// URL-backed location
#[derive(Debug, Clone)]
pub struct UrlLocation {
    current: Url,
    navigations: usize,
    replacements: usize,
}

impl UrlLocation {
    pub fn parse(url: &str) -> ClientResult<Self> {
        let current = Url::parse(url)
            .map_err(|e| ClientError::Validation(format!("invalid location {url}: {e}")))?;
        Ok(Self::new(current))
    }

    pub fn new(current: Url) -> Self {
        Self {
            current,
            navigations: 0,
            replacements: 0,
        }
    }

    pub fn url(&self) -> &Url {
        &self.current
    }

    /// Move to a new URL, pushing a history entry
    pub fn navigate(&mut self, url: Url) {
        self.current = url;
        self.navigations += 1;
    }

    /// Number of real navigations performed
    pub fn navigations(&self) -> usize {
        self.navigations
    }

    /// Number of in-place history replacements performed
    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl NavigationContext for UrlLocation {
    fn has_param(&self, name: &str) -> bool {
        self.current.query_pairs().any(|(k, _)| k == name)
    }

    fn remove_param(&mut self, name: &str) {
        if !self.has_param(name) {
            return;
        }

        let kept: Vec<(String, String)> = self
            .current
            .query_pairs()
            .filter(|(k, _)| k != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            self.current.set_query(None);
        } else {
            self.current.query_pairs_mut().clear().extend_pairs(kept);
        }
        self.replacements += 1;
    }
}
