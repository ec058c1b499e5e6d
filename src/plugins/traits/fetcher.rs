use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::error::FetchError;

/// One element of a fetched page, as reported by the backend that rendered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageElement {
    pub tag: String,
    /// The element's own text, lowercased with whitespace collapsed.
    pub text: String,
    pub enabled: bool,
    pub visible: bool,
    /// The element carries a `disabled` attribute.
    #[serde(default)]
    pub disabled_attr: bool,
    #[serde(default)]
    pub aria_disabled: Option<String>,
    /// Resolved background color (`rgb(..)`/`rgba(..)`), `None` when it could not be read.
    #[serde(default)]
    pub background_color: Option<String>,
}

impl PageElement {
    pub fn new(tag: impl Into<String>, text: impl AsRef<str>) -> Self {
        Self {
            tag: tag.into(),
            text: normalize_text(text.as_ref()),
            enabled: true,
            visible: true,
            disabled_attr: false,
            aria_disabled: None,
            background_color: None,
        }
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_disabled_attr(mut self) -> Self {
        self.disabled_attr = true;
        self
    }

    pub fn with_aria_disabled(mut self, value: impl Into<String>) -> Self {
        self.aria_disabled = Some(value.into());
        self
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.text.contains(phrase)
    }

    /// Marked as disabled through either the attribute or `aria-disabled="true"`.
    pub fn is_marked_disabled(&self) -> bool {
        self.disabled_attr
            || self
                .aria_disabled
                .as_deref()
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }
}

/// Page content handed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    text: String,
    elements: Vec<PageElement>,
}

impl PageContent {
    pub fn new(url: impl Into<String>, raw_text: &str, elements: Vec<PageElement>) -> Self {
        let elements = elements
            .into_iter()
            .map(|mut element| {
                element.text = normalize_text(&element.text);
                element
            })
            .collect();

        Self {
            url: url.into(),
            text: normalize_text(raw_text),
            elements,
        }
    }

    /// Lowercased page text with runs of whitespace collapsed to a single space.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn elements(&self) -> &[PageElement] {
        &self.elements
    }

    pub fn contains_text(&self, phrase: &str) -> bool {
        self.text.contains(phrase)
    }

    pub fn find_elements<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a PageElement> + 'a
    where
        P: Fn(&PageElement) -> bool + 'a,
    {
        self.elements.iter().filter(move |element| predicate(element))
    }

    pub fn elements_containing<'a>(
        &'a self,
        phrase: &'a str,
    ) -> impl Iterator<Item = &'a PageElement> + 'a {
        self.find_elements(move |element| element.contains(phrase))
    }
}

pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A backend that turns a URL into classifiable page content.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    fn name(&self) -> &str;

    /// Fetches `url`, giving up once `timeout` has passed without usable content.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<PageContent, FetchError>;
}
