use scraper::{ElementRef, Html};

use crate::classifier::STOCK_PHRASES;
use crate::plugins::traits::{normalize_text, PageElement};

/// Tags whose text is never rendered.
const NON_RENDERED_TAGS: [&str; 6] = ["script", "style", "noscript", "template", "head", "title"];

/// Builds [`PageElement`]s from static HTML.
///
/// Without a rendering engine there is no computed style, so visibility and the
/// background color come from attributes and inline `style` declarations only.
/// An element without an inline background reports no color at all.
#[derive(Debug, Clone)]
pub struct ElementFinder {
    phrases: Vec<String>,
}

impl Default for ElementFinder {
    fn default() -> Self {
        Self::new(STOCK_PHRASES.iter().map(|p| p.to_string()).collect())
    }
}

impl ElementFinder {
    pub fn new(phrases: Vec<String>) -> Self {
        Self {
            phrases: phrases.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Returns every element whose own text mentions one of the configured phrases.
    pub fn extract(&self, html: &str) -> Vec<PageElement> {
        let document = Html::parse_document(html);
        let mut elements = Vec::new();

        for node in document.root_element().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };

            let tag = element.value().name();
            if NON_RENDERED_TAGS.contains(&tag) {
                continue;
            }

            let text = normalize_text(&own_text(&element));
            if text.is_empty() || !self.phrases.iter().any(|p| text.contains(p.as_str())) {
                continue;
            }

            elements.push(PageElement {
                tag: tag.to_string(),
                text,
                enabled: is_enabled(&element),
                visible: is_visible(&element),
                disabled_attr: element.value().attr("disabled").is_some(),
                aria_disabled: element.value().attr("aria-disabled").map(str::to_string),
                background_color: inline_background(&element),
            });
        }

        elements
    }
}

/// Text held directly by the element, ignoring descendants.
fn own_text(element: &ElementRef) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| &**text)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_enabled(element: &ElementRef) -> bool {
    if element.value().attr("disabled").is_some() {
        return false;
    }
    !element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            ancestor.value().name() == "fieldset" && ancestor.value().attr("disabled").is_some()
        })
}

fn is_visible(element: &ElementRef) -> bool {
    std::iter::once(*element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .all(|el| !is_hidden(&el))
}

fn is_hidden(element: &ElementRef) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    if value
        .attr("aria-hidden")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return true;
    }
    if value.name() == "input" && value.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")) {
        return true;
    }

    style_declarations(element).any(|(name, val)| {
        (name == "display" && val == "none") || (name == "visibility" && val == "hidden")
    })
}

fn style_declarations<'a>(element: &'a ElementRef) -> impl Iterator<Item = (String, String)> + 'a {
    element
        .value()
        .attr("style")
        .unwrap_or_default()
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(name, value)| {
            (
                name.trim().to_lowercase(),
                value.replace("!important", "").trim().to_lowercase(),
            )
        })
}

fn inline_background(element: &ElementRef) -> Option<String> {
    // Later declarations win, as in the cascade.
    style_declarations(element)
        .filter(|(name, _)| name == "background-color" || name == "background")
        .filter_map(|(_, value)| resolve_css_color(&value))
        .last()
}

/// Resolves a CSS color value to the `rgb(r, g, b)` form a browser reports.
pub fn resolve_css_color(value: &str) -> Option<String> {
    let value = value.trim().to_lowercase();

    if let Some(start) = value.find("rgb") {
        let end = value[start..].find(')')? + start;
        return Some(value[start..=end].to_string());
    }

    for token in value.split_whitespace() {
        if let Some(hex) = token.strip_prefix('#') {
            if let Some(color) = hex_to_rgb(hex) {
                return Some(color);
            }
        }
        let named = match token {
            "black" => Some("rgb(0, 0, 0)"),
            "white" => Some("rgb(255, 255, 255)"),
            "transparent" => Some("rgba(0, 0, 0, 0)"),
            "red" => Some("rgb(255, 0, 0)"),
            "green" => Some("rgb(0, 128, 0)"),
            "blue" => Some("rgb(0, 0, 255)"),
            "gray" | "grey" => Some("rgb(128, 128, 128)"),
            "lightgray" | "lightgrey" => Some("rgb(211, 211, 211)"),
            "darkgray" | "darkgrey" => Some("rgb(169, 169, 169)"),
            _ => None,
        };
        if let Some(color) = named {
            return Some(color.to_string());
        }
    }

    None
}

fn hex_to_rgb(hex: &str) -> Option<String> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().take(3).flat_map(|c| [c, c]).collect(),
        6 | 8 => hex[..6].to_string(),
        _ => return None,
    };

    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some(format!(
        "rgb({}, {}, {})",
        channel(0)?,
        channel(2)?,
        channel(4)?
    ))
}
