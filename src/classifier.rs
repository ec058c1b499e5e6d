//! Stock status classification of fetched page content.
//!
//! Checks run in a fixed order and the first match wins:
//!
//! 1. an "add to cart" / "add to bag" call to action anywhere on the page,
//! 2. an "add to basket" control that is enabled, visible, not marked disabled
//!    and rendered on a dark background,
//! 3. an "add to wishlist" control on its own,
//! 4. otherwise the status is unknown.
//!
//! Some storefronts render the basket button with identical markup whether it is
//! active or not and only change its background, hence the color test in step 2.
//! Anything that prevents reading that color skips the element, so an unreadable
//! page never produces an `InStock` from the basket check.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::StatusVerdict;
use crate::plugins::traits::{PageContent, PageElement};

pub const CALL_TO_ACTION_PHRASES: [&str; 2] = ["add to cart", "add to bag"];
pub const BASKET_PHRASE: &str = "add to basket";
pub const WISHLIST_PHRASE: &str = "add to wishlist";

/// Every phrase the classifier looks at, used by backends to pick elements worth reporting.
pub const STOCK_PHRASES: [&str; 4] = ["add to cart", "add to bag", BASKET_PHRASE, WISHLIST_PHRASE];

/// Each RGB component must be strictly below this for a button to count as dark.
pub const DARKNESS_THRESHOLD: u32 = 50;

static COLOR_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("color component pattern is valid"));

pub fn classify(content: &PageContent) -> StatusVerdict {
    if has_call_to_action(content) {
        return StatusVerdict::InStock;
    }

    if content
        .elements_containing(BASKET_PHRASE)
        .any(is_active_basket_control)
    {
        return StatusVerdict::InStock;
    }

    if content.contains_text(WISHLIST_PHRASE)
        || content.elements_containing(WISHLIST_PHRASE).next().is_some()
    {
        return StatusVerdict::OutOfStock;
    }

    StatusVerdict::Unknown
}

fn has_call_to_action(content: &PageContent) -> bool {
    CALL_TO_ACTION_PHRASES.iter().any(|phrase| {
        content.contains_text(phrase) || content.elements_containing(phrase).next().is_some()
    })
}

/// An "add to basket" element only counts when it is rendered as a live, dark button.
pub fn is_active_basket_control(element: &PageElement) -> bool {
    if !element.enabled || !element.visible || element.is_marked_disabled() {
        return false;
    }

    match element.background_color.as_deref().map(parse_rgb) {
        Some(Some((r, g, b))) => {
            r < DARKNESS_THRESHOLD && g < DARKNESS_THRESHOLD && b < DARKNESS_THRESHOLD
        }
        _ => {
            tracing::trace!("Skipping basket element without a readable background color");
            false
        }
    }
}

/// Extracts the first three numeric components of an `rgb(..)`/`rgba(..)` color.
pub fn parse_rgb(color: &str) -> Option<(u32, u32, u32)> {
    let color = color.to_lowercase();
    if !color.contains("rgb") {
        return None;
    }

    let mut components = COLOR_COMPONENT
        .find_iter(&color)
        .map(|m| m.as_str().parse::<u32>().ok());

    let r = components.next()??;
    let g = components.next()??;
    let b = components.next()??;
    Some((r, g, b))
}
