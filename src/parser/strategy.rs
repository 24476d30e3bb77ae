//! Field extraction: ordered fallback strategies over a scoped region.
//!
//! A field is declared as a list of strategies. [`extract`] tries them in
//! order and returns the first non-blank value, or the field's empty value
//! when every strategy misses. Later strategies are never evaluated once one
//! succeeds.

use std::fmt;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

use crate::browser::{Page, Region};
use crate::model::SocialLink;

/// How an element's text must relate to an expected string.
#[derive(Debug, Clone, Copy)]
pub enum TextMatch {
    /// Case-insensitive substring.
    Contains(&'static str),
    /// Whole trimmed text, case-sensitive. Used for section headings.
    Exact(&'static str),
}

impl TextMatch {
    pub fn matches(&self, text: &str) -> bool {
        match *self {
            TextMatch::Contains(needle) => contains_ci(text, needle),
            TextMatch::Exact(expected) => text.trim() == expected,
        }
    }
}

/// How to find an element inside a scope.
#[derive(Debug, Clone, Copy)]
pub enum Locator {
    Css(&'static str),
    /// Elements matching `css` whose text contains `text` (case-insensitive).
    WithText { css: &'static str, text: &'static str },
    /// Elements matching `css` with a descendant matching `child`, optionally
    /// also matching `text`.
    Has {
        css: &'static str,
        child: &'static str,
        text: Option<TextMatch>,
    },
}

impl Locator {
    pub fn find_all<R: Region>(&self, scope: &R) -> Result<Vec<R>> {
        match *self {
            Locator::Css(css) => scope.find_all(css),
            Locator::WithText { css, text } => filter_text(scope, css, TextMatch::Contains(text)),
            Locator::Has { css, child, text } => {
                let mut out = Vec::new();
                for el in scope.find_all(css)? {
                    let hit = match text {
                        None => el.find_first(child)?.is_some(),
                        Some(m) => !filter_text(&el, child, m)?.is_empty(),
                    };
                    if hit {
                        out.push(el);
                    }
                }
                Ok(out)
            }
        }
    }

    pub fn find_first<R: Region>(&self, scope: &R) -> Result<Option<R>> {
        Ok(self.find_all(scope)?.into_iter().next())
    }
}

fn filter_text<R: Region>(scope: &R, css: &str, m: TextMatch) -> Result<Vec<R>> {
    let mut out = Vec::new();
    for el in scope.find_all(css)? {
        if m.matches(&el.text()?) {
            out.push(el);
        }
    }
    Ok(out)
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "{}", css),
            Locator::WithText { css, text } => write!(f, "{}~'{}'", css, text),
            Locator::Has { css, child, text: None } => write!(f, "{}:has({})", css, child),
            Locator::Has { css, child, text: Some(TextMatch::Contains(t)) } => {
                write!(f, "{}:has({}~'{}')", css, child, t)
            }
            Locator::Has { css, child, text: Some(TextMatch::Exact(t)) } => {
                write!(f, "{}:has({}='{}')", css, child, t)
            }
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Walk `path` from `scope`, taking the first match at each step.
pub fn locate<R: Region>(scope: &R, path: &[Locator]) -> Result<Option<R>> {
    let Some((last, steps)) = path.split_last() else {
        return Ok(None);
    };
    let mut owned: Option<R> = None;
    for step in steps {
        let next = match &owned {
            Some(cur) => step.find_first(cur)?,
            None => step.find_first(scope)?,
        };
        match next {
            Some(n) => owned = Some(n),
            None => return Ok(None),
        }
    }
    match &owned {
        Some(cur) => last.find_first(cur),
        None => last.find_first(scope),
    }
}

/// Like [`locate`] but returns every match of the final step.
pub fn locate_all<R: Region>(scope: &R, path: &[Locator]) -> Result<Vec<R>> {
    let Some((last, steps)) = path.split_last() else {
        return Ok(Vec::new());
    };
    if steps.is_empty() {
        return last.find_all(scope);
    }
    match locate(scope, steps)? {
        Some(parent) => last.find_all(&parent),
        None => Ok(Vec::new()),
    }
}

/// First locator (in order) that yields any element, with all its matches.
pub fn first_matching<R: Region>(scope: &R, locators: &[Locator]) -> Result<Vec<R>> {
    for locator in locators {
        let found = locator.find_all(scope)?;
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Ok(Vec::new())
}

fn path_label(path: &[Locator]) -> String {
    path.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(" > ")
}

// ── Field values ──

/// A field type with a canonical empty value.
pub trait FieldValue: Default {
    /// Trim strings; for lists, trim members and drop blank ones.
    fn normalize(self) -> Self;
    fn is_blank(&self) -> bool;
}

impl FieldValue for String {
    fn normalize(self) -> Self {
        self.trim().to_string()
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl FieldValue for Vec<String> {
    fn normalize(self) -> Self {
        self.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl FieldValue for Vec<SocialLink> {
    fn normalize(self) -> Self {
        self.into_iter()
            .map(|l| SocialLink {
                name: l.name.trim().to_string(),
                url: l.url.trim().to_string(),
            })
            .filter(|l| !l.url.is_empty() || !l.name.is_empty())
            .collect()
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

// ── Strategies ──

/// One way of reading a field. `Ok(None)` is "not found"; `Err` is a driver
/// failure and is logged by [`extract`] before moving on.
pub trait Strategy<P: Page, T> {
    fn describe(&self) -> String;
    fn attempt(&self, page: &P, region: &P::Region) -> Result<Option<T>>;
    /// Strategies that change the page (clicking a toggle). At most one runs
    /// per [`extract`] call.
    fn is_mutating(&self) -> bool {
        false
    }
}

/// Try `strategies` in order against `region`; first non-blank value wins.
pub fn extract<P: Page, T: FieldValue>(
    page: &P,
    region: &P::Region,
    field: &str,
    strategies: &[&dyn Strategy<P, T>],
) -> T {
    let mut mutated = false;
    for strategy in strategies {
        if strategy.is_mutating() {
            if mutated {
                debug!("{}: skipping {} (page already mutated)", field, strategy.describe());
                continue;
            }
            mutated = true;
        }
        match strategy.attempt(page, region) {
            Ok(Some(value)) => {
                let value = value.normalize();
                if !value.is_blank() {
                    return value;
                }
                debug!("{}: {} found only blank text", field, strategy.describe());
            }
            Ok(None) => debug!("{}: {} found nothing", field, strategy.describe()),
            Err(e) => warn!("{}: {} failed: {}", field, strategy.describe(), e),
        }
    }
    T::default()
}

/// Text of the element at `path`.
pub struct TextAt(pub &'static [Locator]);

/// Attribute of the element at `path`.
pub struct AttrAt(pub &'static [Locator], pub &'static str);

/// Texts of every element matching the last step, joined by newlines.
pub struct JoinedText(pub &'static [Locator]);

/// Attribute of every element matching the last step.
pub struct AttrList(pub &'static [Locator], pub &'static str);

/// Anchors matching the last step as `{name: text, url: href}`.
pub struct LinkList(pub &'static [Locator]);

/// The region's own text with a leading heading line removed.
pub struct OwnText {
    pub strip_heading: &'static str,
}

/// First regex match in the region's text.
pub struct Pattern(pub &'static LazyLock<Regex>);

/// A value known up front, used as the last resort.
pub struct Literal(pub String);

/// Click a toggle inside the region, let the page settle, then read with
/// `then`.
pub struct ClickThen<'a, P: Page, T> {
    pub toggle: &'static [Locator],
    pub settle: std::time::Duration,
    pub then: &'a dyn Strategy<P, T>,
}

impl<P: Page> Strategy<P, String> for TextAt {
    fn describe(&self) -> String {
        format!("text({})", path_label(self.0))
    }

    fn attempt(&self, _page: &P, region: &P::Region) -> Result<Option<String>> {
        match locate(region, self.0)? {
            Some(el) => Ok(Some(el.text()?)),
            None => Ok(None),
        }
    }
}

impl<P: Page> Strategy<P, String> for AttrAt {
    fn describe(&self) -> String {
        format!("attr({} @{})", path_label(self.0), self.1)
    }

    fn attempt(&self, _page: &P, region: &P::Region) -> Result<Option<String>> {
        match locate(region, self.0)? {
            Some(el) => el.attr(self.1),
            None => Ok(None),
        }
    }
}

impl<P: Page> Strategy<P, String> for JoinedText {
    fn describe(&self) -> String {
        format!("joined({})", path_label(self.0))
    }

    fn attempt(&self, _page: &P, region: &P::Region) -> Result<Option<String>> {
        let mut parts = Vec::new();
        for el in locate_all(region, self.0)? {
            let t = el.text()?;
            if !t.trim().is_empty() {
                parts.push(t.trim().to_string());
            }
        }
        Ok((!parts.is_empty()).then(|| parts.join("\n")))
    }
}

impl<P: Page> Strategy<P, Vec<String>> for AttrList {
    fn describe(&self) -> String {
        format!("attrs({} @{})", path_label(self.0), self.1)
    }

    fn attempt(&self, _page: &P, region: &P::Region) -> Result<Option<Vec<String>>> {
        let mut out = Vec::new();
        for el in locate_all(region, self.0)? {
            if let Some(v) = el.attr(self.1)? {
                out.push(v);
            }
        }
        Ok(Some(out))
    }
}

impl<P: Page> Strategy<P, Vec<SocialLink>> for LinkList {
    fn describe(&self) -> String {
        format!("links({})", path_label(self.0))
    }

    fn attempt(&self, _page: &P, region: &P::Region) -> Result<Option<Vec<SocialLink>>> {
        let mut out = Vec::new();
        for el in locate_all(region, self.0)? {
            out.push(SocialLink {
                name: el.text()?,
                url: el.attr("href")?.unwrap_or_default(),
            });
        }
        Ok(Some(out))
    }
}

impl<P: Page> Strategy<P, String> for OwnText {
    fn describe(&self) -> String {
        format!("own-text(-'{}')", self.strip_heading)
    }

    fn attempt(&self, _page: &P, region: &P::Region) -> Result<Option<String>> {
        let text = region.text()?;
        let text = text.trim();
        let stripped = text.strip_prefix(self.strip_heading).unwrap_or(text);
        Ok(Some(stripped.to_string()))
    }
}

impl<P: Page> Strategy<P, String> for Pattern {
    fn describe(&self) -> String {
        format!("pattern(/{}/)", self.0.as_str())
    }

    fn attempt(&self, _page: &P, region: &P::Region) -> Result<Option<String>> {
        let text = region.text()?;
        Ok(self.0.find(&text).map(|m| m.as_str().to_string()))
    }
}

impl<P: Page> Strategy<P, String> for Literal {
    fn describe(&self) -> String {
        format!("literal({})", self.0)
    }

    fn attempt(&self, _page: &P, _region: &P::Region) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

impl<P: Page, T> Strategy<P, T> for ClickThen<'_, P, T> {
    fn describe(&self) -> String {
        format!("click({}) then {}", path_label(self.toggle), self.then.describe())
    }

    fn attempt(&self, page: &P, region: &P::Region) -> Result<Option<T>> {
        let Some(toggle) = locate(region, self.toggle)? else {
            return Ok(None);
        };
        toggle.click()?;
        page.settle(self.settle)?;
        self.then.attempt(page, region)
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

// ── Tests ──
