//! Top card: name, headline, location.

use crate::browser::Page;
use crate::parser::strategy::{extract, Locator, TextAt};

const NAME: &[Locator] = &[Locator::Css("h1.text-heading-xlarge")];
const ANY_H1: &[Locator] = &[Locator::Css("main h1, h1")];
const HEADLINE: &[Locator] = &[Locator::Css("div.text-body-medium")];
const HEADLINE_TOP_CARD: &[Locator] = &[
    Locator::Css("section.pv-top-card, div.pv-text-details__left-panel"),
    Locator::Css("div[class*='text-body-medium']"),
];
const LOCATION: &[Locator] = &[Locator::Css("span.text-body-small.inline")];
const LOCATION_TOP_CARD: &[Locator] = &[
    Locator::Css("div.pv-text-details__left-panel, section.pv-top-card"),
    Locator::Css("span[class*='text-body-small'][class*='inline']"),
];

pub fn full_name<P: Page>(page: &P, root: &P::Region) -> String {
    extract(page, root, "full_name", &[&TextAt(NAME), &TextAt(ANY_H1)])
}

pub fn headline<P: Page>(page: &P, root: &P::Region) -> String {
    extract(page, root, "headline", &[&TextAt(HEADLINE), &TextAt(HEADLINE_TOP_CARD)])
}

pub fn location<P: Page>(page: &P, root: &P::Region) -> String {
    extract(page, root, "location", &[&TextAt(LOCATION), &TextAt(LOCATION_TOP_CARD)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fixture::FixturePage;

    #[test]
    fn plain_h1_fallback() {
        let page = FixturePage::new(
            "<html><body><main><h1> Ana  Ruiz </h1><div class='text-body-medium'>PM</div></main></body></html>",
        );
        let root = page.root().unwrap();
        assert_eq!(full_name(&page, &root), "Ana Ruiz");
        assert_eq!(headline(&page, &root), "PM");
        assert_eq!(location(&page, &root), "");
    }
}
