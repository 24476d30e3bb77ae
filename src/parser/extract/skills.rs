use anyhow::Result;

use super::{list_section, read_items};
use crate::browser::Page;
use crate::parser::sections::{SectionResolver, SectionSpec};
use crate::parser::strategy::{extract, Locator, TextAt, TextMatch};

pub const SECTION: SectionSpec = list_section(
    "Skills",
    &[
        Locator::Has {
            css: "section",
            child: "div#skills",
            text: None,
        },
        Locator::Has {
            css: "section",
            child: "div[class*='pvs-header__container'] h2, div[class*='pvs-header__container'] span",
            text: Some(TextMatch::Exact("Skills")),
        },
    ],
);

const NAME: &[Locator] = &[Locator::Css("span[class*='hoverable-link-text']")];
const NAME_BOLD: &[Locator] = &[Locator::Css("span[class*='t-bold']")];

/// One name per list item; an item whose name cannot be read stays in the
/// list as an empty string.
pub fn extract_skills<P: Page>(page: &P, resolver: &SectionResolver) -> Result<Vec<String>> {
    read_items(page, resolver, &SECTION, |item| -> String {
        extract(page, item, "skill", &[&TextAt(NAME), &TextAt(NAME_BOLD)])
    })
}
