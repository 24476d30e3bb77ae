use anyhow::Result;

use super::{list_section, read_items};
use crate::browser::Page;
use crate::model::ExperienceEntry;
use crate::parser::sections::{SectionResolver, SectionSpec};
use crate::parser::strategy::{extract, ClickThen, Locator, TextAt, TextMatch};

pub const SECTION: SectionSpec = list_section(
    "Experience",
    &[
        Locator::Has {
            css: "section",
            child: "div#experience",
            text: None,
        },
        Locator::Has {
            css: "section",
            child: "div[class*='pvs-header__container'] h2, div[class*='pvs-header__container'] span",
            text: Some(TextMatch::Exact("Experience")),
        },
    ],
);

const COMPANY: &[Locator] = &[Locator::Css("span[class*='hoverable-link-text']")];
const TITLE: &[Locator] = &[Locator::Css("span[class*='t-bold']")];
const DATES: &[Locator] = &[Locator::Css("span.t-normal.t-black--light")];
const DESCRIPTION: &[Locator] =
    &[Locator::Css("div[class*='pvs-list__item--no-padding-when-nested'] > span")];
const DESCRIPTION_EXPANDED: &[Locator] = &[Locator::Css("div[class*='inline-show-more-text']")];
const DESCRIPTION_TOGGLE: &[Locator] = &[Locator::Css("button[class*='inline-show-more-text__button']")];

pub fn extract_experiences<P: Page>(
    page: &P,
    resolver: &SectionResolver,
) -> Result<Vec<ExperienceEntry>> {
    let expanded = TextAt(DESCRIPTION_EXPANDED);
    let see_more = ClickThen {
        toggle: DESCRIPTION_TOGGLE,
        settle: resolver.click_settle,
        then: &expanded,
    };
    read_items(page, resolver, &SECTION, |item| ExperienceEntry {
        title: extract(page, item, "experience.title", &[&TextAt(TITLE)]),
        company: extract(page, item, "experience.company", &[&TextAt(COMPANY)]),
        date_range: extract(page, item, "experience.date_range", &[&TextAt(DATES)]),
        description: extract(
            page,
            item,
            "experience.description",
            &[&TextAt(DESCRIPTION), &see_more],
        ),
    })
}
