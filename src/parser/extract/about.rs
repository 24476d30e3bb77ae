use anyhow::Result;

use crate::browser::Page;
use crate::parser::sections::{SectionResolver, SectionSpec};
use crate::parser::strategy::{extract, JoinedText, Locator, OwnText, TextAt, TextMatch};

pub const SECTION: SectionSpec = SectionSpec {
    name: "About",
    locators: LOCATORS,
    expand: TOGGLES,
};

const LOCATORS: &[Locator] = &[
    Locator::Css("section[data-section='summary']"),
    Locator::Css("section[class*='summary']"),
    Locator::Has {
        css: "section",
        child: "div[id*='about']",
        text: None,
    },
    Locator::Has {
        css: "section",
        child: "span",
        text: Some(TextMatch::Exact("About")),
    },
];

const TOGGLES: &[Locator] = &[
    Locator::WithText {
        css: "button",
        text: "see more",
    },
    Locator::Css("button[aria-label*='expand']"),
    Locator::WithText {
        css: "button",
        text: "show more",
    },
];

const BODY_SPAN: &[Locator] = &[Locator::Css("div.display-flex > span, div[class*='display-flex'] > span")];
const SHOW_MORE_TEXT: &[Locator] = &[Locator::Css("div[class*='inline-show-more-text']")];
const HIDDEN_PARAGRAPHS: &[Locator] = &[Locator::Css("span[class*='visually-hidden']")];

pub fn extract_about<P: Page>(page: &P, resolver: &SectionResolver) -> Result<String> {
    let about = resolver.with_section(page, &SECTION, |section| -> String {
        extract(
            page,
            section,
            "about",
            &[
                &TextAt(BODY_SPAN),
                &TextAt(SHOW_MORE_TEXT),
                &JoinedText(HIDDEN_PARAGRAPHS),
                &OwnText {
                    strip_heading: "About",
                },
            ],
        )
    })?;
    Ok(about.unwrap_or_default())
}
