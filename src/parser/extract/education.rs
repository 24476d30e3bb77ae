use anyhow::Result;

use super::{list_section, read_items};
use crate::browser::Page;
use crate::model::EducationEntry;
use crate::parser::sections::{SectionResolver, SectionSpec};
use crate::parser::strategy::{extract, Locator, TextAt, TextMatch};

pub const SECTION: SectionSpec = list_section(
    "Education",
    &[
        Locator::Has {
            css: "section",
            child: "div#education",
            text: None,
        },
        Locator::Has {
            css: "section",
            child: "div[class*='pvs-header__container'] h2, div[class*='pvs-header__container'] span",
            text: Some(TextMatch::Exact("Education")),
        },
    ],
);

const SCHOOL: &[Locator] = &[Locator::Css("span[class*='hoverable-link-text']")];
const DEGREE: &[Locator] = &[Locator::Css("span[class*='t-bold']")];
const FIELD_AND_DATE: &[Locator] = &[Locator::Css("span.t-normal.t-black--light")];
const FIELD_AND_DATE_ANY: &[Locator] = &[Locator::Css("span.t-14.t-normal")];

pub fn extract_education<P: Page>(
    page: &P,
    resolver: &SectionResolver,
) -> Result<Vec<EducationEntry>> {
    read_items(page, resolver, &SECTION, |item| EducationEntry {
        school: extract(page, item, "education.school", &[&TextAt(SCHOOL)]),
        degree: extract(page, item, "education.degree", &[&TextAt(DEGREE)]),
        field_and_date: extract(
            page,
            item,
            "education.field_and_date",
            &[&TextAt(FIELD_AND_DATE), &TextAt(FIELD_AND_DATE_ANY)],
        ),
    })
}
