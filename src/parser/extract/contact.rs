//! The "Contact info" modal.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::browser::Page;
use crate::model::{ContactInfo, SocialLink};
use crate::parser::sections::{OverlaySpec, SectionResolver};
use crate::parser::strategy::{
    extract, AttrAt, AttrList, LinkList, Literal, Locator, Pattern, TextAt, TextMatch,
};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.+-]+@[\w-]+(\.[\w-]+)+").unwrap());
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?[\d\s\(\)-]{7,}\d").unwrap());

pub const OVERLAY: OverlaySpec = OverlaySpec {
    name: "Contact info",
    openers: &[
        &[Locator::WithText {
            css: "a",
            text: "Contact info",
        }],
        &[Locator::Css(
            "a[href*='overlay/contact-info/'], a[href*='overlay/contact_info/']",
        )],
        &[
            Locator::Css("button[aria-label*='More actions']"),
            Locator::WithText {
                css: "div[class*='artdeco-dropdown'] li",
                text: "Contact info",
            },
        ],
    ],
    modal: &[
        Locator::Css("div[class*='artdeco-modal']"),
        Locator::Css("[role='dialog']"),
    ],
};

const fn heading(text: &'static str) -> Locator {
    Locator::Has {
        css: "section",
        child: "h3",
        text: Some(TextMatch::Contains(text)),
    }
}

const VANITY_LINK: &[Locator] = &[Locator::Css("section[class*='ci-vanity-url'] a")];
const PROFILE_LINK: &[Locator] = &[heading("Profile"), Locator::Css("a")];
const EMAIL_LINK: &[Locator] = &[Locator::Css("section[class*='ci-email'] a")];
const EMAIL_HEADED: &[Locator] = &[heading("Email"), Locator::Css("a")];
const PHONE_SPAN: &[Locator] = &[Locator::Css("section[class*='ci-phone'] span")];
const PHONE_HEADED: &[Locator] = &[heading("Phone"), Locator::Css("span")];
const WEBSITES: &[Locator] = &[Locator::Css("section[class*='ci-websites'] a")];
const WEBSITES_HEADED: &[Locator] = &[heading("Website"), Locator::Css("a")];
const SOCIAL: &[Locator] = &[Locator::Css("section[class*='ci-connected-accounts'] a")];
const SOCIAL_HEADED: &[Locator] = &[heading("Social"), Locator::Css("a")];
const ACCOUNTS_HEADED: &[Locator] = &[heading("Accounts"), Locator::Css("a")];

/// Open the modal, read every channel, close it. An unopenable modal
/// yields the empty contact object.
pub fn extract_contact<P: Page>(
    page: &P,
    resolver: &SectionResolver,
    profile_url: &str,
) -> Result<ContactInfo> {
    let info = resolver.with_modal(page, &OVERLAY, |modal| read_modal(page, modal, profile_url))?;
    Ok(info.unwrap_or_default())
}

fn read_modal<P: Page>(page: &P, modal: &P::Region, visited: &str) -> ContactInfo {
    let visited = Literal(visited.to_string());
    let profile_url: String = extract(
        page,
        modal,
        "contact.profile_url",
        &[
            &AttrAt(VANITY_LINK, "href"),
            &AttrAt(PROFILE_LINK, "href"),
            &visited,
        ],
    );
    let email: String = extract(
        page,
        modal,
        "contact.email",
        &[&TextAt(EMAIL_LINK), &TextAt(EMAIL_HEADED), &Pattern(&EMAIL_RE)],
    );
    let phone: String = extract(
        page,
        modal,
        "contact.phone",
        &[&TextAt(PHONE_SPAN), &TextAt(PHONE_HEADED), &Pattern(&PHONE_RE)],
    );
    let websites: Vec<String> = extract(
        page,
        modal,
        "contact.websites",
        &[&AttrList(WEBSITES, "href"), &AttrList(WEBSITES_HEADED, "href")],
    );
    let social_links: Vec<SocialLink> = extract(
        page,
        modal,
        "contact.social_links",
        &[&LinkList(SOCIAL), &LinkList(SOCIAL_HEADED), &LinkList(ACCOUNTS_HEADED)],
    );
    ContactInfo {
        profile_url,
        email,
        phone,
        websites,
        social_links,
    }
}
