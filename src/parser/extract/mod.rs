pub mod about;
pub mod contact;
pub mod education;
pub mod experience;
pub mod header;
pub mod skills;

use anyhow::Result;
use tracing::{debug, warn};

use super::sections::{SectionResolver, SectionSpec};
use super::strategy::{first_matching, Locator};
use crate::browser::Page;
use crate::error::{ScrapeError, ScrapeResult};
use crate::model::ProfileDetails;

/// Entries of a list section ("pvs" list items on current markup).
pub const LIST_ITEMS: &[Locator] = &[
    Locator::Css("li.artdeco-list__item"),
    Locator::Css("li[class*='pvs-list__item']"),
];

const SHOW_ALL: &[Locator] = &[Locator::WithText {
    css: "button",
    text: "Show all",
}];

/// Expandable list section (Experience, Education, Skills).
pub const fn list_section(name: &'static str, locators: &'static [Locator]) -> SectionSpec {
    SectionSpec {
        name,
        locators,
        expand: SHOW_ALL,
    }
}

/// Builds a [`ProfileDetails`] from the profile page currently loaded.
///
/// Fields are read in a fixed order: header, About, Contact (its modal is
/// closed again before moving on), Experience, Education, Skills. A field
/// that fails is logged and left empty; only an unreadable page is an error.
pub fn assemble<P: Page>(
    page: &P,
    resolver: &SectionResolver,
    profile_url: &str,
) -> ScrapeResult<ProfileDetails> {
    let root = page.root().map_err(ScrapeError::Browser)?;

    let full_name = header::full_name(page, &root);
    let headline = header::headline(page, &root);
    let location = header::location(page, &root);
    let about = absorb("about", || about::extract_about(page, resolver));
    let contact_info = absorb("contact_info", || {
        contact::extract_contact(page, resolver, profile_url)
    });
    let experiences = absorb("experiences", || experience::extract_experiences(page, resolver));
    let education = absorb("education", || education::extract_education(page, resolver));
    let skills = absorb("skills", || skills::extract_skills(page, resolver));

    debug!(
        "{}: {} experiences, {} education, {} skills",
        profile_url,
        experiences.len(),
        education.len(),
        skills.len()
    );

    Ok(ProfileDetails {
        full_name,
        headline,
        location,
        about,
        contact_info,
        experiences,
        education,
        skills,
    })
}

fn absorb<T: Default>(field: &str, f: impl FnOnce() -> Result<T>) -> T {
    match f() {
        Ok(v) => v,
        Err(e) => {
            warn!("{} left empty: {}", field, e);
            T::default()
        }
    }
}

/// Read every item of a list section with `read`. Items are kept even when
/// every sub-field comes back empty.
pub fn read_items<P: Page, T>(
    page: &P,
    resolver: &SectionResolver,
    spec: &SectionSpec,
    read: impl Fn(&P::Region) -> T,
) -> Result<Vec<T>> {
    let items = resolver.with_section(page, spec, |section| -> Result<Vec<T>> {
        Ok(first_matching(section, LIST_ITEMS)?.iter().map(&read).collect())
    })?;
    match items {
        Some(found) => found,
        None => Ok(Vec::new()),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::browser::fixture::FixturePage;

    fn resolver() -> SectionResolver {
        SectionResolver::new(Duration::from_millis(10), Duration::from_millis(20))
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn full_profile() -> FixturePage {
        FixturePage::with_states(
            &fixture("profile_full"),
            &[("contact", &fixture("profile_full_contact"))],
        )
    }

    #[test]
    fn full_profile_every_field() {
        let page = full_profile();
        let p = assemble(&page, &resolver(), "https://www.linkedin.com/in/jane-doe").unwrap();
        assert_eq!(p.full_name, "Jane Doe");
        assert_eq!(p.headline, "Staff Engineer at Parcel");
        assert_eq!(p.location, "Berlin, Germany");
        assert!(p.about.starts_with("I build delivery systems"));
        assert_eq!(p.contact_info.email, "jane@example.com");
        assert_eq!(p.contact_info.phone, "+49 30 1234567");
        assert_eq!(p.contact_info.websites, vec!["https://jane.dev"]);
        assert_eq!(p.contact_info.social_links.len(), 1);
        assert_eq!(p.contact_info.social_links[0].name, "GitHub");
        assert_eq!(p.contact_info.profile_url, "https://www.linkedin.com/in/jane-doe");
        assert_eq!(p.education.len(), 2);
        assert_eq!(p.education[0].school, "TU Berlin");
        assert_eq!(p.skills, vec!["Rust", "Distributed Systems", "SQL"]);
    }

    #[test]
    fn experience_item_without_dates_is_kept() {
        let page = full_profile();
        let p = assemble(&page, &resolver(), "https://www.linkedin.com/in/jane-doe").unwrap();
        assert_eq!(p.experiences.len(), 3);
        assert_eq!(p.experiences[0].company, "Parcel");
        assert_eq!(p.experiences[0].date_range, "Jan 2021 - Present · 3 yrs");
        assert_eq!(p.experiences[1].title, "Senior Engineer");
        assert_eq!(p.experiences[1].date_range, "");
        assert_eq!(p.experiences[2].description, "");
    }

    #[test]
    fn contact_modal_closed_before_experience() {
        let page = full_profile();
        assemble(&page, &resolver(), "https://www.linkedin.com/in/jane-doe").unwrap();
        let events = page.events();
        let pos = |needle: &str| events.iter().position(|e| e == needle).unwrap();
        let opened = pos("click:contact-info-link");
        let dismissed = pos("click:contact-dismiss");
        let experience = pos("click:experience-show-all");
        assert!(opened < dismissed && dismissed < experience);
        assert_eq!(page.current_state(), "main");
    }

    #[test]
    fn sparse_profile_gets_empty_values() {
        let page = FixturePage::from_file("profile_sparse");
        let p = assemble(&page, &resolver(), "https://www.linkedin.com/in/sam-lee").unwrap();
        assert_eq!(p.full_name, "Sam Lee");
        assert_eq!(p.headline, "");
        assert_eq!(p.location, "");
        assert_eq!(p.about, "");
        assert!(p.experiences.is_empty());
        assert!(p.education.is_empty());
        assert!(p.skills.is_empty());
        assert_eq!(p.contact_info, Default::default());
    }

    #[test]
    fn broken_toggle_still_reads_section() {
        let page = FixturePage::new(
            r#"<html><body><section>
                 <div class="pvs-header__container"><h2>Skills</h2></div>
                 <ul><li class="pvs-list__item"><span class="hoverable-link-text">Go</span></li></ul>
                 <button data-broken="1">Show all 9 skills</button>
               </section></body></html>"#,
        );
        let p = assemble(&page, &resolver(), "u").unwrap();
        assert_eq!(p.skills, vec!["Go"]);
    }
}
