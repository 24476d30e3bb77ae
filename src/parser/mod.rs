pub mod extract;
pub mod sections;
pub mod strategy;

use crate::browser::Page;
use crate::error::ScrapeResult;
use crate::model::ProfileDetails;
use sections::SectionResolver;

/// Read the profile currently loaded in `page`: locate sections, expand
/// them, then run each field's strategies.
pub fn process_profile<P: Page>(
    page: &P,
    resolver: &SectionResolver,
    profile_url: &str,
) -> ScrapeResult<ProfileDetails> {
    extract::assemble(page, resolver, profile_url)
}
