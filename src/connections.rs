//! The "My Network" connections list: scroll until enough cards are
//! rendered, then read each card.

use tracing::{debug, info, warn};

use crate::browser::{Page, Region};
use crate::config::ScrapeConfig;
use crate::db::Store;
use crate::error::{ScrapeError, ScrapeResult};
use crate::model::{canonical_profile_url, ConnectionCard};
use crate::parser::strategy::{extract, AttrAt, Locator, TextAt};

pub const CONNECTIONS_URL: &str = "https://www.linkedin.com/mynetwork/invite-connect/connections/";
const ORIGIN: &str = "https://www.linkedin.com";

const CARD: &str = ".mn-connection-card";
const CARD_LINK: &[Locator] = &[Locator::Css(".mn-connection-card__link")];
const CARD_LINK_ANY: &[Locator] = &[Locator::Css("a[href*='/in/']")];
const CARD_NAME: &[Locator] = &[Locator::Css(".mn-connection-card__name")];
const CARD_OCCUPATION: &[Locator] = &[Locator::Css(".mn-connection-card__occupation")];

/// Scroll the loaded list until `max` cards are rendered, the page stops
/// growing, or the round limit is hit. Returns the number of rounds used.
pub fn scroll_until<P: Page>(page: &P, cfg: &ScrapeConfig, max: usize) -> ScrapeResult<usize> {
    let mut last_height = page.scroll_to_bottom()?;
    let mut rounds = 0;
    while rounds < cfg.max_scroll_rounds {
        let rendered = page.root()?.find_all(CARD)?.len();
        if rendered >= max {
            debug!("{} cards rendered, enough for {}", rendered, max);
            break;
        }
        page.pause(cfg.scroll_pause());
        let height = page.scroll_to_bottom()?;
        rounds += 1;
        if height == last_height {
            debug!("Page height stuck at {} after {} rounds", height, rounds);
            break;
        }
        last_height = height;
    }
    Ok(rounds)
}

fn absolute(href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", ORIGIN, href)
    } else {
        href.to_string()
    }
}

/// Read one card; `None` when it carries no profile link.
pub fn read_card<P: Page>(page: &P, card: &P::Region) -> Option<ConnectionCard> {
    let href: String = extract(
        page,
        card,
        "card.link",
        &[&AttrAt(CARD_LINK, "href"), &AttrAt(CARD_LINK_ANY, "href")],
    );
    if href.is_empty() {
        return None;
    }
    Some(ConnectionCard {
        profile_url: canonical_profile_url(&absolute(&href)),
        full_name: extract(page, card, "card.name", &[&TextAt(CARD_NAME)]),
        headline: extract(page, card, "card.occupation", &[&TextAt(CARD_OCCUPATION)]),
    })
}

/// Load the connections list and return up to `max` distinct cards in page
/// order. A list that never renders is a page-level error.
pub fn collect_cards<P: Page>(
    page: &P,
    cfg: &ScrapeConfig,
    element_timeout: std::time::Duration,
    max: usize,
) -> ScrapeResult<Vec<ConnectionCard>> {
    page.navigate(CONNECTIONS_URL)
        .map_err(|e| ScrapeError::PageLoad(format!("{}: {}", CONNECTIONS_URL, e)))?;
    if page.wait_for(CARD, element_timeout)?.is_none() {
        return Err(ScrapeError::timeout("connections list", element_timeout));
    }

    let rounds = scroll_until(page, cfg, max)?;
    let cards = page.root()?.find_all(CARD)?;
    info!("{} connection cards rendered after {} scroll rounds", cards.len(), rounds);

    let mut out: Vec<ConnectionCard> = Vec::with_capacity(max.min(cards.len()));
    for card in &cards {
        if out.len() >= max {
            break;
        }
        match read_card(page, card) {
            Some(c) if out.iter().any(|o| o.profile_url == c.profile_url) => {
                debug!("Duplicate card {}", c.profile_url);
            }
            Some(c) => out.push(c),
            None => debug!("Card without profile link skipped"),
        }
    }
    Ok(out)
}

/// Collect cards and write each one to the store. Store failures are
/// logged and do not shorten the returned list.
pub fn scrape_connections<P: Page>(
    page: &P,
    store: &Store,
    cfg: &ScrapeConfig,
    element_timeout: std::time::Duration,
    max: usize,
    session_id: Option<&str>,
) -> ScrapeResult<Vec<ConnectionCard>> {
    let cards = collect_cards(page, cfg, element_timeout, max)?;
    let mut saved = 0usize;
    for card in &cards {
        let fields = card.clone().into_fields(session_id);
        match store.upsert(&card.profile_url, &fields) {
            Ok(_) => saved += 1,
            Err(e) => warn!("Failed to save {}: {}", card.profile_url, e),
        }
    }
    if let Some(id) = session_id {
        if let Err(e) = store.bump_session(id, saved, 0) {
            warn!("Failed to update session {}: {}", id, e);
        }
    }
    info!("Saved {}/{} connections", saved, cards.len());
    Ok(cards)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::browser::fixture::FixturePage;

    fn cfg() -> ScrapeConfig {
        ScrapeConfig {
            scroll_pause_ms: 10,
            max_scroll_rounds: 5,
            ..Default::default()
        }
    }

    #[test]
    fn caps_at_max_and_canonicalizes() {
        let page = FixturePage::from_file("connections");
        let store = Store::open_in_memory().unwrap();
        let cards =
            scrape_connections(&page, &store, &cfg(), Duration::from_secs(1), 10, Some("s1")).unwrap();
        assert_eq!(cards.len(), 10);
        assert_eq!(cards[0].profile_url, "https://www.linkedin.com/in/ada-park");
        assert_eq!(cards[0].full_name, "Ada Park");
        assert_eq!(cards[0].headline, "Role 1 at Company 1");
        assert_eq!(cards[3].profile_url, "https://www.linkedin.com/in/dana-cole");

        let stored = store.fetch_all(Some("s1")).unwrap();
        assert_eq!(stored.len(), 10);
        assert_eq!(store.get_stats().unwrap().connections, 10);
    }

    #[test]
    fn rerun_does_not_duplicate() {
        let page = FixturePage::from_file("connections");
        let store = Store::open_in_memory().unwrap();
        scrape_connections(&page, &store, &cfg(), Duration::from_secs(1), 12, None).unwrap();
        scrape_connections(&page, &store, &cfg(), Duration::from_secs(1), 12, None).unwrap();
        assert_eq!(store.fetch_all(None).unwrap().len(), 12);
    }

    #[test]
    fn missing_list_is_timeout() {
        let page = FixturePage::new("<html><body><main>No connections yet</main></body></html>");
        let store = Store::open_in_memory().unwrap();
        let err = scrape_connections(&page, &store, &cfg(), Duration::from_millis(500), 10, None)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Timeout { .. }));
        assert!(page.events().contains(&"timeout:.mn-connection-card:500ms".to_string()));
    }

    #[test]
    fn scrolling_stops_when_height_stalls() {
        let page = FixturePage::new("<html><body><li class='mn-connection-card'></li></body></html>");
        page.set_scroll_heights(&[1000, 2000, 3000, 3000]);
        let rounds = scroll_until(&page, &cfg(), 50).unwrap();
        assert_eq!(rounds, 3);
    }

    #[test]
    fn scrolling_respects_round_limit() {
        let page = FixturePage::new("<html><body></body></html>");
        page.set_scroll_heights(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(scroll_until(&page, &cfg(), 50).unwrap(), 5);
    }
}
