use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::browser::{Page, Region};
use crate::config::ScrapeConfig;
use crate::db::Store;
use crate::error::{ScrapeError, ScrapeResult};
use crate::model::{canonical_profile_url, ProfileDetails};
use crate::parser::{process_profile, sections::SectionResolver};

pub const LOGIN_URL: &str = "https://www.linkedin.com/login";

const USERNAME: &str = "#username";
const PASSWORD: &str = "#password";
const SUBMIT: &str = "button[type='submit']";
const LOGGED_IN_MARKER: &str = "#global-nav";

/// Sign in through the login form. Reaching the global nav bar is the only
/// accepted proof of success; no retries.
pub fn login<P: Page>(
    page: &P,
    store: &Store,
    email: &str,
    password: &str,
    timeout: Duration,
    session_id: Option<&str>,
) -> ScrapeResult<()> {
    page.navigate(LOGIN_URL)
        .map_err(|e| ScrapeError::PageLoad(format!("{}: {}", LOGIN_URL, e)))?;
    let username = page
        .wait_for(USERNAME, timeout)?
        .ok_or_else(|| ScrapeError::timeout("login form", timeout))?;
    username.type_text(email)?;

    let root = page.root()?;
    let password_field = root
        .find_first(PASSWORD)?
        .ok_or_else(|| ScrapeError::PageLoad("login form without password field".into()))?;
    password_field.type_text(password)?;
    let submit = root
        .find_first(SUBMIT)?
        .ok_or_else(|| ScrapeError::PageLoad("login form without submit button".into()))?;
    submit.click()?;

    let logged_in = page.wait_for(LOGGED_IN_MARKER, timeout)?.is_some();
    if let Some(id) = session_id {
        if let Err(e) = store.save_session(id, Some(email), logged_in) {
            warn!("Failed to record session {}: {}", id, e);
        }
    }
    if !logged_in {
        let at = page.current_url().unwrap_or_default();
        warn!("Login for {} stopped at {}", email, at);
        return Err(ScrapeError::AuthFailure);
    }
    info!("Logged in as {}", email);
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub profile_url: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileDetails>,
}

impl ProfileReport {
    fn failed(profile_url: String, message: String) -> Self {
        ProfileReport {
            profile_url,
            status: "error",
            message: Some(message),
            profile: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "success"
    }
}

fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    let (lo, hi) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

pub fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

/// Visit each profile in turn, assemble its details and merge them into the
/// store. One bad profile is reported and skipped; the loop never aborts.
pub fn visit_profiles<P: Page>(
    page: &P,
    store: &Store,
    cfg: &ScrapeConfig,
    urls: &[String],
    session_id: Option<&str>,
    progress: Option<&ProgressBar>,
) -> Vec<ProfileReport> {
    let resolver = SectionResolver::new(cfg.click_settle(), cfg.expand_timeout());
    let mut reports = Vec::with_capacity(urls.len());

    for (i, raw) in urls.iter().enumerate() {
        let url = canonical_profile_url(raw);
        if let Some(pb) = progress {
            pb.set_message(url.clone());
        }
        let report = visit_one(page, store, cfg, &resolver, &url);
        match &report.message {
            Some(msg) if !report.is_ok() => warn!("Profile {} failed: {}", url, msg),
            _ => info!("Saved profile {}/{}: {}", i + 1, urls.len(), url),
        }
        reports.push(report);
        if let Some(pb) = progress {
            pb.inc(1);
        }
        if i + 1 < urls.len() {
            page.pause(random_delay(cfg.between_profiles_min_ms, cfg.between_profiles_max_ms));
        }
    }

    let ok = reports.iter().filter(|r| r.is_ok()).count();
    if let Some(id) = session_id {
        if let Err(e) = store.bump_session(id, 0, ok) {
            warn!("Failed to update session {}: {}", id, e);
        }
    }
    info!("Finished {} profiles ({} ok)", reports.len(), ok);
    reports
}

fn visit_one<P: Page>(
    page: &P,
    store: &Store,
    cfg: &ScrapeConfig,
    resolver: &SectionResolver,
    url: &str,
) -> ProfileReport {
    if let Err(e) = page.navigate(url) {
        let err = ScrapeError::PageLoad(format!("{}: {}", url, e));
        return ProfileReport::failed(url.to_string(), err.to_string());
    }
    page.pause(random_delay(cfg.profile_settle_min_ms, cfg.profile_settle_max_ms));

    let details = match process_profile(page, resolver, url) {
        Ok(d) => d,
        Err(e) => return ProfileReport::failed(url.to_string(), e.to_string()),
    };
    match details.clone().into_fields() {
        Ok(fields) => {
            if let Err(e) = store.upsert(url, &fields) {
                warn!("{}", ScrapeError::Store(e));
            }
        }
        Err(e) => warn!("{}", ScrapeError::Store(e.into())),
    }
    ProfileReport {
        profile_url: url.to_string(),
        status: "success",
        message: None,
        profile: Some(details),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::browser::fixture::FixturePage;

    fn cfg() -> ScrapeConfig {
        ScrapeConfig {
            profile_settle_min_ms: 30,
            profile_settle_max_ms: 40,
            between_profiles_min_ms: 50,
            between_profiles_max_ms: 80,
            click_settle_ms: 1,
            expand_timeout_ms: 1,
            ..Default::default()
        }
    }

    fn login_page() -> FixturePage {
        FixturePage::with_states(
            r#"<html><body><form>
                 <input id="username"><input id="password" type="password">
                 <button id="sign-in" type="submit" data-goto="feed">Sign in</button>
               </form></body></html>"#,
            &[("feed", r#"<html><body><nav id="global-nav"></nav></body></html>"#)],
        )
    }

    #[test]
    fn login_types_and_submits() {
        let page = login_page();
        let store = Store::open_in_memory().unwrap();
        login(&page, &store, "me@x.io", "pw", Duration::from_millis(100), Some("s1")).unwrap();
        let events = page.events();
        assert_eq!(events[0], format!("navigate:{}", LOGIN_URL));
        assert!(events.contains(&"type:username=me@x.io".to_string()));
        assert!(events.contains(&"type:password=pw".to_string()));
        assert!(events.contains(&"click:sign-in".to_string()));
        assert!(store.get_session("s1").unwrap().unwrap().logged_in);
    }

    #[test]
    fn login_without_nav_is_auth_failure() {
        let page = FixturePage::new(
            r#"<html><body><input id="username"><input id="password">
               <button type="submit">Sign in</button></body></html>"#,
        );
        let store = Store::open_in_memory().unwrap();
        let err = login(&page, &store, "me@x.io", "bad", Duration::from_millis(100), Some("s1"))
            .unwrap_err();
        assert!(matches!(err, ScrapeError::AuthFailure));
        assert!(!store.get_session("s1").unwrap().unwrap().logged_in);
    }

    #[test]
    fn login_page_without_form_times_out() {
        let page = FixturePage::new("<html><body>checkpoint</body></html>");
        let store = Store::open_in_memory().unwrap();
        let err = login(&page, &store, "a", "b", Duration::from_millis(100), None).unwrap_err();
        assert!(matches!(err, ScrapeError::Timeout { .. }));
    }

    #[test]
    fn unreachable_profile_does_not_stop_the_loop() {
        let main = std::fs::read_to_string("tests/fixtures/profile_full.html").unwrap();
        let contact = std::fs::read_to_string("tests/fixtures/profile_full_contact.html").unwrap();
        let page = FixturePage::with_states(&main, &[("contact", &contact)]);
        let store = Store::open_in_memory().unwrap();
        store
            .upsert(
                "https://www.linkedin.com/in/jane-doe",
                &json!({"full_name": "Jane D.", "session_id": "s1"}).as_object().unwrap().clone(),
            )
            .unwrap();

        let urls = vec![
            "https://unreachable.example/in/ghost".to_string(),
            "https://www.linkedin.com/in/jane-doe/?trk=people".to_string(),
        ];
        let reports = visit_profiles(&page, &store, &cfg(), &urls, None, None);
        assert_eq!(reports.len(), 2);
        assert!(!reports[0].is_ok());
        assert!(reports[1].is_ok());

        let rec = store.get("https://www.linkedin.com/in/jane-doe").unwrap().unwrap();
        assert_eq!(rec.full_name, "Jane Doe");
        assert_eq!(rec.session_id.as_deref(), Some("s1"));
        assert_eq!(rec.experiences.len(), 3);
        assert!(rec.last_updated.is_some());
        assert!(store.get("https://unreachable.example/in/ghost").unwrap().is_none());
    }

    #[test]
    fn delays_fall_in_configured_ranges() {
        let page = FixturePage::new("<html><body><h1>x</h1></body></html>");
        let store = Store::open_in_memory().unwrap();
        let urls = vec![
            "https://www.linkedin.com/in/a".to_string(),
            "https://www.linkedin.com/in/b".to_string(),
        ];
        visit_profiles(&page, &store, &cfg(), &urls, None, None);
        let pauses: Vec<u128> = page
            .events()
            .iter()
            .filter_map(|e| e.strip_prefix("pause:")?.strip_suffix("ms")?.parse().ok())
            .collect();
        let settles: Vec<_> = pauses.iter().filter(|p| (30..=40).contains(*p)).collect();
        let between: Vec<_> = pauses.iter().filter(|p| (50..=80).contains(*p)).collect();
        assert_eq!(settles.len(), 2);
        assert_eq!(between.len(), 1);
    }
}
