use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// One persisted connection. Every field has a canonical empty value so a
/// record read back from the store always has the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionRecord {
    pub profile_url: String,
    pub full_name: String,
    pub headline: String,
    pub location: String,
    pub about: String,
    pub contact_info: ContactInfo,
    pub experiences: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_date: Option<DateTime<Utc>>,
    /// Absent until the record is merged into a second time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub profile_url: String,
    pub email: String,
    pub phone: String,
    pub websites: Vec<String>,
    pub social_links: Vec<SocialLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub date_range: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub school: String,
    pub degree: String,
    pub field_and_date: String,
}

/// Minimal data read off a connection card on the list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionCard {
    pub profile_url: String,
    pub full_name: String,
    pub headline: String,
}

/// Everything read from one visit to a profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileDetails {
    pub full_name: String,
    pub headline: String,
    pub location: String,
    pub about: String,
    pub contact_info: ContactInfo,
    pub experiences: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<String>,
}

impl ConnectionCard {
    pub fn into_fields(self, session_id: Option<&str>) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("full_name".into(), Value::String(self.full_name));
        fields.insert("headline".into(), Value::String(self.headline));
        if let Some(id) = session_id {
            fields.insert("session_id".into(), Value::String(id.to_string()));
        }
        fields
    }
}

impl ProfileDetails {
    /// Fields to merge into the stored record.
    ///
    /// `full_name` and `headline` are left out when blank: the card pass
    /// already wrote them and a failed re-read must not erase them. Every
    /// other field is written, empty or not.
    pub fn into_fields(self) -> serde_json::Result<Map<String, Value>> {
        let mut fields = Map::new();
        if !self.full_name.is_empty() {
            fields.insert("full_name".into(), Value::String(self.full_name));
        }
        if !self.headline.is_empty() {
            fields.insert("headline".into(), Value::String(self.headline));
        }
        fields.insert("location".into(), Value::String(self.location));
        fields.insert("about".into(), Value::String(self.about));
        fields.insert("contact_info".into(), serde_json::to_value(self.contact_info)?);
        fields.insert("experiences".into(), serde_json::to_value(self.experiences)?);
        fields.insert("education".into(), serde_json::to_value(self.education)?);
        fields.insert("skills".into(), serde_json::to_value(self.skills)?);
        Ok(fields)
    }
}

/// Canonical profile identifier: scheme + host + path, no query or fragment,
/// no trailing slash. Unparseable input falls back to cutting at `?`/`#`.
pub fn canonical_profile_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or("")
            .trim_end_matches('/')
            .to_string(),
    }
}

// ── Tests ──
