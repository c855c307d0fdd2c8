//! CRM search: derives the displayed list from a collection snapshot.
//!
//! Derivation is a pure function of `(items, filter)`: text search, then the
//! categorical filter, then a stable sort. The source slice is never touched and
//! nothing is cached between calls.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crm_core::time::sort_ts;
use crm_core::{Email, Provider, User};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub mod collate;

pub use collate::locale_cmp;

/// Age bracket selector for the users list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBracket {
    #[serde(rename = "18-25")]
    From18To25,
    #[serde(rename = "26-35")]
    From26To35,
    #[serde(rename = "36-50")]
    From36To50,
    #[serde(rename = "51+")]
    From51,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 4] =
        [AgeBracket::From18To25, AgeBracket::From26To35, AgeBracket::From36To50, AgeBracket::From51];

    /// Parse a selector value; empty or unrecognized selectors mean "no filter".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "18-25" => Some(AgeBracket::From18To25),
            "26-35" => Some(AgeBracket::From26To35),
            "36-50" => Some(AgeBracket::From36To50),
            "51+" => Some(AgeBracket::From51),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgeBracket::From18To25 => "18-25",
            AgeBracket::From26To35 => "26-35",
            AgeBracket::From36To50 => "36-50",
            AgeBracket::From51 => "51+",
        }
    }

    pub fn contains(self, age: u32) -> bool {
        match self {
            AgeBracket::From18To25 => (18..=25).contains(&age),
            AgeBracket::From26To35 => (26..=35).contains(&age),
            AgeBracket::From36To50 => (36..=50).contains(&age),
            AgeBracket::From51 => age >= 51,
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    NameAsc,
    NameDesc,
    AgeAsc,
    AgeDesc,
    Provider,
    /// Keep the filtered order as-is.
    Unsorted,
}

impl SortKey {
    /// Never fails: unknown keys leave the order untouched.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "newest" => SortKey::Newest,
            "oldest" => SortKey::Oldest,
            "name_asc" => SortKey::NameAsc,
            "name_desc" => SortKey::NameDesc,
            "age_asc" => SortKey::AgeAsc,
            "age_desc" => SortKey::AgeDesc,
            "provider" => SortKey::Provider,
            _ => SortKey::Unsorted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::NameAsc => "name_asc",
            SortKey::NameDesc => "name_desc",
            SortKey::AgeAsc => "age_asc",
            SortKey::AgeDesc => "age_desc",
            SortKey::Provider => "provider",
            SortKey::Unsorted => "none",
        }
    }
}

impl FromStr for SortKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SortKey::parse(s))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    pub search: String,
    pub age: Option<AgeBracket>,
    pub sort: SortKey,
}

impl UserFilter {
    /// Build from raw control values (search box, bracket selector, sort selector).
    pub fn from_controls(search: &str, age: &str, sort: &str) -> Self {
        Self { search: search.to_string(), age: AgeBracket::parse(age), sort: SortKey::parse(sort) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailFilter {
    pub search: String,
    pub provider: Option<Provider>,
    pub sort: SortKey,
}

impl EmailFilter {
    pub fn from_controls(search: &str, provider: &str, sort: &str) -> Self {
        let provider = provider.trim();
        Self {
            search: search.to_string(),
            provider: if provider.is_empty() { None } else { Some(Provider::from(provider)) },
            sort: SortKey::parse(sort),
        }
    }
}

/// Per-stage counts of one derivation, for `--explain` style output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeriveStats {
    pub total: usize,
    pub after_search: usize,
    pub after_category: usize,
}

pub fn derive_users<'a>(items: &'a [User], filter: &UserFilter) -> Vec<&'a User> {
    derive_users_with_stats(items, filter).0
}

pub fn derive_users_with_stats<'a>(items: &'a [User], filter: &UserFilter) -> (Vec<&'a User>, DeriveStats) {
    let started = Instant::now();
    let needle = filter.search.to_lowercase();
    let mut out: Vec<&User> = items.iter().collect();
    let total = out.len();

    if !needle.is_empty() {
        out.retain(|u| contains_ci(&u.first_name, &needle) || contains_ci(&u.last_name, &needle));
    }
    let after_search = out.len();

    if let Some(bracket) = filter.age {
        out.retain(|u| bracket.contains(u.age));
    }
    let after_category = out.len();

    out.sort_by(|a, b| compare_users(a, b, filter.sort));

    metrics::histogram!("derive_eval_ms", started.elapsed().as_secs_f64() * 1_000.0, "collection" => "users");
    trace!(total, after_search, after_category, sort = %filter.sort, "derived users view");
    (out, DeriveStats { total, after_search, after_category })
}

pub fn derive_emails<'a>(items: &'a [Email], filter: &EmailFilter) -> Vec<&'a Email> {
    derive_emails_with_stats(items, filter).0
}

pub fn derive_emails_with_stats<'a>(items: &'a [Email], filter: &EmailFilter) -> (Vec<&'a Email>, DeriveStats) {
    let started = Instant::now();
    let needle = filter.search.to_lowercase();
    let mut out: Vec<&Email> = items.iter().collect();
    let total = out.len();

    if !needle.is_empty() {
        out.retain(|e| {
            contains_ci(&e.address, &needle) || contains_ci(&e.first_name, &needle) || contains_ci(&e.last_name, &needle)
        });
    }
    let after_search = out.len();

    if let Some(provider) = filter.provider.as_ref() {
        out.retain(|e| e.provider.as_str() == provider.as_str());
    }
    let after_category = out.len();

    out.sort_by(|a, b| compare_emails(a, b, filter.sort));

    metrics::histogram!("derive_eval_ms", started.elapsed().as_secs_f64() * 1_000.0, "collection" => "emails");
    trace!(total, after_search, after_category, sort = %filter.sort, "derived emails view");
    (out, DeriveStats { total, after_search, after_category })
}

/// `needle` must already be lowercased.
fn contains_ci(hay: &str, needle: &str) -> bool {
    hay.to_lowercase().contains(needle)
}

fn compare_users(a: &User, b: &User, key: SortKey) -> Ordering {
    match key {
        SortKey::Newest => sort_ts(b.created_at.as_ref()).cmp(&sort_ts(a.created_at.as_ref())),
        SortKey::Oldest => sort_ts(a.created_at.as_ref()).cmp(&sort_ts(b.created_at.as_ref())),
        SortKey::NameAsc => locale_cmp(&a.name_key(), &b.name_key()),
        SortKey::NameDesc => locale_cmp(&b.name_key(), &a.name_key()),
        SortKey::AgeAsc => a.age.cmp(&b.age),
        SortKey::AgeDesc => b.age.cmp(&a.age),
        SortKey::Provider | SortKey::Unsorted => Ordering::Equal,
    }
}

fn compare_emails(a: &Email, b: &Email, key: SortKey) -> Ordering {
    match key {
        SortKey::Newest => sort_ts(b.created_at.as_ref()).cmp(&sort_ts(a.created_at.as_ref())),
        SortKey::Oldest => sort_ts(a.created_at.as_ref()).cmp(&sort_ts(b.created_at.as_ref())),
        SortKey::Provider => locale_cmp(a.provider.as_str(), b.provider.as_str()),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, first: &str, last: &str, age: u32) -> User {
        User { id, first_name: first.into(), last_name: last.into(), age, created_at: None }
    }

    #[test]
    fn bracket_bounds_are_inclusive() {
        assert!(AgeBracket::From18To25.contains(18));
        assert!(AgeBracket::From18To25.contains(25));
        assert!(!AgeBracket::From18To25.contains(26));
        assert!(AgeBracket::From26To35.contains(35));
        assert!(AgeBracket::From36To50.contains(36));
        assert!(AgeBracket::From36To50.contains(50));
        assert!(!AgeBracket::From51.contains(50));
        assert!(AgeBracket::From51.contains(99));
        for b in AgeBracket::ALL {
            assert!(!b.contains(17), "{b} must not contain minors");
            assert_eq!(AgeBracket::parse(b.as_str()), Some(b));
        }
    }

    #[test]
    fn unknown_selectors_are_noops() {
        assert_eq!(AgeBracket::parse(""), None);
        assert_eq!(AgeBracket::parse("60+"), None);
        assert_eq!(SortKey::parse("shoe_size"), SortKey::Unsorted);
        assert_eq!("".parse::<SortKey>(), Ok(SortKey::Unsorted));
        assert_eq!(EmailFilter::from_controls("", "  ", "provider").provider, None);
    }

    #[test]
    fn age_sort_numeric_not_lexical() {
        let users = vec![user(1, "a", "a", 9), user(2, "b", "b", 100), user(3, "c", "c", 20)];
        let f = UserFilter { sort: SortKey::AgeAsc, ..Default::default() };
        let ids: Vec<i64> = derive_users(&users, &f).iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        let f = UserFilter { sort: SortKey::AgeDesc, ..Default::default() };
        let ids: Vec<i64> = derive_users(&users, &f).iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn stats_track_each_stage() {
        let users = vec![user(1, "Ana", "García", 20), user(2, "Juan", "Pérez", 30), user(3, "Luis", "Ruiz", 22)];
        let f = UserFilter::from_controls("u", "18-25", "unknown");
        let (view, stats) = derive_users_with_stats(&users, &f);
        assert_eq!(stats, DeriveStats { total: 3, after_search: 2, after_category: 1 });
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, 3);
    }

    #[test]
    fn search_is_case_insensitive_on_non_ascii() {
        let users = vec![user(1, "ÁLVARO", "Núñez", 40)];
        let f = UserFilter { search: "álvaro".into(), sort: SortKey::Unsorted, ..Default::default() };
        assert_eq!(derive_users(&users, &f).len(), 1);
        let f = UserFilter { search: "NÚÑ".into(), sort: SortKey::Unsorted, ..Default::default() };
        assert_eq!(derive_users(&users, &f).len(), 1);
    }
}
