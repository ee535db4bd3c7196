//! Extraction rules
//!
//! This module turns fetched documents into records:
//! - [`SearchCardExtractor`] reads people-directory search cards
//! - [`ProfileExtractor`] reads the JSON-LD `Person` block of a profile page
//!
//! Extraction runs to completion before any record is offered to the
//! pipeline, so a failed attempt never leaves partial admissions behind.

use crate::harvester::fetcher::Document;
use crate::harvester::task::WorkItem;
use crate::record::{ProfileDetail, Record, RecordError, SearchResult};
use crate::url::{profile_slug, resolve_profile_link};
use scraper::{ElementRef, Selector};
use serde_json::{Map, Value};
use thiserror::Error;

/// Placeholder for optional values that are absent on the page
const NOT_AVAILABLE: &str = "n/a";

/// Errors that can occur during extraction; all of them are retryable
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Missing element '{selector}' on {url}")]
    MissingElement { selector: String, url: String },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Invalid record: {0}")]
    Record(#[from] RecordError),
}

/// Extraction rules for one kind of page
pub trait Extractor: Send + Sync {
    fn extract(&self, item: &WorkItem, document: &Document) -> Result<Vec<Record>, ExtractError>;
}

impl<F> Extractor for F
where
    F: Fn(&WorkItem, &Document) -> Result<Vec<Record>, ExtractError> + Send + Sync,
{
    fn extract(&self, item: &WorkItem, document: &Document) -> Result<Vec<Record>, ExtractError> {
        self(item, document)
    }
}

fn selector(css: &str, url: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Parse {
        url: url.to_string(),
        message: format!("invalid selector '{}': {:?}", css, e),
    })
}

/// Visible text of an element with runs of whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts every card from a people-directory search page
///
/// # Card Layout
///
/// - `div.base-search-card__info` is the card
/// - its parent `<a href>` links to the profile
/// - `h3.base-search-card__title` holds the display name
/// - `p.people-search-card__location` holds the location
/// - `span.entity-list-meta__entities-list` holds companies (optional)
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchCardExtractor;

impl Extractor for SearchCardExtractor {
    fn extract(&self, _item: &WorkItem, document: &Document) -> Result<Vec<Record>, ExtractError> {
        let url = document.url.as_str();
        let html = document.html();

        let card_selector = selector("div.base-search-card__info", url)?;
        let title_selector = selector("h3.base-search-card__title", url)?;
        let location_selector = selector("p.people-search-card__location", url)?;
        let companies_selector = selector("span.entity-list-meta__entities-list", url)?;

        let missing = |selector: &str| ExtractError::MissingElement {
            selector: selector.to_string(),
            url: url.to_string(),
        };

        let mut records = Vec::new();
        for card in html.select(&card_selector) {
            let href = card
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|parent| parent.value().attr("href"))
                .ok_or_else(|| missing("a[href] > div.base-search-card__info"))?;
            let profile_url =
                resolve_profile_link(href, url).ok_or_else(|| ExtractError::Parse {
                    url: url.to_string(),
                    message: format!("invalid profile link '{}'", href),
                })?;
            let name = profile_slug(&profile_url).ok_or_else(|| ExtractError::Parse {
                url: url.to_string(),
                message: format!("no profile name in '{}'", profile_url),
            })?;

            let display_name = card
                .select(&title_selector)
                .next()
                .map(element_text)
                .ok_or_else(|| missing("h3.base-search-card__title"))?;
            let location = card
                .select(&location_selector)
                .next()
                .map(element_text)
                .ok_or_else(|| missing("p.people-search-card__location"))?;
            let companies = card
                .select(&companies_selector)
                .next()
                .map(element_text)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());

            let result = SearchResult {
                name,
                display_name,
                url: profile_url,
                location,
                companies,
            };
            records.push(result.into_record()?);
        }

        Ok(records)
    }
}

/// Extracts the profile details from a profile page's JSON-LD block
///
/// The work item's key is used as the record's name so detail rows join
/// back to search rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileExtractor;

impl Extractor for ProfileExtractor {
    fn extract(&self, item: &WorkItem, document: &Document) -> Result<Vec<Record>, ExtractError> {
        let url = document.url.as_str();
        let html = document.html();

        let script_selector = selector("head script[type='application/ld+json']", url)?;
        let script = html
            .select(&script_selector)
            .next()
            .ok_or_else(|| ExtractError::MissingElement {
                selector: "script[type='application/ld+json']".to_string(),
                url: url.to_string(),
            })?;
        let raw = script.text().collect::<String>();

        let json: Value = serde_json::from_str(&raw).map_err(|e| ExtractError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let graph = json
            .get("@graph")
            .and_then(Value::as_array)
            .ok_or_else(|| ExtractError::Parse {
                url: url.to_string(),
                message: "JSON-LD has no @graph array".to_string(),
            })?;

        let empty = Map::new();
        let person = graph
            .iter()
            .filter_map(Value::as_object)
            .find(|node| node.get("@type").and_then(Value::as_str) == Some("Person"))
            .unwrap_or(&empty);

        let detail = ProfileDetail {
            name: item.key.clone(),
            company: works_for(person, "name"),
            company_profile: works_for(person, "url"),
            job_title: job_title(person),
            followers: followers(person),
        };

        Ok(vec![detail.into_record()?])
    }
}

fn job_title(person: &Map<String, Value>) -> String {
    match person.get("jobTitle") {
        Some(Value::Array(titles)) => titles.first().and_then(Value::as_str),
        Some(Value::String(title)) => Some(title.as_str()),
        _ => None,
    }
    .unwrap_or(NOT_AVAILABLE)
    .to_string()
}

fn works_for(person: &Map<String, Value>, field: &str) -> String {
    person
        .get("worksFor")
        .and_then(Value::as_array)
        .and_then(|orgs| orgs.first())
        .and_then(|org| org.get(field))
        .and_then(Value::as_str)
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn followers(person: &Map<String, Value>) -> i64 {
    let counters: Vec<&Value> = match person.get("interactionStatistic") {
        Some(Value::Array(stats)) => stats.iter().collect(),
        Some(stat @ Value::Object(_)) => vec![stat],
        _ => Vec::new(),
    };

    counters
        .into_iter()
        .find(|stat| {
            stat.get("name").and_then(Value::as_str) == Some("Follows")
                && stat.get("@type").and_then(Value::as_str) == Some("InteractionCounter")
        })
        .and_then(|stat| stat.get("userInteractionCount"))
        .and_then(|count| match count {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}
