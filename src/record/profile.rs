//! Typed records produced by the two harvest phases

use crate::record::{Record, RecordError};

/// One card from a people-directory search page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Profile slug, used as identity
    pub name: String,
    pub display_name: String,
    pub url: String,
    pub location: String,
    pub companies: String,
}

impl SearchResult {
    /// Column names, in the order they are written
    pub const FIELDS: [&'static str; 5] = ["name", "display_name", "url", "location", "companies"];

    pub fn into_record(self) -> Result<Record, RecordError> {
        Record::builder("name")
            .text("name", self.name)
            .text("display_name", self.display_name)
            .text("url", self.url)
            .text("location", self.location)
            .text("companies", self.companies)
            .build()
    }
}

/// Details scraped from a single profile page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDetail {
    /// Profile slug, used as identity
    pub name: String,
    pub company: String,
    pub company_profile: String,
    pub job_title: String,
    pub followers: i64,
}

impl ProfileDetail {
    pub fn into_record(self) -> Result<Record, RecordError> {
        Record::builder("name")
            .text("name", self.name)
            .text("company", self.company)
            .text("company_profile", self.company_profile)
            .text("job_title", self.job_title)
            .number("followers", self.followers)
            .build()
    }
}
