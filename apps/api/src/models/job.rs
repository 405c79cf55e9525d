use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// External job-listing sites we know how to harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linkedin,
    Glassdoor,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Linkedin, Platform::Glassdoor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linkedin => "linkedin",
            Platform::Glassdoor => "glassdoor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "linkedin" => Some(Platform::Linkedin),
            "glassdoor" => Some(Platform::Glassdoor),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work arrangement of a posting as we know it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmploymentMode {
    Remote,
    Onsite,
    Hybrid,
    #[default]
    Unspecified,
}

impl EmploymentMode {
    /// Column value; unspecified is stored as NULL.
    pub fn as_column(&self) -> Option<&'static str> {
        match self {
            EmploymentMode::Remote => Some("remote"),
            EmploymentMode::Onsite => Some("onsite"),
            EmploymentMode::Hybrid => Some("hybrid"),
            EmploymentMode::Unspecified => None,
        }
    }
}

/// Employment-mode filter on a search request. `All` means no filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmploymentFilter {
    #[default]
    All,
    Remote,
    Onsite,
    Hybrid,
}

impl EmploymentFilter {
    /// The mode stamped on candidates harvested under this filter.
    pub fn implied_mode(&self) -> EmploymentMode {
        match self {
            EmploymentFilter::All => EmploymentMode::Unspecified,
            EmploymentFilter::Remote => EmploymentMode::Remote,
            EmploymentFilter::Onsite => EmploymentMode::Onsite,
            EmploymentFilter::Hybrid => EmploymentMode::Hybrid,
        }
    }
}

/// A stored job posting. `url` is the canonical URL and is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub salary_range: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub platform: String,
    pub posted_date: Option<String>,
    pub created_at: DateTime<Utc>,
}
