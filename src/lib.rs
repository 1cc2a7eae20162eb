mod activity;
mod config;
mod dashboard;
mod database;
mod display;
mod error;
mod github_client;
mod github_models;
mod metrics;

pub use crate::{
    activity::{ActivityDay, ActivityTotals, MonthlyActivity, ResponseTimeWeek, SentimentDay},
    config::{AppConfig, ConfigFile, ConfigOverrides},
    dashboard::*,
    database::{share_links, Database, Profile, ProfileUpdate, ShareLinks},
    display::{print_json, print_text, Render},
    error::GitHubError,
    github_client::{
        Affiliation, CommitFilter, GitHubClient, GitHubClientImpl, ItemState, PageRequest,
    },
    github_models::*,
    metrics::{ActivityLevel, IssueStatus, Period, Priority, PullRequestStatus, TimeRange},
};

use anyhow::{bail, Error};
use core::fmt;
use std::str::FromStr;

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct RepositoryId {
    pub owner: String,
    pub name: String,
}

impl RepositoryId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        Self { owner, name }
    }

    pub fn from_partial(
        PartialRepositoryId { owner, name }: PartialRepositoryId,
        default_owner: String,
    ) -> Self {
        Self {
            owner: owner.unwrap_or(default_owner),
            name,
        }
    }

    /// Extracts the repository id out of an API url, e.g. the `repository_url` of a search hit.
    pub fn from_api_url(url: &str) -> Result<Self, Error> {
        let mut segments = url.trim_end_matches('/').rsplit('/');
        let name = segments.next().filter(|x| !x.is_empty());
        let owner = segments.next().filter(|x| !x.is_empty());
        match (owner, name) {
            (Some(owner), Some(name)) => Ok(Self::new(owner, name)),
            _ => bail!("Expecting repository API url, but was `{}`.", url),
        }
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep = s.find('/');
        let r = match sep {
            Some(x) => {
                let name = &s[x + 1..];
                let owner = &s[..x];
                if name.is_empty() || owner.is_empty() {
                    bail!("Expecting in `:owner/:name` format, but was `{}`.", s)
                }
                Self::new(owner, name)
            }
            None => {
                bail!("Expecting in `:owner/:name` format, but was `{}`.", s)
            }
        };
        Ok(r)
    }
}

impl From<&GhRepository> for RepositoryId {
    fn from(repo: &GhRepository) -> Self {
        Self::new(&repo.owner.login, &repo.name)
    }
}

#[cfg(test)]
#[test]
fn test_repository_id_display() {
    assert_eq!(RepositoryId::new("octo", "dash").to_string(), "octo/dash");
}

#[cfg(test)]
#[test]
fn test_parse_repository_id() {
    // trivial case
    assert_eq!(RepositoryId::new("octo", "dash"), "octo/dash".parse().unwrap());
    // missing owner
    assert_eq!(
        "Expecting in `:owner/:name` format, but was `dash`.",
        "dash".parse::<RepositoryId>().unwrap_err().to_string()
    );
    // missing name
    assert_eq!(
        "Expecting in `:owner/:name` format, but was `octo/`.",
        "octo/".parse::<RepositoryId>().unwrap_err().to_string()
    );
    // empty owner
    assert!("/dash".parse::<RepositoryId>().is_err());
}

#[cfg(test)]
#[test]
fn test_repository_id_from_api_url() {
    assert_eq!(
        RepositoryId::new("rust-lang", "cargo"),
        RepositoryId::from_api_url("https://api.github.com/repos/rust-lang/cargo").unwrap()
    );
    assert_eq!(
        RepositoryId::new("rust-lang", "cargo"),
        RepositoryId::from_api_url("https://api.github.com/repos/rust-lang/cargo/").unwrap()
    );
    assert!(RepositoryId::from_api_url("cargo").is_err());
}

#[derive(PartialEq, Clone, Debug)]
pub struct PartialRepositoryId {
    pub owner: Option<String>,
    pub name: String,
}

impl PartialRepositoryId {
    pub fn complete(self, default_owner: impl Into<String>) -> RepositoryId {
        RepositoryId::from_partial(self, default_owner.into())
    }
}

impl FromStr for PartialRepositoryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep = s.find('/');
        let r = match sep {
            Some(x) => {
                let name = &s[x + 1..];
                if name.is_empty() || x == 0 {
                    bail!("Expecting in `:owner?/:name` format, but was `{}`.", s)
                }
                let name = name.to_owned();
                let owner = s[..x].to_owned().into();
                Self { owner, name }
            }
            None => Self {
                owner: None,
                name: s.into(),
            },
        };
        Ok(r)
    }
}

#[cfg(test)]
#[test]
fn test_parse_partial_repository_id() {
    assert_eq!(
        PartialRepositoryId {
            owner: None,
            name: "dash".to_owned()
        },
        "dash".parse().unwrap()
    );
    assert_eq!(
        RepositoryId::new("me", "dash"),
        "dash".parse::<PartialRepositoryId>().unwrap().complete("me")
    );
    assert_eq!(
        RepositoryId::new("octo", "dash"),
        "octo/dash".parse::<PartialRepositoryId>().unwrap().complete("me")
    );
    assert_eq!(
        "Expecting in `:owner?/:name` format, but was `octo/`.",
        "octo/"
            .parse::<PartialRepositoryId>()
            .unwrap_err()
            .to_string()
    );
    assert_eq!(
        "Expecting in `:owner?/:name` format, but was `/dash`.",
        "/dash"
            .parse::<PartialRepositoryId>()
            .unwrap_err()
            .to_string()
    );
}
