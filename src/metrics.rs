//! Static classification rules over single API responses.

use crate::github_models::{GhIssue, GhLabel, GhPullRequest};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

// types ------------------------------

#[derive(Serialize, Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Serialize, Debug, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    High,
    Medium,
    Low,
}

#[derive(Serialize, Debug, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum PullRequestStatus {
    Draft,
    NeedsReview,
    InDiscussion,
}

#[derive(Serialize, Debug, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    Assigned,
    Labeled,
    NeedsTriage,
    Open,
}

/// Look-back window of the overview.
#[derive(Serialize, Debug, PartialEq, Eq, Copy, Clone)]
pub enum TimeRange {
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

/// Look-back window of the detailed analytics.
#[derive(Serialize, Debug, PartialEq, Eq, Copy, Clone)]
pub enum Period {
    #[serde(rename = "1month")]
    OneMonth,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "1year")]
    OneYear,
}

// end: types ------------------------------

const HEALTH_SCORE_MAX: u8 = 100;

/// Whole days elapsed since `t`.
pub fn days_since(t: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(t).num_days()
}

/// Scores a repository from 0 to 100, deducting for backlog and staleness.
pub fn health_score(
    open_issues: usize,
    open_pull_requests: usize,
    days_since_update: i64,
    recent_commits: usize,
) -> u8 {
    let mut score = HEALTH_SCORE_MAX as i32;
    if open_issues > 50 {
        score -= 20;
    }
    if open_pull_requests > 20 {
        score -= 15;
    }
    if days_since_update > 30 {
        score -= 30;
    }
    if recent_commits == 0 {
        score -= 25;
    }
    score.max(0) as u8
}

pub fn activity_level(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> ActivityLevel {
    match days_since(updated_at, now) {
        x if x <= 7 => ActivityLevel::High,
        x if x <= 30 => ActivityLevel::Medium,
        _ => ActivityLevel::Low,
    }
}

fn has_any_label(labels: &[GhLabel], names: &[&str]) -> bool {
    labels
        .iter()
        .map(|x| x.name.to_lowercase())
        .any(|x| names.contains(&x.as_str()))
}

pub fn priority(labels: &[GhLabel]) -> Priority {
    if has_any_label(labels, &["critical", "urgent", "p0"]) {
        Priority::Critical
    } else if has_any_label(labels, &["high", "important", "p1", "bug"]) {
        Priority::High
    } else if has_any_label(labels, &["low", "minor", "p3", "documentation"]) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

/// Whether the item counts toward the triage queue's priority items.
pub fn is_priority_item(labels: &[GhLabel]) -> bool {
    has_any_label(labels, &["critical", "urgent", "high priority", "bug"])
}

pub fn pull_request_status(pr: &GhPullRequest) -> PullRequestStatus {
    if pr.draft {
        PullRequestStatus::Draft
    } else if !pr.requested_reviewers.is_empty() {
        PullRequestStatus::NeedsReview
    } else if pr.comments > 0 || pr.review_comments > 0 {
        PullRequestStatus::InDiscussion
    } else {
        PullRequestStatus::NeedsReview
    }
}

pub fn issue_status(issue: &GhIssue, now: DateTime<Utc>) -> IssueStatus {
    if !issue.assignees.is_empty() {
        IssueStatus::Assigned
    } else if !issue.labels.is_empty() {
        IssueStatus::Labeled
    } else if days_since(issue.created_at, now) <= 3 {
        IssueStatus::NeedsTriage
    } else {
        IssueStatus::Open
    }
}

/// Created within the last week and nobody assigned yet.
pub fn needs_triage(issue: &GhIssue, now: DateTime<Utc>) -> bool {
    days_since(issue.created_at, now) <= 7 && issue.assignees.is_empty()
}

// TimeRange impls ------------------------------

impl TimeRange {
    pub fn days(self) -> i64 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
        }
    }

    pub fn since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::Month
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

impl FromStr for TimeRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let x = match s {
            "1d" => Self::Day,
            "7d" => Self::Week,
            // anything else falls back to a month
            _ => Self::Month,
        };
        Ok(x)
    }
}

// end: TimeRange impls ------------------------------

// Period impls ------------------------------

impl Period {
    pub fn months(self) -> i64 {
        match self {
            Self::OneMonth => 1,
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::OneYear => 12,
        }
    }

    /// Months are counted as 30 days.
    pub fn since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.months() * 30)
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::SixMonths
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OneMonth => "1month",
            Self::ThreeMonths => "3months",
            Self::SixMonths => "6months",
            Self::OneYear => "1year",
        };
        f.write_str(s)
    }
}

impl FromStr for Period {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let x = match s {
            "1month" => Self::OneMonth,
            "3months" => Self::ThreeMonths,
            "1year" => Self::OneYear,
            _ => Self::SixMonths,
        };
        Ok(x)
    }
}

// end: Period impls ------------------------------

// Priority impls ------------------------------

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Priority::*;
        let s = match self {
            Low => "low",
            Medium => "medium",
            High => "high",
            Critical => "critical",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Priority::*;
        let x = match s {
            "low" => Low,
            "medium" => Medium,
            "high" => High,
            "critical" => Critical,
            _ => return Err(ParseError(format!("unexpected priority, was `{}`", s))),
        };
        Ok(x)
    }
}

// end: Priority impls ------------------------------

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.write_str(s)
    }
}

impl fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::NeedsReview => "needs-review",
            Self::InDiscussion => "in-discussion",
        };
        f.write_str(s)
    }
}

impl FromStr for PullRequestStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let x = match s {
            "draft" => Self::Draft,
            "needs-review" => Self::NeedsReview,
            "in-discussion" => Self::InDiscussion,
            _ => return Err(ParseError(format!("unexpected pull request status, was `{}`", s))),
        };
        Ok(x)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Assigned => "assigned",
            Self::Labeled => "labeled",
            Self::NeedsTriage => "needs-triage",
            Self::Open => "open",
        };
        f.write_str(s)
    }
}

impl FromStr for IssueStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let x = match s {
            "assigned" => Self::Assigned,
            "labeled" => Self::Labeled,
            "needs-triage" => Self::NeedsTriage,
            "open" => Self::Open,
            _ => return Err(ParseError(format!("unexpected issue status, was `{}`", s))),
        };
        Ok(x)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseError(String /* message */);
