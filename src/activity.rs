//! Date bucketing of a maintainer's activity.

use crate::github_models::{GhCommit, GhIssue, GhReview, GhReviewState};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Hours a pull request should wait for a first review.
pub const RESPONSE_TIME_TARGET_HOURS: f64 = 24.0;

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct ActivityDay {
    pub date: NaiveDate,
    pub prs_reviewed: u32,
    pub issues_triaged: u32,
    pub discussions_participated: u32,
    pub comments_made: u32,
    pub commits_made: u32,
}

impl ActivityDay {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            prs_reviewed: 0,
            issues_triaged: 0,
            discussions_participated: 0,
            comments_made: 0,
            commits_made: 0,
        }
    }
}

#[derive(Serialize, PartialEq, Eq, Clone, Default, Debug)]
pub struct ActivityTotals {
    pub prs: u32,
    pub issues: u32,
    pub discussions: u32,
    pub comments: u32,
    pub commits: u32,
}

impl ActivityTotals {
    pub fn new(days: &[ActivityDay]) -> Self {
        days.iter().fold(Self::default(), |mut acc, x| {
            acc.prs += x.prs_reviewed;
            acc.issues += x.issues_triaged;
            acc.discussions += x.discussions_participated;
            acc.comments += x.comments_made;
            acc.commits += x.commits_made;
            acc
        })
    }

    /// Reviews, issues and comments; commits are not counted as contributions.
    pub fn contributions(&self) -> u32 {
        self.prs + self.issues + self.comments
    }
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct MonthlyActivity {
    /// `YYYY-MM`
    pub month: String,
    /// Short month name, e.g. `Mar`.
    pub label: String,
    pub reviews: u32,
    pub issues: u32,
    pub discussions: u32,
    pub merges: u32,
    pub comments: u32,
}

impl MonthlyActivity {
    pub fn total_contributions(&self) -> u32 {
        self.reviews + self.issues + self.comments
    }
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct SentimentDay {
    pub date: NaiveDate,
    pub approved: u32,
    pub changes_requested: u32,
    pub commented: u32,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct ResponseTimeWeek {
    /// ISO week, e.g. `2024-W09`.
    pub week: String,
    pub avg_response_time_hours: f64,
    pub target_hours: f64,
}

/// Search results feeding the activity buckets.
#[derive(Default, Debug)]
pub struct ActivitySources<'a> {
    /// Pull requests with a review requested from the maintainer.
    pub review_requested: &'a [GhIssue],
    /// Issues the maintainer opened.
    pub authored_issues: &'a [GhIssue],
    /// Issues and pull requests the maintainer commented on.
    pub commented: &'a [GhIssue],
    pub commits: &'a [GhCommit],
}

/// Buckets activity updated at or after `since` by UTC calendar date, oldest first.
pub fn bucket_activity(sources: &ActivitySources<'_>, since: DateTime<Utc>) -> Vec<ActivityDay> {
    let mut days: BTreeMap<NaiveDate, ActivityDay> = BTreeMap::new();
    let mut bump = |t: DateTime<Utc>, f: fn(&mut ActivityDay)| {
        if t < since {
            return;
        }
        let date = t.date_naive();
        f(days.entry(date).or_insert_with(|| ActivityDay::empty(date)));
    };
    for x in sources.review_requested {
        bump(x.updated_at, |d| d.prs_reviewed += 1);
    }
    for x in sources.authored_issues {
        bump(x.updated_at, |d| d.issues_triaged += 1);
    }
    for x in sources.commented {
        bump(x.updated_at, |d| d.comments_made += 1);
    }
    for x in sources.commits {
        bump(x.commit.author.date, |d| d.commits_made += 1);
    }
    days.into_values().collect()
}

pub fn group_by_month(days: &[ActivityDay]) -> Vec<MonthlyActivity> {
    let mut months: BTreeMap<String, MonthlyActivity> = BTreeMap::new();
    for day in days {
        let key = day.date.format("%Y-%m").to_string();
        let month = months.entry(key.clone()).or_insert_with(|| MonthlyActivity {
            month: key,
            label: day.date.format("%b").to_string(),
            reviews: 0,
            issues: 0,
            discussions: 0,
            merges: 0,
            comments: 0,
        });
        month.reviews += day.prs_reviewed;
        month.issues += day.issues_triaged;
        month.discussions += day.discussions_participated;
        month.merges += day.commits_made;
        month.comments += day.comments_made;
    }
    months.into_values().collect()
}

/// Buckets the reviews `login` submitted by date.
pub fn bucket_sentiment<'a>(
    reviews: impl IntoIterator<Item = &'a GhReview>,
    login: &str,
) -> Vec<SentimentDay> {
    let mut days: BTreeMap<NaiveDate, SentimentDay> = BTreeMap::new();
    for review in reviews {
        let by_login = review.user.as_ref().map(|x| x.login == login).unwrap_or_default();
        let submitted_at = match review.submitted_at {
            Some(x) if by_login => x,
            _ => continue,
        };
        let date = submitted_at.date_naive();
        let day = days.entry(date).or_insert_with(|| SentimentDay {
            date,
            approved: 0,
            changes_requested: 0,
            commented: 0,
        });
        match review.state {
            GhReviewState::Approved => day.approved += 1,
            GhReviewState::ChangesRequested => day.changes_requested += 1,
            GhReviewState::Commented => day.commented += 1,
            GhReviewState::Dismissed | GhReviewState::Pending => {}
        }
    }
    days.into_values().collect()
}

/// Percentage of approvals among all reviews, 0 when there were none.
pub fn approval_rate(days: &[SentimentDay]) -> f64 {
    let (approved, total) = days.iter().fold((0, 0), |(a, t), x| {
        (a + x.approved, t + x.approved + x.changes_requested + x.commented)
    });
    if total == 0 {
        return 0.0;
    }
    round1(approved as f64 / total as f64 * 100.0)
}

/// Averages, per ISO week of the request, the hours between a request and its response.
pub fn bucket_response_times(
    pairs: impl IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<ResponseTimeWeek> {
    let mut weeks: BTreeMap<(i32, u32), (f64, u32)> = BTreeMap::new();
    for (requested_at, responded_at) in pairs {
        if responded_at < requested_at {
            continue;
        }
        let hours = (responded_at - requested_at).num_minutes() as f64 / 60.0;
        let week = requested_at.iso_week();
        let acc = weeks.entry((week.year(), week.week())).or_insert((0.0, 0));
        acc.0 += hours;
        acc.1 += 1;
    }
    weeks
        .into_iter()
        .map(|((year, week), (sum, n))| ResponseTimeWeek {
            week: format!("{year}-W{week:02}"),
            avg_response_time_hours: round1(sum / n as f64),
            target_hours: RESPONSE_TIME_TARGET_HOURS,
        })
        .collect()
}

/// Overall average of the weekly averages, weighted equally.
pub fn average_response_time(weeks: &[ResponseTimeWeek]) -> f64 {
    if weeks.is_empty() {
        return 0.0;
    }
    let sum: f64 = weeks.iter().map(|x| x.avg_response_time_hours).sum();
    round1(sum / weeks.len() as f64)
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
