//! Terminal rendering of dashboard results.

use crate::{
    activity::ActivityTotals,
    dashboard::*,
    database::{Profile, ShareLinks},
    github_models::{GhContributor, GhUser},
};
use anyhow::Error;
use chrono::{DateTime, TimeZone, Utc};
use console::{style, StyledObject, Term};
use serde::Serialize;
use std::{
    borrow::Cow,
    collections::BTreeMap,
    fmt,
    io::{self, Write},
};
use tabwriter::TabWriter;
use unicode_segmentation::UnicodeSegmentation;

const TITLE_LEN: usize = 50;
const DESCRIPTION_LEN: usize = 40;
const BODY_LEN: usize = 60;

/// Human readable rendition of a result.
pub trait Render {
    fn render(&self, w: &mut dyn Write) -> io::Result<()>;
}

/// A type shown as one line of a table.
trait Row {
    /// Tab separated column names.
    const HEADER: &'static str;

    fn write_row(&self, w: &mut dyn Write) -> io::Result<()>;
}

pub fn print_json<T>(x: &T) -> Result<(), Error>
where
    T: Serialize + ?Sized,
{
    let mut stdout = Term::buffered_stdout();
    serde_json::to_writer_pretty(&mut stdout, x)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

pub fn print_text<T>(x: &T) -> Result<(), Error>
where
    T: Render + ?Sized,
{
    let mut stdout = Term::buffered_stdout();
    x.render(&mut stdout)?;
    stdout.flush()?;
    Ok(())
}

pub fn ellipsize(text: &str, threshold: usize) -> Cow<'_, str> {
    debug_assert!(threshold > 2);
    let graphemes: Vec<_> = text.graphemes(true).collect();
    if graphemes.len() <= threshold {
        text.into()
    } else {
        let text: String = graphemes[..threshold - 3]
            .iter()
            .map(|&g| if g.contains('\n') { " " } else { g })
            .collect();
        let text = format!("{}...", text.trim());
        text.into()
    }
}

#[cfg(test)]
#[test]
fn test_ellipsize() {
    use quickcheck::{quickcheck, TestResult};

    fn has_max_length_threshold(text: String, threshold: usize) -> TestResult {
        if threshold < 3 {
            return TestResult::discard();
        }
        TestResult::from_bool(ellipsize(&text, threshold).graphemes(true).count() <= threshold)
    }

    quickcheck(has_max_length_threshold as fn(_, _) -> TestResult);

    fn has_ellipsis_at_the_end(text: String, threshold: usize) -> TestResult {
        if threshold < 3 {
            return TestResult::discard();
        }
        if text.graphemes(true).count() <= threshold {
            return TestResult::discard();
        }
        let ellipsized = ellipsize(&text, threshold);
        TestResult::from_bool(ellipsized.ends_with("..."))
    }

    quickcheck(has_ellipsis_at_the_end as fn(_, _) -> TestResult);
}

/// Relative time from now.
pub trait RelativeFromNow {
    fn relative_from_now(&self) -> Since;
}

impl<T> RelativeFromNow for DateTime<T>
where
    T: TimeZone,
{
    fn relative_from_now(&self) -> Since {
        let duration = Utc::now().signed_duration_since(self.clone());
        Since(duration)
    }
}

#[derive(PartialEq, Copy, Clone, Debug)]
pub struct Since(chrono::Duration);

impl fmt::Display for Since {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0.num_days();
        match days {
            _ if days < 1 => {
                let hours = self.0.num_hours();
                if hours < 1 {
                    let minutes = self.0.num_minutes();
                    if minutes < 1 {
                        write!(f, "just now")
                    } else {
                        write!(f, "{minutes} minutes ago")
                    }
                } else {
                    write!(f, "{hours} hours ago")
                }
            }
            _ if days < 2 => write!(f, "yesterday"),
            _ if days < 30 => write!(f, "{days} days ago"),
            _ if days < 365 => {
                let months = days / 30;
                if months == 1 {
                    write!(f, "{months} month ago")
                } else {
                    write!(f, "{months} months ago")
                }
            }
            _ => {
                let years = days / 365;
                if years == 1 {
                    write!(f, "{years} year ago")
                } else {
                    write!(f, "{years} years ago")
                }
            }
        }
    }
}

fn health(score: u8) -> StyledObject<u8> {
    match score {
        x if x >= 80 => style(x).green(),
        x if x >= 50 => style(x).yellow(),
        x => style(x).red(),
    }
}

fn table(w: &mut dyn Write) -> TabWriter<&mut dyn Write> {
    TabWriter::new(w).padding(2)
}

fn write_rows<T: Row>(w: &mut dyn Write, rows: &[T]) -> io::Result<()> {
    let mut tw = table(w);
    writeln!(tw, "{}", style(T::HEADER).bold())?;
    for x in rows {
        x.write_row(&mut tw)?;
    }
    tw.flush()
}

fn write_totals(w: &mut dyn Write, x: &ActivityTotals) -> io::Result<()> {
    writeln!(
        w,
        "reviews {}  issues {}  comments {}  commits {}  discussions {}",
        x.prs, x.issues, x.comments, x.commits, x.discussions
    )
}

impl<T: Row> Render for Vec<T> {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        write_rows(w, self)
    }
}

impl<T: Row> Render for Paginated<T> {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        write_rows(w, &self.data)?;
        let Pagination {
            page,
            total,
            total_pages,
            ..
        } = self.pagination;
        writeln!(w, "{}", style(format!("page {page}/{total_pages}, {total} total")).dim())
    }
}

// rows ------------------------------

impl Row for RepositorySummary {
    const HEADER: &'static str = "REPOSITORY\tDESCRIPTION\tLANGUAGE\tSTARS\tHEALTH\tACTIVITY\tUPDATED";

    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        let repo = &self.repository;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            repo.full_name,
            ellipsize(repo.description.as_deref().unwrap_or_default(), DESCRIPTION_LEN),
            repo.language.as_deref().unwrap_or_default(),
            repo.stargazers_count,
            health(self.health_score),
            self.activity_level,
            self.last_activity.relative_from_now()
        )
    }
}

impl Row for RepositoryHealth {
    const HEADER: &'static str = "REPOSITORY\tHEALTH\tISSUES\tPRS\tCOMMITS\tREVIEWS\tMERGES\tCLOSED";

    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        let x = &self.maintainer_activity;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.repository,
            health(self.health_score),
            self.open_issues,
            self.open_prs,
            self.recent_commits,
            x.reviews,
            x.merges,
            x.issues_closed
        )
    }
}

impl Row for GhContributor {
    const HEADER: &'static str = "LOGIN\tTYPE\tCONTRIBUTIONS";

    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        let login = self.login.as_deref().unwrap_or("(anonymous)");
        writeln!(w, "{}\t{}\t{}", login, self.r#type, self.contributions)
    }
}

impl Row for TriagePullRequest {
    const HEADER: &'static str = "PRIORITY\tSTATUS\tREPOSITORY\t#\tTITLE\tAUTHOR\tUPDATED";

    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}/{}\t{}\t{}\t{}\t{}",
            self.priority,
            self.status,
            self.repository.owner,
            self.repository.name,
            self.number,
            ellipsize(&self.title, TITLE_LEN),
            self.author.login,
            self.updated_at.relative_from_now()
        )
    }
}

impl Row for TriageIssue {
    const HEADER: &'static str = "PRIORITY\tSTATUS\tREPOSITORY\t#\tTITLE\tCOMMENTS\tUPDATED";

    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}/{}\t{}\t{}\t{}\t{}",
            self.priority,
            self.status,
            self.repository.owner,
            self.repository.name,
            self.number,
            ellipsize(&self.title, TITLE_LEN),
            self.comments,
            self.updated_at.relative_from_now()
        )
    }
}

impl Row for HistoryItem {
    const HEADER: &'static str = "ROLE\tSTATE\tREPOSITORY\t#\tTITLE\tUPDATED";

    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        let role = match self.your_role {
            Role::Author => "author",
            Role::Reviewer => "reviewer",
            Role::Assignee => "assignee",
        };
        let state = match self.merged_at {
            Some(_) => "merged",
            None => self.state.as_str(),
        };
        writeln!(
            w,
            "{}\t{}\t{}/{}\t{}\t{}\t{}",
            role,
            state,
            self.owner,
            self.repository,
            self.number,
            ellipsize(&self.title, TITLE_LEN),
            self.updated_at.relative_from_now()
        )
    }
}

impl Row for CommentActivity {
    const HEADER: &'static str = "REPOSITORY\t#\tON\tCOMMENT\tCREATED";

    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        let on = match self.r#type {
            CommentTarget::Issue => "issue",
            CommentTarget::PullRequest => "pull request",
        };
        writeln!(
            w,
            "{}/{}\t{}\t{}\t{}\t{}",
            self.owner,
            self.repository,
            self.item_number,
            on,
            ellipsize(self.comment.body.as_deref().unwrap_or_default(), BODY_LEN),
            self.comment.created_at.relative_from_now()
        )
    }
}

// end: rows ------------------------------

impl Render for Overview {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let s = &self.summary;
        writeln!(w, "{}", style(format!("Last {}", self.time_range)).bold())?;
        write_totals(w, &self.metrics)?;
        writeln!(
            w,
            "{} repositories, {} active, {} stars, {} forks",
            s.total_repositories, s.active_repositories, s.total_stars, s.total_forks
        )?;
        writeln!(w)?;

        let mut tw = table(w);
        writeln!(tw, "{}", style("REPOSITORY\tCOMMITS\tISSUES\tPULL REQUESTS").bold())?;
        for x in &self.recent_activity {
            writeln!(
                tw,
                "{}/{}\t{}\t{}\t{}",
                x.owner,
                x.repository,
                x.commits.len(),
                x.issues.len(),
                x.pull_requests.len()
            )?;
        }
        tw.flush()
    }
}

impl Render for DetailedAnalytics {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let cards = &self.summary_cards;
        let impact = &self.impact_metrics;
        writeln!(w, "{}", style(format!("Last {}", self.period)).bold())?;
        writeln!(
            w,
            "{} contributions, {:.1}h average first review, {:.1}% approvals",
            cards.total_contributions, cards.avg_response_time_hours, cards.approval_rate
        )?;
        writeln!(
            w,
            "{} reviews, {} pull requests merged, {} issues closed in the last 30 days",
            impact.reviews, impact.prs_merged, impact.issues_closed
        )?;
        writeln!(w)?;

        {
            let mut tw = table(w);
            writeln!(tw, "{}", style("MONTH\tREVIEWS\tISSUES\tCOMMENTS\tCOMMITS").bold())?;
            for x in &self.activity_trends {
                writeln!(
                    tw,
                    "{}\t{}\t{}\t{}\t{}",
                    x.month, x.reviews, x.issues, x.comments, x.merges
                )?;
            }
            tw.flush()?;
        }
        writeln!(w)?;

        write_rows(w, &self.repository_health)
    }
}

impl Render for RepositoryHealth {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        write_rows(w, std::slice::from_ref(self))
    }
}

impl Render for RepositoryDetails {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let repo = &self.summary.repository;
        let stats = &self.statistics;
        writeln!(w, "{}", style(&repo.full_name).bold())?;
        if let Some(x) = &repo.description {
            writeln!(w, "{x}")?;
        }
        writeln!(w, "{}", repo.html_url)?;
        writeln!(w)?;

        {
            let mut tw = table(w);
            writeln!(tw, "health\t{}", health(self.summary.health_score))?;
            writeln!(tw, "activity\t{}", self.summary.activity_level)?;
            writeln!(tw, "updated\t{}", self.summary.last_activity.relative_from_now())?;
            writeln!(tw, "stars\t{}", stats.stars)?;
            writeln!(tw, "forks\t{}", stats.forks)?;
            writeln!(tw, "watchers\t{}", stats.watchers)?;
            writeln!(tw, "contributors\t{}", stats.contributors)?;
            writeln!(tw, "open issues\t{}", stats.open_issues)?;
            writeln!(tw, "open pull requests\t{}", stats.open_prs)?;
            writeln!(tw, "your commits (30d)\t{}", self.recent_commits_count)?;
            tw.flush()?;
        }

        let recent = &self.recent_activity;
        if !recent.commits.is_empty() {
            writeln!(w)?;
            let mut tw = table(w);
            for x in &recent.commits {
                let message = x.commit.message.lines().next().unwrap_or_default();
                writeln!(
                    tw,
                    "{}\t{}\t{}",
                    x.sha.get(..7).unwrap_or(&x.sha),
                    ellipsize(message, TITLE_LEN),
                    x.commit.author.date.relative_from_now()
                )?;
            }
            tw.flush()?;
        }
        Ok(())
    }
}

/// Bytes of code per language.
impl Render for BTreeMap<String, u64> {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let total: u64 = self.values().sum();
        let mut languages: Vec<_> = self.iter().collect();
        languages.sort_by(|a, b| b.1.cmp(a.1));

        let mut tw = table(w);
        for (language, bytes) in languages {
            let share = if total == 0 {
                0.0
            } else {
                *bytes as f64 * 100.0 / total as f64
            };
            writeln!(tw, "{language}\t{bytes}\t{share:.1}%")?;
        }
        tw.flush()
    }
}

impl Render for TriageStats {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let mut tw = table(w);
        writeln!(tw, "pending reviews\t{}", self.pending_reviews)?;
        writeln!(tw, "issues needing triage\t{}", self.open_issues)?;
        writeln!(tw, "discussions needing response\t{}", self.discussions_needing_response)?;
        writeln!(tw, "priority items\t{}", style(self.priority_items).red())?;
        writeln!(tw, "this week\t{}", self.this_week_activity)?;
        tw.flush()
    }
}

impl Render for Unavailable {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}", style(self.message).yellow())
    }
}

impl Render for GhUser {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        match &self.name {
            Some(name) => writeln!(w, "{} ({})", self.login, name),
            None => writeln!(w, "{}", self.login),
        }
    }
}

impl Render for Profile {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let fields = [
            ("name", &self.name),
            ("about", &self.about),
            ("twitter", &self.twitter),
            ("linkedin", &self.linkedin),
            ("mail", &self.mail),
            ("portfolio", &self.portfolio),
        ];
        let mut tw = table(w);
        for (key, value) in fields {
            writeln!(tw, "{key}\t{}", value.as_deref().unwrap_or("-"))?;
        }
        let token = if self.has_github_token { "stored" } else { "none" };
        writeln!(tw, "token\t{token}")?;
        tw.flush()
    }
}

impl Render for MaintainerProfile {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let user = &self.user;
        self.user.render(w)?;
        if let Some(bio) = &user.bio {
            writeln!(w, "{bio}")?;
        }
        writeln!(w)?;

        {
            let mut tw = table(w);
            writeln!(tw, "followers\t{}", user.followers)?;
            writeln!(tw, "following\t{}", user.following)?;
            writeln!(tw, "public repositories\t{}", user.public_repos)?;
            writeln!(tw, "repositories\t{}", self.repositories_count)?;
            writeln!(tw, "maintained\t{}", self.maintained_repositories)?;
            writeln!(tw, "joined\t{}", user.created_at.relative_from_now())?;
            tw.flush()?;
        }

        if let Some(settings) = &self.settings {
            writeln!(w)?;
            settings.render(w)?;
        }
        Ok(())
    }
}

impl Render for ShareLinks {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}", self.share_url)?;
        writeln!(w, "{}", style(&self.qr_code_url).dim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn plain(x: &impl Render) -> String {
        console::set_colors_enabled(false);
        let mut buf = Vec::new();
        x.render(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_ellipsize_keeps_short_text() {
        assert_eq!(ellipsize("dash", 10), "dash");
        assert_eq!(ellipsize("a maintainer\ndashboard", 15), "a maintainer...");
    }

    #[test]
    fn test_relative_from_now() {
        let now = Utc::now();
        assert_eq!(now.relative_from_now().to_string(), "just now");
        assert_eq!((now - Duration::hours(5)).relative_from_now().to_string(), "5 hours ago");
        assert_eq!((now - Duration::days(1)).relative_from_now().to_string(), "yesterday");
        assert_eq!((now - Duration::days(12)).relative_from_now().to_string(), "12 days ago");
        assert_eq!((now - Duration::days(65)).relative_from_now().to_string(), "2 months ago");
        assert_eq!((now - Duration::days(400)).relative_from_now().to_string(), "1 year ago");
    }

    #[test]
    fn test_render_languages_sorted_by_share() {
        let languages: BTreeMap<String, u64> =
            [("Rust".to_owned(), 300), ("Shell".to_owned(), 100)].into_iter().collect();
        let text = plain(&languages);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Rust"));
        assert!(lines[0].ends_with("75.0%"));
        assert!(lines[1].ends_with("25.0%"));
    }

    #[test]
    fn test_render_paginated_footer() {
        let page = paginate(
            vec![GhContributor {
                login: None,
                id: None,
                avatar_url: None,
                contributions: 4,
                r#type: "Anonymous".to_owned(),
            }],
            crate::github_client::PageRequest::default(),
        );
        let text = plain(&page);
        assert!(text.starts_with("LOGIN"));
        assert!(text.contains("(anonymous)"));
        assert!(text.ends_with("page 1/1, 1 total\n"));
    }
}
