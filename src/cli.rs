use clap::{Args, Parser, Subcommand};
use mdash::{
    Affiliation, IssueStatus, ItemState, PartialRepositoryId, Period, Priority, PullRequestStatus,
    TimeRange,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    /// Print JSON instead of tables.
    #[clap(long, global = true)]
    pub json: bool,

    /// Config file, defaults to `<config dir>/mdash/config.toml`.
    #[clap(long, global = true, env = "MDASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// GitHub login, overrides the config file.
    #[clap(long, global = true, env = "MDASH_USERNAME")]
    pub username: Option<String>,

    /// GitHub personal access token, overrides the config file.
    #[clap(long, global = true, env = "MDASH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[clap(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print activity metrics and recent activity.
    Overview {
        /// Look-back window, one of `1d`, `7d`, `30d`.
        #[clap(long, default_value = "30d")]
        range: TimeRange,
    },
    /// Print activity trends, review sentiment and repository health.
    Analytics {
        /// Look-back window, one of `1month`, `3months`, `6months`, `1year`.
        #[clap(long, default_value = "6months")]
        period: Period,
    },
    /// Repository related operations.
    Repos {
        #[clap(subcommand)]
        cmd: self::repos::Command,
    },
    /// Issues and pull requests waiting on the maintainer.
    Triage {
        #[clap(subcommand)]
        cmd: self::triage::Command,
    },
    /// Past involvement of the maintainer.
    History {
        #[clap(subcommand)]
        cmd: self::history::Command,
    },
    /// Maintainer profile.
    Profile {
        #[clap(subcommand)]
        cmd: self::profile::Command,
    },
    /// Stored profile settings and token.
    Settings {
        #[clap(subcommand)]
        cmd: self::settings::Command,
    },
    /// Print the 30 days activity report as JSON.
    Report,
    /// Print the authenticated user.
    Whoami,
}

#[derive(Args, Debug)]
pub struct Paging {
    /// Page number, starting from 1.
    #[clap(long, default_value_t = 1)]
    pub page: u32,

    /// Items per page.
    #[clap(long, default_value_t = 20)]
    pub per_page: u32,
}

pub mod repos {
    use super::*;

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Print list of repositories.
        Ls {
            /// Only repositories whose name or description contains this.
            #[clap(long)]
            search: Option<String>,

            /// Only repositories in this language.
            #[clap(long)]
            language: Option<String>,

            /// One of `all`, `owner`, `member`.
            #[clap(long, default_value = "all")]
            affiliation: Affiliation,
        },
        /// Print repository details.
        Show {
            /// Repository identifier.
            repo: PartialRepositoryId,
        },
        /// Print repository health.
        Health {
            /// Repository identifier.
            repo: PartialRepositoryId,
        },
        /// Print repository contributors.
        Contributors {
            /// Repository identifier.
            repo: PartialRepositoryId,
        },
        /// Print repository languages.
        Languages {
            /// Repository identifier.
            repo: PartialRepositoryId,
        },
    }
}

pub mod triage {
    use super::*;

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Print triage counters.
        Stats,
        /// Print open pull requests by others.
        Prs {
            /// Repository name.
            #[clap(long)]
            repo: Option<String>,

            /// One of `draft`, `needs-review`, `in-discussion`.
            #[clap(long)]
            status: Option<PullRequestStatus>,

            /// One of `low`, `medium`, `high`, `critical`.
            #[clap(long)]
            priority: Option<Priority>,

            #[clap(flatten)]
            paging: Paging,
        },
        /// Print open issues.
        Issues {
            /// Repository name.
            #[clap(long)]
            repo: Option<String>,

            /// One of `assigned`, `labeled`, `needs-triage`, `open`.
            #[clap(long)]
            status: Option<IssueStatus>,

            /// One of `low`, `medium`, `high`, `critical`.
            #[clap(long)]
            priority: Option<Priority>,

            #[clap(flatten)]
            paging: Paging,
        },
        /// Print discussions.
        Discussions,
    }
}

pub mod history {
    use super::*;

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Print reviewed and authored pull requests.
        Prs {
            /// One of `open`, `closed`, `all`.
            #[clap(long, default_value = "all")]
            state: ItemState,

            #[clap(flatten)]
            paging: Paging,
        },
        /// Print authored and assigned issues.
        Issues {
            /// One of `open`, `closed`, `all`.
            #[clap(long, default_value = "all")]
            state: ItemState,

            #[clap(flatten)]
            paging: Paging,
        },
        /// Print recent comments.
        Comments {
            #[clap(flatten)]
            paging: Paging,
        },
        /// Print discussions.
        Discussions,
    }
}

pub mod profile {
    use super::*;

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Print GitHub profile and stored settings.
        Show,
        /// Print shareable profile links.
        Share,
    }
}

pub mod settings {
    use super::*;

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Print stored profile settings.
        Show,
        /// Update stored profile settings. Empty values keep the stored ones.
        Set {
            #[clap(long)]
            name: Option<String>,
            #[clap(long)]
            about: Option<String>,
            #[clap(long)]
            twitter: Option<String>,
            #[clap(long)]
            linkedin: Option<String>,
            #[clap(long)]
            mail: Option<String>,
            #[clap(long)]
            portfolio: Option<String>,
        },
        /// Prompt for a GitHub token, validate it and store it.
        TokenSet,
        /// Forget the stored GitHub token.
        TokenClear {
            /// Skip confirmation.
            #[clap(long, short)]
            yes: bool,
        },
    }
}

pub fn cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_triage_prs() {
        let cli = Cli::try_parse_from([
            "mdash",
            "triage",
            "prs",
            "--status",
            "needs-review",
            "--priority",
            "high",
            "--page",
            "2",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.cmd {
            Command::Triage {
                cmd:
                    triage::Command::Prs {
                        status,
                        priority,
                        paging,
                        ..
                    },
            } => {
                assert_eq!(status, Some(PullRequestStatus::NeedsReview));
                assert_eq!(priority, Some(Priority::High));
                assert_eq!(paging.page, 2);
                assert_eq!(paging.per_page, 20);
            }
            cmd => panic!("unexpected command {cmd:?}"),
        }
    }
}
