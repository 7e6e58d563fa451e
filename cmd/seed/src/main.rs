//! Seeds data that has no web surface.
//!
//! The database comes from the same settings as the server
//! (`YATUBE_DATABASE_URL`, default `sqlite:yatube.db`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;
use yt_config::Settings;
use yt_core::{ContentRepo, Group};
use yt_db_sqlite::SqliteStore;

#[derive(Debug, Parser)]
#[command(version, about = "Manage Yatube data that has no web surface")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Cmd {
    /// Create a group unless the slug is already taken
    Group {
        /// URL name: lowercase letters, digits, '-' and '_'
        #[arg(value_parser = parse_slug)]
        slug: String,
        title: String,
        description: Option<String>,
    },
    /// List every group as slug, title, description
    Groups,
}

fn parse_slug(raw: &str) -> Result<String, String> {
    let valid = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(raw.to_string())
    } else {
        Err("slug may only contain lowercase letters, digits, '-' and '_'".into())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let url = Settings::database_url().context("failed to load settings")?;
    let store = SqliteStore::new(&url)
        .await
        .with_context(|| format!("failed to open {url}"))?;

    match cli.cmd {
        Cmd::Group {
            slug,
            title,
            description,
        } => {
            if store.get_group(&slug).await?.is_some() {
                log::warn!("group {slug} already exists, leaving it alone");
                return Ok(());
            }
            let group = Group {
                id: Uuid::now_v7(),
                title,
                slug: slug.clone(),
                description: description.unwrap_or_default(),
            };
            store.create_group(group).await?;
            log::info!("created group {slug}");
        }
        Cmd::Groups => {
            for group in store.list_groups().await? {
                println!("{}\t{}\t{}", group.slug, group.title, group.description);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_url_safe() {
        assert!(parse_slug("cats").is_ok());
        assert!(parse_slug("rust-2024_news").is_ok());
        assert!(parse_slug("").is_err());
        assert!(parse_slug("Cats").is_err());
        assert!(parse_slug("a b").is_err());
        assert!(parse_slug("../etc").is_err());
    }

    #[test]
    fn group_takes_optional_description() {
        let cli = Cli::try_parse_from(["seed", "group", "cats", "Cats"]).unwrap();
        assert_eq!(
            cli.cmd,
            Cmd::Group {
                slug: "cats".into(),
                title: "Cats".into(),
                description: None,
            }
        );

        let cli = Cli::try_parse_from(["seed", "group", "cats", "Cats", "All about cats"]).unwrap();
        assert!(matches!(cli.cmd, Cmd::Group { description: Some(d), .. } if d == "All about cats"));
    }

    #[test]
    fn bad_invocations_are_refused() {
        assert!(Cli::try_parse_from(["seed"]).is_err());
        assert!(Cli::try_parse_from(["seed", "group", "Bad Slug", "Title"]).is_err());
        assert!(Cli::try_parse_from(["seed", "group", "cats"]).is_err());
        assert!(Cli::try_parse_from(["seed", "groups", "extra"]).is_err());
        assert_eq!(Cli::try_parse_from(["seed", "groups"]).unwrap().cmd, Cmd::Groups);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
