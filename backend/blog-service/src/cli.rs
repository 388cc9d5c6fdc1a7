//! Command-line interface handling
//!
//! Operator commands stand in for an admin console. Each command runs against
//! the configured storage backend and exits; without a command the HTTP server
//! starts.

use crate::auth::SessionKeys;
use crate::config::Config;
use crate::db::{self, BlogRepository};
use crate::forms::{validate_username, GroupForm};
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};

const USAGE: &str = "usage: blog-service [healthcheck | create-user <username> | \
create-group <slug> <title> [description] | issue-token <username> | \
delete-post <id> | delete-group <slug> | attach-image <post_id> <file>]";

/// Handle CLI commands
///
/// Returns true if a command was processed (program should exit).
/// Returns false if no CLI command was found (normal startup).
pub async fn handle_cli_commands(config: &Config) -> Result<bool> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    run_command(config, &args).await
}

/// Dispatch an argument list (without the binary name).
pub async fn run_command(config: &Config, args: &[String]) -> Result<bool> {
    let Some(command) = args.first() else {
        return Ok(false);
    };
    let rest = &args[1..];

    match command.as_str() {
        "healthcheck" => {
            handle_healthcheck(config).await?;
            return Ok(true);
        }
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            return Ok(true);
        }
        "create-user" | "create-group" | "issue-token" | "delete-post" | "delete-group"
        | "attach-image" => {}
        _ => return Ok(false),
    }

    let repo = db::connect(&config.database).await?;
    let output = execute(config, repo.as_ref(), command, rest).await?;
    println!("{}", output);
    Ok(true)
}

/// Run one repository-backed command and return what it prints.
pub async fn execute(
    config: &Config,
    repo: &dyn BlogRepository,
    command: &str,
    args: &[String],
) -> Result<String> {
    match (command, args) {
        ("create-user", [username]) => {
            let username = validate_username(username).map_err(|e| anyhow!("{}", e))?;
            let user = repo.create_user(&username).await?;
            tracing::info!(user_id = user.id, username = %user.username, "user created");
            Ok(format!("created user {} (id {})", user, user.id))
        }
        ("create-group", [slug, title, description @ ..]) if description.len() <= 1 => {
            let form = GroupForm {
                title: Some(title.clone()),
                slug: Some(slug.clone()),
                description: Some(
                    description
                        .first()
                        .cloned()
                        .unwrap_or_else(|| title.clone()),
                ),
            };
            let input = form.validate().map_err(|e| anyhow!("{}", e))?;
            let group = repo.create_group(&input).await?;
            tracing::info!(group_id = group.id, slug = %group.slug, "group created");
            Ok(format!("created group {} (/group/{}/)", group, group.slug))
        }
        ("issue-token", [username]) => {
            let user = repo
                .find_user_by_username(username)
                .await?
                .ok_or_else(|| anyhow!("no user named {}", username))?;
            SessionKeys::from_config(&config.auth).issue(&user)
        }
        ("delete-post", [id]) => {
            let post_id = parse_id(id)?;
            let post = repo
                .find_post(post_id)
                .await?
                .ok_or_else(|| anyhow!("no post with id {}", post_id))?;
            repo.delete_post(post_id).await?;
            tracing::info!(post_id, "post deleted");
            Ok(format!("deleted post {} ({})", post_id, post.label()))
        }
        ("delete-group", [slug]) => {
            let group = repo
                .find_group_by_slug(slug)
                .await?
                .ok_or_else(|| anyhow!("no group with slug {}", slug))?;
            repo.delete_group(group.id).await?;
            tracing::info!(group_id = group.id, "group deleted");
            Ok(format!("deleted group {}", group))
        }
        ("attach-image", [id, file]) => {
            let post_id = parse_id(id)?;
            if repo.find_post(post_id).await?.is_none() {
                bail!("no post with id {}", post_id);
            }
            let stored = store_image(&config.media.root, post_id, Path::new(file)).await?;
            repo.set_post_image(post_id, Some(&stored)).await?;
            tracing::info!(post_id, image = %stored, "image attached");
            Ok(format!("{}{}", config.media.url, stored))
        }
        _ => bail!("{}", USAGE),
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .with_context(|| format!("invalid id: {}", raw))
}

/// Copy `source` under `<media_root>/posts/` and return the path relative to
/// the media root.
async fn store_image(media_root: &str, post_id: i64, source: &Path) -> Result<String> {
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("not a file: {}", source.display()))?;

    let relative = format!("posts/{}_{}", post_id, file_name);
    let target: PathBuf = Path::new(media_root).join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::copy(source, &target)
        .await
        .with_context(|| format!("copying {} to {}", source.display(), target.display()))?;

    Ok(relative)
}

/// Performs HTTP health check against the running service
async fn handle_healthcheck(config: &Config) -> Result<()> {
    let host = match config.app.host.as_str() {
        "0.0.0.0" | "::" => "127.0.0.1",
        other => other,
    };
    let url = format!("http://{}:{}/health", host, config.app.port);

    let resp = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .with_context(|| format!("healthcheck error: {}", url))?;

    if !resp.status().is_success() {
        bail!("healthcheck failed: HTTP {}", resp.status());
    }
    tracing::info!("Healthcheck passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryBlogRepository;
    use crate::models::PostInput;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.database.backend = crate::config::StorageBackend::Memory;
        config
    }

    #[tokio::test]
    async fn test_no_command_starts_server() {
        assert!(!run_command(&memory_config(), &[]).await.unwrap());
        assert!(!run_command(&memory_config(), &args(&["serve"])).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_user_and_issue_token() {
        let config = memory_config();
        let repo = InMemoryBlogRepository::new();

        execute(&config, &repo, "create-user", &args(&["leo"]))
            .await
            .unwrap();
        let token = execute(&config, &repo, "issue-token", &args(&["leo"]))
            .await
            .unwrap();

        let requester = SessionKeys::from_config(&config.auth).verify(&token).unwrap();
        assert_eq!(requester.username, "leo");
    }

    #[tokio::test]
    async fn test_create_user_rejects_invalid_username() {
        let repo = InMemoryBlogRepository::new();
        let err = execute(&memory_config(), &repo, "create-user", &args(&["bad name"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[tokio::test]
    async fn test_create_and_delete_group_keeps_posts() {
        let config = memory_config();
        let repo = InMemoryBlogRepository::new();
        let user = repo.create_user("leo").await.unwrap();

        execute(&config, &repo, "create-group", &args(&["cats", "Cats"]))
            .await
            .unwrap();
        let group = repo.find_group_by_slug("cats").await.unwrap().unwrap();
        assert_eq!(group.description, "Cats");

        let post = repo
            .create_post(
                user.id,
                &PostInput {
                    text: "Grouped post".into(),
                    group_id: Some(group.id),
                },
            )
            .await
            .unwrap();

        execute(&config, &repo, "delete-group", &args(&["cats"]))
            .await
            .unwrap();
        let post = repo.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.group_id, None);
    }

    #[tokio::test]
    async fn test_delete_post() {
        let config = memory_config();
        let repo = InMemoryBlogRepository::new();
        let user = repo.create_user("leo").await.unwrap();
        let post = repo
            .create_post(
                user.id,
                &PostInput {
                    text: "Doomed".into(),
                    group_id: None,
                },
            )
            .await
            .unwrap();

        let id = post.id.to_string();
        let out = execute(&config, &repo, "delete-post", &args(&[id.as_str()]))
            .await
            .unwrap();
        assert!(out.contains("Doomed"));
        assert!(repo.find_post(post.id).await.unwrap().is_none());
        assert!(execute(&config, &repo, "delete-post", &args(&["abc"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_attach_image_copies_into_media_root() {
        let media = tempfile::tempdir().unwrap();
        let mut config = memory_config();
        config.media.root = media.path().to_string_lossy().into_owned();

        let repo = InMemoryBlogRepository::new();
        let user = repo.create_user("leo").await.unwrap();
        let post = repo
            .create_post(
                user.id,
                &PostInput {
                    text: "With picture".into(),
                    group_id: None,
                },
            )
            .await
            .unwrap();

        let source = media.path().join("small.gif");
        std::fs::write(&source, b"GIF89a").unwrap();

        let id = post.id.to_string();
        let file = source.to_string_lossy().into_owned();
        execute(
            &config,
            &repo,
            "attach-image",
            &args(&[id.as_str(), file.as_str()]),
        )
        .await
        .unwrap();

        let stored = repo.find_post(post.id).await.unwrap().unwrap().image.unwrap();
        assert_eq!(stored, format!("posts/{}_small.gif", post.id));
        assert!(media.path().join(&stored).exists());
    }

    #[tokio::test]
    async fn test_wrong_arity_prints_usage() {
        let repo = InMemoryBlogRepository::new();
        let err = execute(&memory_config(), &repo, "create-user", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("usage:"));
    }
}
