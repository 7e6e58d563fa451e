//! # yt-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `yt-core` domain models.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use uuid::Uuid;
use yt_core::models::{
    Comment, CommentCard, Group, Post, PostCard, PostScope, Rating, User, VoteDirection,
};
use yt_core::traits::{ContentRepo, SocialRepo, UserRepo};

const SCHEMA: &str = include_str!("../schema.sql");

const POST_CARD_SELECT: &str = "SELECT p.id, p.text, p.created_at, p.author_id, p.group_id, p.image, \
     u.username AS author_username, u.display_name AS author_display_name, \
     g.slug AS group_slug, g.title AS group_title, \
     COALESCE(r.score, 0) AS author_rating \
     FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id \
     LEFT JOIN ratings r ON r.author_id = p.author_id";

/// Implements every storage port over one connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn opt_blob_to_uuid(blob: Option<Vec<u8>>) -> Option<Uuid> {
    blob.map(|b| blob_to_uuid(&b))
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    ///
    /// # Developer Note
    /// An in-memory database lives only as long as its connection, so those
    /// pools are pinned to a single connection that is never recycled.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await?
        } else {
            // WAL lets readers proceed while one writer holds the lock.
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        let store = Self { pool };
        store.migrate().await?;
        log::info!("SQLite store ready at {url}");
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        let without_comments: String = SCHEMA
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");

        for statement in without_comments.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&self.pool).await?;
        }
        self.add_missing_columns().await
    }

    /// Databases created before pictures were supported lack `posts.image`.
    async fn add_missing_columns(&self) -> anyhow::Result<()> {
        let columns = sqlx::query("SELECT name FROM pragma_table_info('posts')")
            .fetch_all(&self.pool)
            .await?;
        let has_image = columns
            .iter()
            .any(|row| row.get::<String, _>("name") == "image");
        if !has_image {
            sqlx::query("ALTER TABLE posts ADD COLUMN image TEXT")
                .execute(&self.pool)
                .await?;
            log::info!("added posts.image column");
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_user(row: &SqliteRow) -> User {
    User {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        username: row.get("username"),
        display_name: row.get("display_name"),
        password_hash: row.get("password_hash"),
        joined_at: row.get("joined_at"),
    }
}

fn row_to_group(row: &SqliteRow) -> Group {
    Group {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
    }
}

fn row_to_card(row: &SqliteRow) -> PostCard {
    PostCard {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        text: row.get("text"),
        created_at: row.get("created_at"),
        author_id: blob_to_uuid(row.get::<Vec<u8>, _>("author_id").as_slice()),
        author_username: row.get("author_username"),
        author_display_name: row.get("author_display_name"),
        group_id: opt_blob_to_uuid(row.get("group_id")),
        group_slug: row.get("group_slug"),
        group_title: row.get("group_title"),
        author_rating: row.get("author_rating"),
        image: row.get("image"),
    }
}

/// WHERE clause for a listing plus the id it binds, if any.
fn scope_filter(scope: PostScope) -> (&'static str, Option<Uuid>) {
    match scope {
        PostScope::All => ("", None),
        PostScope::Group(id) => ("WHERE p.group_id = ?", Some(id)),
        PostScope::Author(id) => ("WHERE p.author_id = ?", Some(id)),
        PostScope::FeedOf(id) => (
            "WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ?)",
            Some(id),
        ),
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn create_user(&self, user: User) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO users (id, username, display_name, password_hash, joined_at) VALUES (?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(user.id))
            .bind(user.username)
            .bind(user.display_name)
            .bind(user.password_hash)
            .bind(user.joined_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn get_user_by_name(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_user))
    }
}

#[async_trait]
impl ContentRepo for SqliteStore {
    async fn create_group(&self, group: Group) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO post_groups (id, title, slug, description) VALUES (?, ?, ?, ?)")
            .bind(uuid_to_blob(group.id))
            .bind(group.title)
            .bind(group.slug)
            .bind(group.description)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Retrieves a group by its slug.
    async fn get_group(&self, slug: &str) -> anyhow::Result<Option<Group>> {
        let row = sqlx::query("SELECT id, title, slug, description FROM post_groups WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_group))
    }

    async fn get_group_by_id(&self, id: Uuid) -> anyhow::Result<Option<Group>> {
        let row = sqlx::query("SELECT id, title, slug, description FROM post_groups WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_group))
    }

    async fn list_groups(&self) -> anyhow::Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, title, slug, description FROM post_groups ORDER BY title ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_group).collect())
    }

    async fn create_post(&self, post: Post) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO posts (id, text, created_at, author_id, group_id, image) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(post.id))
            .bind(post.text)
            .bind(post.created_at)
            .bind(uuid_to_blob(post.author_id))
            .bind(post.group_id.map(uuid_to_blob))
            .bind(post.image)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<PostCard>> {
        let sql = format!("{POST_CARD_SELECT} WHERE p.id = ?");
        let row = sqlx::query(&sql)
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_card))
    }

    async fn update_post(
        &self,
        id: Uuid,
        text: &str,
        group_id: Option<Uuid>,
        image: Option<String>,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE posts SET text = ?, group_id = ?, image = COALESCE(?, image) WHERE id = ?")
            .bind(text)
            .bind(group_id.map(uuid_to_blob))
            .bind(image)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_posts(&self, scope: PostScope) -> anyhow::Result<i64> {
        let (filter, bound) = scope_filter(scope);
        let sql = format!("SELECT COUNT(*) AS n FROM posts p {filter}");
        let mut query = sqlx::query(&sql);
        if let Some(id) = bound {
            query = query.bind(uuid_to_blob(id));
        }
        let row = query.fetch_one(&self.pool).await?;
        Ok(row.get("n"))
    }

    async fn list_posts_paginated(
        &self,
        scope: PostScope,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<PostCard>> {
        let (filter, bound) = scope_filter(scope);
        let sql = format!(
            "{POST_CARD_SELECT} {filter} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
        );
        let mut query = sqlx::query(&sql);
        if let Some(id) = bound {
            query = query.bind(uuid_to_blob(id));
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_card).collect())
    }

    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO comments (id, post_id, author_id, text, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(comment.id))
            .bind(uuid_to_blob(comment.post_id))
            .bind(uuid_to_blob(comment.author_id))
            .bind(comment.text)
            .bind(comment.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentCard>> {
        let rows = sqlx::query(
            "SELECT c.id, c.text, c.created_at, u.username AS author_username \
             FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(uuid_to_blob(post_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CommentCard {
                id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
                text: row.get("text"),
                created_at: row.get("created_at"),
                author_username: row.get("author_username"),
            })
            .collect())
    }
}

#[async_trait]
impl SocialRepo for SqliteStore {
    async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO follows (user_id, author_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, author_id) DO NOTHING",
        )
        .bind(uuid_to_blob(user_id))
        .bind(uuid_to_blob(author_id))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(uuid_to_blob(user_id))
            .bind(uuid_to_blob(author_id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.count_follows(user_id, author_id).await? > 0)
    }

    async fn count_follows(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(uuid_to_blob(user_id))
            .bind(uuid_to_blob(author_id))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    async fn has_voted(&self, voter_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM vote_ledger WHERE voter_id = ? AND author_id = ?")
            .bind(uuid_to_blob(voter_id))
            .bind(uuid_to_blob(author_id))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n") > 0)
    }

    /// Ledger insert and score increment in one transaction.
    ///
    /// # Developer Note
    /// The score is bumped with an upsert (`score = score + excluded.score`)
    /// instead of read-then-write, so concurrent votes on the same author
    /// cannot overwrite each other.
    async fn record_vote(
        &self,
        voter_id: Uuid,
        author_id: Uuid,
        direction: VoteDirection,
        magnitude: i64,
    ) -> anyhow::Result<Option<i64>> {
        let mut tx = self.pool.begin().await?;

        // 1. Claim the (voter, author) slot
        let claimed = sqlx::query(
            "INSERT INTO vote_ledger (voter_id, author_id, direction, created_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (voter_id, author_id) DO NOTHING",
        )
        .bind(uuid_to_blob(voter_id))
        .bind(uuid_to_blob(author_id))
        .bind(direction.sign())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        // 2. Apply the delta, creating the rating at 0 on first vote
        let row = sqlx::query(
            "INSERT INTO ratings (author_id, score) VALUES (?, ?) \
             ON CONFLICT (author_id) DO UPDATE SET score = score + excluded.score \
             RETURNING score",
        )
        .bind(uuid_to_blob(author_id))
        .bind(direction.sign() * magnitude)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row.get("score")))
    }

    async fn rating(&self, author_id: Uuid) -> anyhow::Result<Option<Rating>> {
        let row = sqlx::query("SELECT author_id, score FROM ratings WHERE author_id = ?")
            .bind(uuid_to_blob(author_id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| Rating {
            author_id: blob_to_uuid(row.get::<Vec<u8>, _>("author_id").as_slice()),
            score: row.get("score"),
        }))
    }
}
