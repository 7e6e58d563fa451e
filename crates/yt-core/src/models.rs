//! # Domain Models
//!
//! These structs represent the core entities of Yatube.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of characters a post contributes to page titles and listings.
pub const POST_EXCERPT_CHARS: usize = 15;

/// A registered author/reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Login name, unique across the site and used in profile URLs
    pub username: String,
    pub display_name: String,
    /// Argon2 PHC string, never rendered
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub joined_at: DateTime<Utc>,
}

impl User {
    /// The name shown on pages: the display name, or the username when blank.
    pub fn shown_name(&self) -> &str {
        let trimmed = self.display_name.trim();
        if trimmed.is_empty() {
            &self.username
        } else {
            trimmed
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shown_name())
    }
}

/// A topical collection of posts (e.g. /group/cats/)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub title: String,
    /// The URL slug (e.g. "cats" for /group/cats/)
    pub slug: String,
    pub description: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// The fundamental unit of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Set once at creation, never rewritten by edits
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    /// Public URL of the attached picture
    pub image: Option<String>,
}

impl Post {
    pub fn excerpt(&self) -> String {
        excerpt(&self.text)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.excerpt())
    }
}

/// A post joined with what listings need to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_display_name: String,
    pub group_id: Option<Uuid>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    /// Current score of the author, 0 when nobody has voted yet
    pub author_rating: i64,
    pub image: Option<String>,
}

impl PostCard {
    pub fn excerpt(&self) -> String {
        excerpt(&self.text)
    }

    pub fn author_name(&self) -> &str {
        let trimmed = self.author_display_name.trim();
        if trimmed.is_empty() {
            &self.author_username
        } else {
            trimmed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A comment joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentCard {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
}

/// Directed subscription edge: `user_id` reads `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub user_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Accumulated score of an author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub author_id: Uuid,
    pub score: i64,
}

/// Which way a vote pushes an author's rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn sign(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

/// Which posts a listing is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts by every author the given user follows
    FeedOf(Uuid),
}

fn excerpt(text: &str) -> String {
    text.chars().take(POST_EXCERPT_CHARS).collect()
}
