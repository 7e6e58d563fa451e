//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Comment, CommentCard, Group, Post, PostCard, PostScope, Rating, User, VoteDirection,
};

/// Persistence contract for accounts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails if the username is already taken.
    async fn create_user(&self, user: User) -> anyhow::Result<()>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn get_user_by_name(&self, username: &str) -> anyhow::Result<Option<User>>;
}

/// Persistence contract for groups, posts, and comments.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentRepo: Send + Sync {
    // Group Operations
    async fn create_group(&self, group: Group) -> anyhow::Result<()>;
    async fn get_group(&self, slug: &str) -> anyhow::Result<Option<Group>>;
    async fn get_group_by_id(&self, id: Uuid) -> anyhow::Result<Option<Group>>;
    async fn list_groups(&self) -> anyhow::Result<Vec<Group>>;

    // Post Operations
    async fn create_post(&self, post: Post) -> anyhow::Result<()>;
    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<PostCard>>;
    /// Rewrites text, group, and (when `image` is set) the picture. The
    /// author column is never touched; `None` keeps the current picture.
    async fn update_post(
        &self,
        id: Uuid,
        text: &str,
        group_id: Option<Uuid>,
        image: Option<String>,
    ) -> anyhow::Result<()>;
    async fn count_posts(&self, scope: PostScope) -> anyhow::Result<i64>;
    /// Newest first.
    async fn list_posts_paginated(
        &self,
        scope: PostScope,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<PostCard>>;

    // Comment Operations
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()>;
    /// Oldest first.
    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentCard>>;
}

/// Follow graph, vote ledger, and rating aggregate.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SocialRepo: Send + Sync {
    /// Returns false if the edge already existed.
    async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool>;
    /// Returns false if there was no edge to delete.
    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool>;
    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool>;
    async fn count_follows(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<i64>;

    async fn has_voted(&self, voter_id: Uuid, author_id: Uuid) -> anyhow::Result<bool>;
    /// Writes the ledger entry and adds `direction * magnitude` to the author's
    /// score as one atomic unit. Returns the new score, or `None` when the
    /// ledger already held an entry for the pair (nothing is changed then).
    async fn record_vote(
        &self,
        voter_id: Uuid,
        author_id: Uuid,
        direction: VoteDirection,
        magnitude: i64,
    ) -> anyhow::Result<Option<i64>>;
    async fn rating(&self, author_id: Uuid) -> anyhow::Result<Option<Rating>>;
}

/// Everything the web layer needs from storage, behind one object.
pub trait BlogRepo: UserRepo + ContentRepo + SocialRepo {}

impl<T: UserRepo + ContentRepo + SocialRepo> BlogRepo for T {}

/// Storage for pictures attached to posts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw upload bytes and returns the public URL of the stored
    /// picture. Bytes that are not a supported image are a
    /// `ValidationError`.
    async fn save_image(&self, data: Vec<u8>) -> Result<String>;
}

/// Identity contract: password hashing and session tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produces a PHC-format hash suitable for `User::password_hash`.
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Verifies a password against a stored hash.
    async fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// Issues a signed, expiring session token for the user.
    fn issue_session(&self, user_id: Uuid) -> anyhow::Result<String>;

    /// Returns the user id if the token is authentic and unexpired.
    fn resolve_session(&self, token: &str) -> Option<Uuid>;
}
