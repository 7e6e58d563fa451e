//! # Follow Graph & Vote Ledger
//!
//! Self-follows and self-votes are ignored rather than rejected: the caller
//! gets an outcome describing what happened and redirects as usual.

use crate::error::Result;
use crate::models::{User, VoteDirection};
use crate::traits::SocialRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Removed,
    NotFollowing,
    SelfFollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was recorded; `score` is the author's rating afterwards.
    Counted { score: i64 },
    AlreadyVoted,
    SelfVote,
}

pub async fn follow<R>(repo: &R, user: &User, author: &User) -> Result<FollowOutcome>
where
    R: SocialRepo + ?Sized,
{
    if user.id == author.id {
        return Ok(FollowOutcome::SelfFollow);
    }

    let outcome = if repo.insert_follow(user.id, author.id).await? {
        log::info!("{} now follows {}", user.username, author.username);
        FollowOutcome::Created
    } else {
        FollowOutcome::AlreadyFollowing
    };
    Ok(outcome)
}

pub async fn unfollow<R>(repo: &R, user: &User, author: &User) -> Result<UnfollowOutcome>
where
    R: SocialRepo + ?Sized,
{
    if user.id == author.id {
        return Ok(UnfollowOutcome::SelfFollow);
    }

    let outcome = if repo.delete_follow(user.id, author.id).await? {
        log::info!("{} unfollowed {}", user.username, author.username);
        UnfollowOutcome::Removed
    } else {
        UnfollowOutcome::NotFollowing
    };
    Ok(outcome)
}

pub async fn is_following<R>(repo: &R, user: &User, author: &User) -> Result<bool>
where
    R: SocialRepo + ?Sized,
{
    Ok(repo.is_following(user.id, author.id).await?)
}

/// Casts `voter`'s one and only vote on `author`.
///
/// `rating_delta` is the configured per-vote magnitude; the storage layer
/// applies the ledger write and the score increment together.
pub async fn cast_vote<R>(
    repo: &R,
    voter: &User,
    author: &User,
    direction: VoteDirection,
    rating_delta: i64,
) -> Result<VoteOutcome>
where
    R: SocialRepo + ?Sized,
{
    if voter.id == author.id {
        return Ok(VoteOutcome::SelfVote);
    }

    match repo
        .record_vote(voter.id, author.id, direction, rating_delta)
        .await?
    {
        Some(score) => {
            log::info!(
                "{} voted {:?} on {}, rating now {}",
                voter.username,
                direction,
                author.username,
                score
            );
            Ok(VoteOutcome::Counted { score })
        }
        None => Ok(VoteOutcome::AlreadyVoted),
    }
}

/// Whether the profile page should offer vote buttons to `viewer`.
pub async fn can_vote<R>(repo: &R, viewer: Option<&User>, author: &User) -> Result<bool>
where
    R: SocialRepo + ?Sized,
{
    match viewer {
        None => Ok(false),
        Some(v) if v.id == author.id => Ok(false),
        Some(v) => Ok(!repo.has_voted(v.id, author.id).await?),
    }
}

/// Current score of `author`; authors nobody voted on sit at 0.
pub async fn rating_of<R>(repo: &R, author: &User) -> Result<i64>
where
    R: SocialRepo + ?Sized,
{
    Ok(repo
        .rating(author.id)
        .await?
        .map(|rating| rating.score)
        .unwrap_or(0))
}
