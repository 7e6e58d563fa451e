//! # Posts & Comments
//!
//! Ownership and validation rules for content. Handlers decide where to
//! redirect; this module decides what gets stored.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Comment, Post, PostCard, PostScope, User};
use crate::pagination::{Page, Paginator};
use crate::traits::{ContentRepo, MediaStore};

/// What a post form submits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<Uuid>,
    /// Raw bytes of an attached picture
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Updated,
    /// The editor does not own the post; nothing was written.
    NotOwner,
}

pub async fn create_post<R, M>(
    repo: &R,
    media: &M,
    author: &User,
    draft: PostDraft,
) -> Result<Post>
where
    R: ContentRepo + ?Sized,
    M: MediaStore + ?Sized,
{
    let text = validate_text(&draft.text, "post")?;
    ensure_group_exists(repo, draft.group_id).await?;
    let image = store_image(media, draft.image).await?;

    let post = Post {
        id: Uuid::now_v7(),
        text,
        created_at: Utc::now(),
        author_id: author.id,
        group_id: draft.group_id,
        image,
    };
    repo.create_post(post.clone()).await?;
    log::info!("{} published post {}", author.username, post.id);
    Ok(post)
}

/// Loads a post for editing, or explains why `editor` cannot edit it.
pub async fn load_for_edit<R>(repo: &R, editor: &User, post_id: Uuid) -> Result<Option<PostCard>>
where
    R: ContentRepo + ?Sized,
{
    let post = find_post(repo, post_id).await?;
    if post.author_id != editor.id {
        return Ok(None);
    }
    Ok(Some(post))
}

/// Without a new picture the current one stays attached.
pub async fn edit_post<R, M>(
    repo: &R,
    media: &M,
    editor: &User,
    post_id: Uuid,
    draft: PostDraft,
) -> Result<EditOutcome>
where
    R: ContentRepo + ?Sized,
    M: MediaStore + ?Sized,
{
    let post = find_post(repo, post_id).await?;
    if post.author_id != editor.id {
        log::warn!("{} tried to edit post {} they do not own", editor.username, post_id);
        return Ok(EditOutcome::NotOwner);
    }

    let text = validate_text(&draft.text, "post")?;
    ensure_group_exists(repo, draft.group_id).await?;
    let image = store_image(media, draft.image).await?;
    repo.update_post(post_id, &text, draft.group_id, image).await?;
    log::info!("{} edited post {}", editor.username, post_id);
    Ok(EditOutcome::Updated)
}

pub async fn add_comment<R>(repo: &R, author: &User, post_id: Uuid, text: &str) -> Result<Comment>
where
    R: ContentRepo + ?Sized,
{
    find_post(repo, post_id).await?;
    let text = validate_text(text, "comment")?;

    let comment = Comment {
        id: Uuid::now_v7(),
        post_id,
        author_id: author.id,
        text,
        created_at: Utc::now(),
    };
    repo.create_comment(comment.clone()).await?;
    Ok(comment)
}

pub async fn find_post<R>(repo: &R, post_id: Uuid) -> Result<PostCard>
where
    R: ContentRepo + ?Sized,
{
    repo.get_post(post_id)
        .await?
        .ok_or_else(|| AppError::not_found("Post", post_id))
}

/// Fetches one page of `scope`, newest first.
pub async fn fetch_page<R>(
    repo: &R,
    scope: PostScope,
    paginator: Paginator,
    requested: Option<&str>,
) -> Result<Page<PostCard>>
where
    R: ContentRepo + ?Sized,
{
    let total = repo.count_posts(scope).await?;
    let window = paginator.locate(total, requested);
    let items = repo
        .list_posts_paginated(scope, window.limit, window.offset)
        .await?;
    Ok(Page::new(items, window, total))
}

fn validate_text(raw: &str, what: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AppError::ValidationError(format!("{what} text must not be blank")));
    }
    Ok(text.to_string())
}

async fn store_image<M>(media: &M, upload: Option<Vec<u8>>) -> Result<Option<String>>
where
    M: MediaStore + ?Sized,
{
    match upload {
        Some(data) if !data.is_empty() => Ok(Some(media.save_image(data).await?)),
        _ => Ok(None),
    }
}

async fn ensure_group_exists<R>(repo: &R, group_id: Option<Uuid>) -> Result<()>
where
    R: ContentRepo + ?Sized,
{
    if let Some(id) = group_id {
        if repo.get_group_by_id(id).await?.is_none() {
            return Err(AppError::ValidationError(format!("unknown group {id}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockContentRepo, MockMediaStore};
    use mockall::predicate::{always, eq};

    fn user(name: &str) -> User {
        User {
            id: Uuid::now_v7(),
            username: name.to_string(),
            display_name: String::new(),
            password_hash: String::new(),
            joined_at: Utc::now(),
        }
    }

    fn card(author: &User, text: &str) -> PostCard {
        PostCard {
            id: Uuid::now_v7(),
            text: text.to_string(),
            created_at: Utc::now(),
            author_id: author.id,
            author_username: author.username.clone(),
            author_display_name: String::new(),
            group_id: None,
            group_slug: None,
            group_title: None,
            author_rating: 0,
            image: None,
        }
    }

    fn no_uploads() -> MockMediaStore {
        let mut media = MockMediaStore::new();
        media.expect_save_image().never();
        media
    }

    fn draft(text: &str) -> PostDraft {
        PostDraft {
            text: text.to_string(),
            ..PostDraft::default()
        }
    }

    #[tokio::test]
    async fn non_owner_edit_writes_nothing() {
        let owner = user("owner");
        let intruder = user("intruder");
        let existing = card(&owner, "original");
        let post_id = existing.id;

        let mut repo = MockContentRepo::new();
        repo.expect_get_post()
            .with(eq(post_id))
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_update_post().never();

        let draft = draft("defaced");
        let outcome = edit_post(&repo, &no_uploads(), &intruder, post_id, draft).await.unwrap();
        assert_eq!(outcome, EditOutcome::NotOwner);
    }

    #[tokio::test]
    async fn owner_edit_updates_text() {
        let owner = user("owner");
        let existing = card(&owner, "original");
        let post_id = existing.id;

        let mut repo = MockContentRepo::new();
        repo.expect_get_post()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_update_post()
            .withf(move |id, text, group, image| {
                *id == post_id && text == "revised" && group.is_none() && image.is_none()
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let draft = draft("  revised ");
        let outcome = edit_post(&repo, &no_uploads(), &owner, post_id, draft).await.unwrap();
        assert_eq!(outcome, EditOutcome::Updated);
    }

    #[tokio::test]
    async fn edit_of_missing_post_is_not_found() {
        let mut repo = MockContentRepo::new();
        repo.expect_get_post().returning(|_| Ok(None));

        let draft = draft("x");
        let err = edit_post(&repo, &no_uploads(), &user("u"), Uuid::now_v7(), draft)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn blank_post_is_rejected() {
        let mut repo = MockContentRepo::new();
        repo.expect_create_post().never();

        let draft = draft("   ");
        let err = create_post(&repo, &no_uploads(), &user("u"), draft).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn post_in_unknown_group_is_rejected() {
        let mut repo = MockContentRepo::new();
        repo.expect_get_group_by_id().returning(|_| Ok(None));
        repo.expect_create_post().never();

        let draft = PostDraft {
            group_id: Some(Uuid::now_v7()),
            ..draft("hello")
        };
        let err = create_post(&repo, &no_uploads(), &user("u"), draft).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn created_post_belongs_to_author() {
        let author = user("author");
        let author_id = author.id;
        let mut repo = MockContentRepo::new();
        repo.expect_create_post()
            .withf(move |post| post.author_id == author_id && post.text == "hello")
            .times(1)
            .returning(|_| Ok(()));

        let draft = draft("hello");
        let post = create_post(&repo, &no_uploads(), &author, draft).await.unwrap();
        assert_eq!(post.author_id, author.id);
    }

    #[tokio::test]
    async fn attached_picture_is_stored_with_the_post() {
        let mut media = MockMediaStore::new();
        media
            .expect_save_image()
            .withf(|data| data.as_slice() == b"GIF89a")
            .times(1)
            .returning(|_| Ok("/media/ab/cd/abcd.gif".into()));
        let mut repo = MockContentRepo::new();
        repo.expect_create_post()
            .withf(|post| post.image.as_deref() == Some("/media/ab/cd/abcd.gif"))
            .times(1)
            .returning(|_| Ok(()));

        let draft = PostDraft {
            image: Some(b"GIF89a".to_vec()),
            ..draft("with a picture")
        };
        let post = create_post(&repo, &media, &user("u"), draft).await.unwrap();
        assert_eq!(post.image.as_deref(), Some("/media/ab/cd/abcd.gif"));
    }

    #[tokio::test]
    async fn rejected_picture_stores_no_post() {
        let mut media = MockMediaStore::new();
        media
            .expect_save_image()
            .returning(|_| Err(AppError::ValidationError("not an image".into())));
        let mut repo = MockContentRepo::new();
        repo.expect_create_post().never();

        let draft = PostDraft {
            image: Some(b"plain text".to_vec()),
            ..draft("hello")
        };
        let err = create_post(&repo, &media, &user("u"), draft).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn blank_post_never_reaches_media_store() {
        let mut repo = MockContentRepo::new();
        repo.expect_create_post().never();

        let draft = PostDraft {
            image: Some(b"GIF89a".to_vec()),
            ..draft(" ")
        };
        let err = create_post(&repo, &no_uploads(), &user("u"), draft)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn edit_with_new_picture_replaces_it() {
        let owner = user("owner");
        let existing = card(&owner, "original");
        let post_id = existing.id;

        let mut media = MockMediaStore::new();
        media
            .expect_save_image()
            .times(1)
            .returning(|_| Ok("/media/new.png".into()));
        let mut repo = MockContentRepo::new();
        repo.expect_get_post()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_update_post()
            .withf(|_, _, _, image| image.as_deref() == Some("/media/new.png"))
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let draft = PostDraft {
            image: Some(vec![0x89, b'P', b'N', b'G']),
            ..draft("revised")
        };
        let outcome = edit_post(&repo, &media, &owner, post_id, draft).await.unwrap();
        assert_eq!(outcome, EditOutcome::Updated);
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_not_found() {
        let mut repo = MockContentRepo::new();
        repo.expect_get_post().returning(|_| Ok(None));
        repo.expect_create_comment().never();

        let err = add_comment(&repo, &user("u"), Uuid::now_v7(), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn fetch_page_uses_window() {
        let author = user("author");
        let items: Vec<PostCard> = (0..7).map(|i| card(&author, &format!("post {i}"))).collect();

        let mut repo = MockContentRepo::new();
        repo.expect_count_posts()
            .with(eq(PostScope::All))
            .returning(|_| Ok(17));
        repo.expect_list_posts_paginated()
            .with(eq(PostScope::All), eq(10), eq(10))
            .returning(move |_, _, _| Ok(items.clone()));

        let page = fetch_page(&repo, PostScope::All, Paginator::new(10), Some("2"))
            .await
            .unwrap();
        assert_eq!(page.number, 2);
        assert_eq!(page.len(), 7);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn load_for_edit_hides_foreign_posts() {
        let owner = user("owner");
        let existing = card(&owner, "mine");
        let mut repo = MockContentRepo::new();
        repo.expect_get_post()
            .with(always())
            .returning(move |_| Ok(Some(existing.clone())));

        assert!(load_for_edit(&repo, &user("other"), Uuid::now_v7())
            .await
            .unwrap()
            .is_none());
        assert!(load_for_edit(&repo, &owner, Uuid::now_v7())
            .await
            .unwrap()
            .is_some());
    }
}
