//! yatube/crates/yt-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Yatube.

pub mod accounts;
pub mod cache;
pub mod content;
pub mod error;
pub mod models;
pub mod pagination;
pub mod social;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use pagination::{Page, Paginator};
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use uuid::Uuid;

    #[test]
    fn test_post_displays_as_excerpt() {
        let post = Post {
            id: Uuid::now_v7(),
            text: "Привет, это длинный тестовый пост".to_string(),
            created_at: chrono::Utc::now(),
            author_id: Uuid::now_v7(),
            group_id: None,
            image: None,
        };
        assert_eq!(post.to_string(), "Привет, это дли");
        assert_eq!(post.to_string().chars().count(), POST_EXCERPT_CHARS);
    }

    #[test]
    fn test_group_displays_as_title() {
        let group = Group {
            id: Uuid::now_v7(),
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        };
        assert_eq!(group.to_string(), "Cats");
    }

    #[test]
    fn test_user_falls_back_to_username() {
        let mut user = User {
            id: Uuid::now_v7(),
            username: "leo".to_string(),
            display_name: "  ".to_string(),
            password_hash: String::new(),
            joined_at: chrono::Utc::now(),
        };
        assert_eq!(user.shown_name(), "leo");
        user.display_name = "Leo Tolstoy".to_string();
        assert_eq!(user.to_string(), "Leo Tolstoy");
    }

    #[test]
    fn test_vote_direction_sign() {
        assert_eq!(VoteDirection::Up.sign(), 1);
        assert_eq!(VoteDirection::Down.sign(), -1);
    }
}
