use askama::Template;
use chrono::{Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;
use yt_core::models::{CommentCard, Group, PostCard, User};
use yt_core::pagination::Page;

/// Values every page's layout needs: who is looking, and the footer year.
#[derive(Debug, Clone, Serialize)]
pub struct Chrome {
    pub viewer: Option<String>,
    pub year: i32,
}

impl Chrome {
    pub fn new(viewer: Option<&User>) -> Self {
        Self {
            viewer: viewer.map(|user| user.username.clone()),
            year: Utc::now().year(),
        }
    }
}

/// One `<option>` of the group picker on the post form.
#[derive(Debug, Clone, Serialize)]
pub struct GroupOption {
    pub id: Uuid,
    pub title: String,
    pub selected: bool,
}

impl GroupOption {
    pub fn list(groups: &[Group], selected: Option<Uuid>) -> Vec<Self> {
        groups
            .iter()
            .map(|group| GroupOption {
                id: group.id,
                title: group.title.clone(),
                selected: Some(group.id) == selected,
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate<'a> {
    pub chrome: Chrome,
    pub page: &'a Page<PostCard>,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate<'a> {
    pub chrome: Chrome,
    pub group: &'a Group,
    pub page: &'a Page<PostCard>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate<'a> {
    pub chrome: Chrome,
    pub author: &'a User,
    pub page: &'a Page<PostCard>,
    pub following: bool,
    /// Logged in and looking at someone else's profile
    pub can_follow: bool,
    pub can_vote: bool,
    pub rating: i64,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate<'a> {
    pub chrome: Chrome,
    pub post: &'a PostCard,
    pub comments: &'a [CommentCard],
    pub author_post_count: i64,
    pub can_edit: bool,
    pub can_comment: bool,
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate<'a> {
    pub chrome: Chrome,
    pub groups: Vec<GroupOption>,
    pub text: &'a str,
    /// Picture already attached to the post being edited
    pub current_image: Option<&'a str>,
    pub is_edit: bool,
    /// Where the form posts to
    pub action: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate<'a> {
    pub chrome: Chrome,
    pub page: &'a Page<PostCard>,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub next: String,
    pub username: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub chrome: Chrome,
    pub username: String,
    pub display_name: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub chrome: Chrome,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub chrome: Chrome,
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub chrome: Chrome,
    /// One sentence saying what was missing
    pub what: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use yt_core::pagination::Paginator;

    fn card(text: &str) -> PostCard {
        PostCard {
            id: Uuid::now_v7(),
            text: text.to_string(),
            created_at: Utc::now(),
            author_id: Uuid::now_v7(),
            author_username: "leo".into(),
            author_display_name: "Leo".into(),
            group_id: None,
            group_slug: Some("cats".into()),
            group_title: Some("Cats".into()),
            author_rating: 4,
            image: None,
        }
    }

    #[test]
    fn index_escapes_post_text() {
        let window = Paginator::new(10).locate(1, None);
        let page = Page::new(vec![card("<script>alert(1)</script>")], window, 1);
        let html = IndexTemplate {
            chrome: Chrome::new(None),
            page: &page,
        }
        .render()
        .unwrap();

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("/group/cats/"));
        assert!(html.contains("/profile/leo/"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn cards_show_attached_picture() {
        let mut post = card("with a picture");
        post.image = Some("/media/ab/cd/abcd.png".into());
        let window = Paginator::new(10).locate(1, None);
        let page = Page::new(vec![post], window, 1);
        let html = IndexTemplate {
            chrome: Chrome::new(None),
            page: &page,
        }
        .render()
        .unwrap();
        assert!(html.contains("<img"));
        assert!(html.contains("abcd.png"));
    }

    #[test]
    fn post_form_accepts_uploads() {
        let html = PostFormTemplate {
            chrome: Chrome::new(None),
            groups: Vec::new(),
            text: "draft",
            current_image: Some("/media/ab/cd/abcd.png"),
            is_edit: true,
            action: "/posts/x/edit/".into(),
            error: None,
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"enctype="multipart/form-data""#));
        assert!(html.contains(r#"name="image""#));
        assert!(html.contains("Current picture"));
    }

    #[test]
    fn footer_shows_current_year() {
        let html = AboutTechTemplate {
            chrome: Chrome::new(None),
        }
        .render()
        .unwrap();
        assert!(html.contains(&Utc::now().year().to_string()));
    }

    #[test]
    fn group_picker_marks_selection() {
        let groups = vec![
            Group {
                id: Uuid::now_v7(),
                title: "Cats".into(),
                slug: "cats".into(),
                description: String::new(),
            },
            Group {
                id: Uuid::now_v7(),
                title: "Dogs".into(),
                slug: "dogs".into(),
                description: String::new(),
            },
        ];
        let options = GroupOption::list(&groups, Some(groups[1].id));
        assert!(!options[0].selected);
        assert!(options[1].selected);
    }
}
