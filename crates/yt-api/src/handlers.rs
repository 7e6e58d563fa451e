//! # yt-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core
//! services. Handlers pick the redirect or page; `yt_core` decides what is
//! stored.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use futures_util::TryStreamExt;
use serde::Deserialize;
use uuid::Uuid;
use yt_core::accounts::{self, Signup};
use yt_core::cache::{CacheKey, PageCache};
use yt_core::content::{self, EditOutcome, PostDraft};
use yt_core::social::{self, VoteOutcome};
use yt_core::{
    AppError, AuthProvider, BlogRepo, ContentRepo, MediaStore, Paginator, PostScope, User,
    VoteDirection,
};
use yt_ui::{
    AboutAuthorTemplate, AboutTechTemplate, Chrome, FollowTemplate, GroupOption, GroupTemplate,
    IndexTemplate, LoginTemplate, PostDetailTemplate, PostFormTemplate, ProfileTemplate,
    SignupTemplate,
};

use crate::error::{not_found_page, ApiError};
use crate::session::{removal_cookie, sanitize_next, session_cookie, Viewer};

/// Cache route name of the front page.
pub const INDEX_ROUTE: &str = "index";

/// Largest picture a post may carry.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub repo: Box<dyn BlogRepo>,
    pub auth: Box<dyn AuthProvider>,
    pub media: Box<dyn MediaStore>,
    pub cache: PageCache,
    pub paginator: Paginator,
    /// Magnitude of one accepted vote
    pub rating_delta: i64,
}

impl AppState {
    pub fn new(
        repo: Box<dyn BlogRepo>,
        auth: Box<dyn AuthProvider>,
        media: Box<dyn MediaStore>,
        cache: PageCache,
        posts_per_page: i64,
        rating_delta: i64,
    ) -> Self {
        Self {
            repo,
            auth,
            media,
            cache,
            paginator: Paginator::new(posts_per_page),
            rating_delta,
        }
    }
}

type Reply = Result<HttpResponse, ApiError>;

/// Value of `?page=`. When repeated the last one wins; a query string that
/// does not parse counts as no page at all.
fn requested_page(req: &HttpRequest) -> Option<String> {
    web::Query::<Vec<(String, String)>>::from_query(req.query_string())
        .ok()?
        .into_inner()
        .into_iter()
        .rev()
        .find_map(|(key, value)| (key == "page").then_some(value))
}

/// A post form as submitted in `multipart/form-data`.
#[derive(Debug, Default)]
pub struct PostForm {
    text: String,
    /// Group id, or empty for "no group"
    group: String,
    image: Option<Vec<u8>>,
    /// Set when a field went over its size limit
    rejected: Option<String>,
}

impl PostForm {
    async fn read(mut payload: Multipart) -> Result<Self, ApiError> {
        let mut form = PostForm::default();
        while let Some(mut field) = payload.try_next().await? {
            let name = field
                .content_disposition()
                .get_name()
                .unwrap_or_default()
                .to_string();
            let limit = if name == "image" {
                MAX_IMAGE_BYTES
            } else {
                MAX_TEXT_FIELD_BYTES
            };

            let mut buf = Vec::new();
            let mut oversized = false;
            // An oversized field is still drained so the next one can be read.
            while let Some(chunk) = field.try_next().await? {
                if oversized || buf.len() + chunk.len() > limit {
                    oversized = true;
                    continue;
                }
                buf.extend_from_slice(&chunk);
            }
            if oversized {
                form.rejected = Some(format!("{name} is larger than {} KiB", limit / 1024));
                continue;
            }

            match name.as_str() {
                "text" => form.text = String::from_utf8_lossy(&buf).into_owned(),
                "group" => form.group = String::from_utf8_lossy(&buf).into_owned(),
                "image" if !buf.is_empty() => form.image = Some(buf),
                _ => {}
            }
        }
        Ok(form)
    }

    fn selected_group(&self) -> Option<Uuid> {
        Uuid::parse_str(self.group.trim()).ok()
    }

    fn draft(&mut self) -> Result<PostDraft, AppError> {
        if let Some(reason) = self.rejected.take() {
            return Err(AppError::ValidationError(reason));
        }
        let group = self.group.trim();
        let group_id = if group.is_empty() {
            None
        } else {
            Some(
                Uuid::parse_str(group)
                    .map_err(|_| AppError::ValidationError(format!("unknown group {group}")))?,
            )
        };
        Ok(PostDraft {
            text: self.text.clone(),
            group_id,
            image: self.image.take(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    next: Option<String>,
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn render(page: impl Template) -> Reply {
    Ok(html(page.render()?))
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn post_url(post_id: Uuid) -> String {
    format!("/posts/{post_id}/")
}

fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

/// A malformed id can never name a post, so it is a plain 404.
fn parse_post_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Post", raw).into())
}

// --- Listings ---

/// Front page. Rendered bodies are cached per query string and viewer.
pub async fn index(data: web::Data<AppState>, viewer: Viewer, req: HttpRequest) -> Reply {
    let key = CacheKey::new(INDEX_ROUTE, req.query_string(), viewer.id());
    if let Some(body) = data.cache.get(&key) {
        return Ok(html(body));
    }

    // Read before the posts: a write that lands during rendering bumps it.
    let generation = data.cache.generation();
    let page = content::fetch_page(
        data.repo.as_ref(),
        PostScope::All,
        data.paginator,
        requested_page(&req).as_deref(),
    )
    .await?;
    let body = IndexTemplate {
        chrome: Chrome::new(viewer.user()),
        page: &page,
    }
    .render()?;

    data.cache.insert_if_generation(key, body.clone(), generation);
    Ok(html(body))
}

pub async fn group_posts(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    path: web::Path<String>,
) -> Reply {
    let slug = path.into_inner();
    let group = data
        .repo
        .get_group(&slug)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found("Group", &slug))?;

    let page = content::fetch_page(
        data.repo.as_ref(),
        PostScope::Group(group.id),
        data.paginator,
        requested_page(&req).as_deref(),
    )
    .await?;
    render(GroupTemplate {
        chrome: Chrome::new(viewer.user()),
        group: &group,
        page: &page,
    })
}

pub async fn profile(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    path: web::Path<String>,
) -> Reply {
    let repo = data.repo.as_ref();
    let author = accounts::find_user(repo, &path).await?;
    let page = content::fetch_page(
        repo,
        PostScope::Author(author.id),
        data.paginator,
        requested_page(&req).as_deref(),
    )
    .await?;

    let (following, can_follow) = match viewer.user() {
        Some(user) if user.id != author.id => {
            (social::is_following(repo, user, &author).await?, true)
        }
        _ => (false, false),
    };
    let can_vote = social::can_vote(repo, viewer.user(), &author).await?;
    let rating = social::rating_of(repo, &author).await?;

    render(ProfileTemplate {
        chrome: Chrome::new(viewer.user()),
        author: &author,
        page: &page,
        following,
        can_follow,
        can_vote,
        rating,
    })
}

/// Posts by everyone the viewer follows.
pub async fn follow_index(data: web::Data<AppState>, viewer: Viewer, req: HttpRequest) -> Reply {
    let user = viewer.require(&req)?;
    let page = content::fetch_page(
        data.repo.as_ref(),
        PostScope::FeedOf(user.id),
        data.paginator,
        requested_page(&req).as_deref(),
    )
    .await?;
    render(FollowTemplate {
        chrome: Chrome::new(Some(user)),
        page: &page,
    })
}

// --- Posts & Comments ---

pub async fn post_detail(
    data: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> Reply {
    let post_id = parse_post_id(&path)?;
    let post = content::find_post(data.repo.as_ref(), post_id).await?;
    let comments = data
        .repo
        .list_comments(post_id)
        .await
        .map_err(AppError::from)?;
    let author_post_count = data
        .repo
        .count_posts(PostScope::Author(post.author_id))
        .await
        .map_err(AppError::from)?;

    render(PostDetailTemplate {
        chrome: Chrome::new(viewer.user()),
        post: &post,
        comments: &comments,
        author_post_count,
        can_edit: viewer.id() == Some(post.author_id),
        can_comment: viewer.user().is_some(),
    })
}

/// What the post form shows when it is (re)rendered.
struct FormView<'a> {
    text: &'a str,
    selected: Option<Uuid>,
    current_image: Option<&'a str>,
    error: Option<String>,
}

async fn render_post_form(
    data: &AppState,
    user: &User,
    editing: Option<Uuid>,
    view: FormView<'_>,
) -> Reply {
    let groups = data.repo.list_groups().await.map_err(AppError::from)?;
    let action = match editing {
        Some(post_id) => format!("/posts/{post_id}/edit/"),
        None => "/create/".to_string(),
    };
    render(PostFormTemplate {
        chrome: Chrome::new(Some(user)),
        groups: GroupOption::list(&groups, view.selected),
        text: view.text,
        current_image: view.current_image,
        is_edit: editing.is_some(),
        action,
        error: view.error,
    })
}

pub async fn new_post_form(data: web::Data<AppState>, viewer: Viewer, req: HttpRequest) -> Reply {
    let user = viewer.require(&req)?;
    let view = FormView {
        text: "",
        selected: None,
        current_image: None,
        error: None,
    };
    render_post_form(&data, user, None, view).await
}

pub async fn create_post(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    payload: Multipart,
) -> Reply {
    let user = viewer.require(&req)?;
    let mut form = PostForm::read(payload).await?;
    let created = match form.draft() {
        Ok(draft) => {
            content::create_post(data.repo.as_ref(), data.media.as_ref(), user, draft).await
        }
        Err(err) => Err(err),
    };

    match created {
        Ok(_) => {
            data.cache.invalidate_route(INDEX_ROUTE);
            Ok(redirect(&profile_url(&user.username)))
        }
        Err(AppError::ValidationError(reason)) => {
            let view = FormView {
                text: &form.text,
                selected: form.selected_group(),
                current_image: None,
                error: Some(reason),
            };
            render_post_form(&data, user, None, view).await
        }
        Err(err) => Err(err.into()),
    }
}

/// Non-authors are sent to the read-only view instead of the form.
pub async fn edit_post_form(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    path: web::Path<String>,
) -> Reply {
    let user = viewer.require(&req)?;
    let post_id = parse_post_id(&path)?;
    match content::load_for_edit(data.repo.as_ref(), user, post_id).await? {
        Some(post) => {
            let view = FormView {
                text: &post.text,
                selected: post.group_id,
                current_image: post.image.as_deref(),
                error: None,
            };
            render_post_form(&data, user, Some(post_id), view).await
        }
        None => Ok(redirect(&post_url(post_id))),
    }
}

pub async fn edit_post(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    path: web::Path<String>,
    payload: Multipart,
) -> Reply {
    let user = viewer.require(&req)?;
    let post_id = parse_post_id(&path)?;
    let Some(post) = content::load_for_edit(data.repo.as_ref(), user, post_id).await? else {
        return Ok(redirect(&post_url(post_id)));
    };

    let mut form = PostForm::read(payload).await?;
    let edited = match form.draft() {
        Ok(draft) => {
            content::edit_post(data.repo.as_ref(), data.media.as_ref(), user, post_id, draft)
                .await
        }
        Err(err) => Err(err),
    };
    match edited {
        Ok(EditOutcome::Updated) => {
            data.cache.invalidate_route(INDEX_ROUTE);
            Ok(redirect(&post_url(post_id)))
        }
        Ok(EditOutcome::NotOwner) => Ok(redirect(&post_url(post_id))),
        Err(AppError::ValidationError(reason)) => {
            let view = FormView {
                text: &form.text,
                selected: form.selected_group(),
                current_image: post.image.as_deref(),
                error: Some(reason),
            };
            render_post_form(&data, user, Some(post_id), view).await
        }
        Err(err) => Err(err.into()),
    }
}

/// Blank comments are dropped; either way the visitor lands back on the post.
pub async fn add_comment(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    path: web::Path<String>,
    form: web::Form<CommentForm>,
) -> Reply {
    let user = viewer.require(&req)?;
    let post_id = parse_post_id(&path)?;
    match content::add_comment(data.repo.as_ref(), user, post_id, &form.text).await {
        Ok(_) | Err(AppError::ValidationError(_)) => Ok(redirect(&post_url(post_id))),
        Err(err) => Err(err.into()),
    }
}

// --- Follows & Votes ---

pub async fn profile_follow(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    path: web::Path<String>,
) -> Reply {
    let user = viewer.require(&req)?;
    let author = accounts::find_user(data.repo.as_ref(), &path).await?;
    social::follow(data.repo.as_ref(), user, &author).await?;
    Ok(redirect(&profile_url(&author.username)))
}

pub async fn profile_unfollow(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    path: web::Path<String>,
) -> Reply {
    let user = viewer.require(&req)?;
    let author = accounts::find_user(data.repo.as_ref(), &path).await?;
    social::unfollow(data.repo.as_ref(), user, &author).await?;
    Ok(redirect(&profile_url(&author.username)))
}

async fn rate(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    username: &str,
    direction: VoteDirection,
) -> Reply {
    let user = viewer.require(&req)?;
    let author = accounts::find_user(data.repo.as_ref(), username).await?;
    let outcome =
        social::cast_vote(data.repo.as_ref(), user, &author, direction, data.rating_delta).await?;
    if let VoteOutcome::Counted { .. } = outcome {
        // Index cards show the author's rating
        data.cache.invalidate_route(INDEX_ROUTE);
    }
    Ok(redirect(&profile_url(&author.username)))
}

pub async fn rate_up(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    path: web::Path<String>,
) -> Reply {
    rate(data, viewer, req, &path, VoteDirection::Up).await
}

pub async fn rate_down(
    data: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    path: web::Path<String>,
) -> Reply {
    rate(data, viewer, req, &path, VoteDirection::Down).await
}

// --- Accounts ---

fn start_session(data: &AppState, user: &User, next: &str) -> Reply {
    let token = data.auth.issue_session(user.id).map_err(AppError::from)?;
    log::info!("{} logged in", user.username);
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, next))
        .cookie(session_cookie(token))
        .finish())
}

pub async fn signup_form(viewer: Viewer) -> Reply {
    render(SignupTemplate {
        chrome: Chrome::new(viewer.user()),
        username: String::new(),
        display_name: String::new(),
        error: None,
    })
}

/// Creates the account and logs it in straight away.
pub async fn signup(data: web::Data<AppState>, form: web::Form<SignupForm>) -> Reply {
    let form = form.into_inner();
    let signup = Signup {
        username: form.username.clone(),
        display_name: form.display_name.clone(),
        password: form.password,
    };
    match accounts::register(data.repo.as_ref(), data.auth.as_ref(), signup).await {
        Ok(user) => start_session(&data, &user, "/"),
        Err(AppError::ValidationError(reason)) | Err(AppError::Conflict(reason)) => {
            render(SignupTemplate {
                chrome: Chrome::new(None),
                username: form.username,
                display_name: form.display_name,
                error: Some(reason),
            })
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn login_form(viewer: Viewer, query: web::Query<LoginQuery>) -> Reply {
    render(LoginTemplate {
        chrome: Chrome::new(viewer.user()),
        next: sanitize_next(query.next.as_deref()),
        username: String::new(),
        error: None,
    })
}

pub async fn login(data: web::Data<AppState>, form: web::Form<LoginForm>) -> Reply {
    let next = sanitize_next(form.next.as_deref());
    match accounts::authenticate(
        data.repo.as_ref(),
        data.auth.as_ref(),
        &form.username,
        &form.password,
    )
    .await
    {
        Ok(user) => start_session(&data, &user, &next),
        Err(AppError::Unauthorized(reason)) => render(LoginTemplate {
            chrome: Chrome::new(None),
            next,
            username: form.username.clone(),
            error: Some(reason),
        }),
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(viewer: Viewer) -> HttpResponse {
    if let Some(user) = viewer.user() {
        log::info!("{} logged out", user.username);
    }
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(removal_cookie())
        .finish()
}

// --- Static pages ---

pub async fn about_author(viewer: Viewer) -> Reply {
    render(AboutAuthorTemplate {
        chrome: Chrome::new(viewer.user()),
    })
}

pub async fn about_tech(viewer: Viewer) -> Reply {
    render(AboutTechTemplate {
        chrome: Chrome::new(viewer.user()),
    })
}

/// Default service for every unmatched route.
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    not_found_page(format!("Nothing lives at {}.", req.path()))
}
