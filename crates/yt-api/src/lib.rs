//! # yt-api
//!
//! The web routing and orchestration layer for Yatube.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;

use actix_web::web;

pub use error::ApiError;
pub use handlers::AppState;
pub use session::Viewer;

/// Registers every page of the site.
///
/// Anything that changes state is POST only: the session cookie is
/// `SameSite=Lax`, which browsers still send on cross-site GET navigation.
/// Unmatched paths are left to the app's default service
/// (`handlers::not_found`).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/group/{slug}/", web::get().to(handlers::group_posts))
        .route("/follow/", web::get().to(handlers::follow_index))
        .service(
            web::resource("/create/")
                .route(web::get().to(handlers::new_post_form))
                .route(web::post().to(handlers::create_post)),
        )
        // Posts
        .route("/posts/{post_id}/", web::get().to(handlers::post_detail))
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(handlers::edit_post_form))
                .route(web::post().to(handlers::edit_post)),
        )
        .route("/posts/{post_id}/comment/", web::post().to(handlers::add_comment))
        // Profiles
        .route("/profile/{username}/", web::get().to(handlers::profile))
        .route("/profile/{username}/follow/", web::post().to(handlers::profile_follow))
        .route("/profile/{username}/unfollow/", web::post().to(handlers::profile_unfollow))
        .route("/profile/{username}/rating/up/", web::post().to(handlers::rate_up))
        .route("/profile/{username}/rating/down/", web::post().to(handlers::rate_down))
        // Accounts
        .service(
            web::resource("/auth/signup/")
                .route(web::get().to(handlers::signup_form))
                .route(web::post().to(handlers::signup)),
        )
        .service(
            web::resource("/auth/login/")
                .route(web::get().to(handlers::login_form))
                .route(web::post().to(handlers::login)),
        )
        .route("/auth/logout/", web::post().to(handlers::logout))
        // Static
        .route("/about/author/", web::get().to(handlers::about_author))
        .route("/about/tech/", web::get().to(handlers::about_tech));
}
