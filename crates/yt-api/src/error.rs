//! HTTP mapping for core errors.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use askama::Template;
use thiserror::Error;
use yt_core::AppError;
use yt_ui::{Chrome, NotFoundTemplate};

use crate::session::login_url;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    /// An anonymous visitor hit a page that needs an account.
    #[error("login required for {next}")]
    LoginRequired { next: String },

    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),

    /// The multipart body could not be read.
    #[error("bad upload: {0}")]
    Upload(#[from] actix_multipart::MultipartError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::App(AppError::NotFound(..)) => StatusCode::NOT_FOUND,
            ApiError::App(AppError::ValidationError(_)) | ApiError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::App(AppError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            ApiError::App(AppError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::LoginRequired { .. } => StatusCode::SEE_OTHER,
            ApiError::App(AppError::Internal(_)) | ApiError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::LoginRequired { next } => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, login_url(next)))
                .finish(),
            ApiError::App(AppError::NotFound(kind, id)) => {
                not_found_page(format!("{kind} {id} does not exist."))
            }
            ApiError::App(AppError::Internal(_)) | ApiError::Render(_) => {
                log::error!("{self}");
                HttpResponse::InternalServerError()
                    .content_type("text/plain; charset=utf-8")
                    .body("Internal server error")
            }
            other => HttpResponse::build(other.status_code())
                .content_type("text/plain; charset=utf-8")
                .body(other.to_string()),
        }
    }
}

/// Renders the 404 page; falls back to plain text if the template fails.
pub fn not_found_page(what: String) -> HttpResponse {
    let page = NotFoundTemplate {
        chrome: Chrome::new(None),
        what,
    };
    match page.render() {
        Ok(html) => HttpResponse::NotFound()
            .content_type("text/html; charset=utf-8")
            .body(html),
        Err(err) => {
            log::error!("404 template failed: {err}");
            HttpResponse::NotFound().finish()
        }
    }
}
