//! Request extractors whose rejections answer in the JSON error shape.
//!
//! axum's own `Form`, `Path` and `Query` reject with a plain-text 4xx body.
//! These wrappers convert every rejection into [`Error::Validation`].

use crate::errors::Error;
use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{FormRejection, PathRejection, QueryRejection},
};

/// URL-encoded form body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(Error))]
pub struct Form<T>(pub T);

/// Typed path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);

/// Typed query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct Query<T>(pub T);

impl From<FormRejection> for Error {
    fn from(rejection: FormRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
        }
    }
}
