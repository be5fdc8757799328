use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// A JSON request body. Rejections become `validation_error` responses.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// A path parameter. Rejections become `validation_error` responses.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);
