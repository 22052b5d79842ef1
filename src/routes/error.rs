use crate::error::app_error::ErrorBody;
use rocket::serde::json::Json;
use rocket::{Request, catch};

#[catch(400)]
pub fn bad_request(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::single("Bad request"))
}

#[catch(401)]
pub fn unauthorized(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::single("Unauthorized"))
}

#[catch(404)]
pub fn not_found(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::single("Not found"))
}

#[catch(413)]
pub fn payload_too_large(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::single("Payload too large"))
}

/// Reached only when the body is not valid JSON; field errors are answered by `AppError`.
#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::many(vec!["body: Malformed JSON".to_string()]))
}

#[catch(500)]
pub fn internal_error(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::single("Internal server error"))
}
