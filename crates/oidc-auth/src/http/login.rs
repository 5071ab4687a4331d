//! Login and logout handlers.
//!
//! The login page posts `username`, `password` and the opaque `return_to`
//! it received from the authorize endpoint. On success the session cookie
//! is set and the user agent resumes the original authorize request.

use std::sync::Arc;

use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::{error_response, malformed_request};
use crate::AuthResult;
use crate::oauth::authorize::decode_return_target;
use crate::provider::OidcProvider;

/// Login form body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,

    /// Opaque authorize request to resume.
    #[serde(default)]
    pub return_to: Option<String>,
}

/// `POST /login`.
pub async fn login_handler(
    State(provider): State<Arc<OidcProvider>>,
    jar: CookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return error_response(&malformed_request(rejection), None),
    };

    // Reject a malformed return target before any session is opened
    let location = match resume_location(&provider, form.return_to.as_deref()) {
        Ok(location) => location,
        Err(e) => return error_response(&e, None),
    };

    match provider.login().login(&form.username, &form.password).await {
        Ok(session) => {
            let cookie = provider
                .session_cookie()
                .build(&session.session_id.to_string());
            (jar.add(cookie), Redirect::to(&location)).into_response()
        }
        Err(e) => error_response(&e, None),
    }
}

/// `POST /logout`.
pub async fn logout_handler(
    State(provider): State<Arc<OidcProvider>>,
    jar: CookieJar,
) -> Response {
    let cookies = provider.session_cookie();
    if let Some(session_id) = cookies.session_id(&jar) {
        provider.login().logout(&session_id);
    }

    (jar.add(cookies.removal()), Redirect::to("/")).into_response()
}

fn resume_location(provider: &OidcProvider, return_to: Option<&str>) -> AuthResult<String> {
    let Some(target) = return_to.filter(|t| !t.is_empty()) else {
        return Ok("/".to_string());
    };

    let query = decode_return_target(target)?.to_query_string()?;
    let authorize_url = &provider.config().endpoints.authorize_url;
    let separator = if authorize_url.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}{}", authorize_url, separator, query))
}
