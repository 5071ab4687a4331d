//! Authorization endpoint handlers.
//!
//! ```text
//! GET /authorize
//!   ├─► no session      → 303 login page (return_to = original request)
//!   ├─► consent needed  → 303 consent page
//!   └─► otherwise       → 303 redirect_uri?code=..&state=..
//!
//! POST /authorize (consent approved)
//!   └─► 303 redirect_uri?code=..&state=..
//! ```

use std::sync::Arc;

use axum::Form;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use super::{error_response, malformed_request};
use crate::oauth::authorize::AuthenticationRequest;
use crate::oauth::service::AuthorizeOutcome;
use crate::provider::OidcProvider;

/// `GET /authorize`.
pub async fn authorize_handler(
    State(provider): State<Arc<OidcProvider>>,
    query: Result<Query<AuthenticationRequest>, QueryRejection>,
    jar: CookieJar,
) -> Response {
    let request = match query {
        Ok(Query(request)) => request,
        Err(rejection) => return error_response(&malformed_request(rejection), None),
    };

    let session_id = provider.session_cookie().session_id(&jar);
    let service = provider.authorization();

    let outcome = service.authorize(&request, session_id.as_deref()).await;
    let redirect_url = match outcome {
        Ok(AuthorizeOutcome::Login { redirect_url })
        | Ok(AuthorizeOutcome::Redirect { redirect_url }) => redirect_url,
        Ok(AuthorizeOutcome::Consent { request, user_id }) => {
            tracing::debug!(
                client_id = %request.client_id,
                user_id = %user_id,
                "Consent required"
            );
            match service.consent_redirect_url(&request) {
                Ok(url) => url,
                Err(e) => return error_response(&e, request.state.as_deref()),
            }
        }
        Err(e) => return error_response(&e, request.state.as_deref()),
    };

    Redirect::to(&redirect_url).into_response()
}

/// `POST /authorize`: the user approved the consent page.
///
/// The form carries the original authentication request parameters.
pub async fn approve_handler(
    State(provider): State<Arc<OidcProvider>>,
    jar: CookieJar,
    form: Result<Form<AuthenticationRequest>, FormRejection>,
) -> Response {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => return error_response(&malformed_request(rejection), None),
    };

    let session_id = provider.session_cookie().session_id(&jar);

    match provider
        .authorization()
        .approve(&request, session_id.as_deref())
        .await
    {
        Ok(redirect_url) => Redirect::to(&redirect_url).into_response(),
        Err(e) => error_response(&e, request.state.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::FromRequest;
    use axum::http::{StatusCode, Uri};
    use axum_extra::extract::cookie::Cookie;

    use super::*;
    use crate::http::test_support::{REDIRECT_URI, json_body, location, post, provider};

    fn request() -> AuthenticationRequest {
        AuthenticationRequest {
            client_id: "c1".to_string(),
            scope: "openid".to_string(),
            response_type: "code".to_string(),
            redirect_uri: REDIRECT_URI.to_string(),
            state: Some("xyz".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_authorize_without_session_redirects_to_login() {
        let provider = provider();
        let response =
            authorize_handler(State(provider), Ok(Query(request())), CookieJar::new()).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/login?return_to="));
    }

    #[tokio::test]
    async fn test_authorize_with_session_issues_code() {
        let provider = provider();
        let session = provider.sessions().create("u1");
        let jar = CookieJar::new().add(Cookie::new("sid", session.session_id.to_string()));

        let response =
            authorize_handler(State(provider.clone()), Ok(Query(request())), jar).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = location(&response);
        assert!(location.starts_with(REDIRECT_URI));
        assert!(location.contains("code="));
        assert!(location.ends_with("state=xyz"));
        assert_eq!(provider.codes().len(), 1);
    }

    #[tokio::test]
    async fn test_authorize_consent_redirect() {
        let provider = provider();
        let session = provider.sessions().create("u1");
        let jar = CookieJar::new().add(Cookie::new("sid", session.session_id.to_string()));

        let mut req = request();
        req.prompt = Some("consent".to_string());
        let response = authorize_handler(State(provider.clone()), Ok(Query(req)), jar).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/consent?return_to="));
        assert!(provider.codes().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_none_without_session() {
        let mut req = request();
        req.prompt = Some("none".to_string());

        let response =
            authorize_handler(State(provider()), Ok(Query(req)), CookieJar::new()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "login_required");
        assert_eq!(body["state"], "xyz");
    }

    #[tokio::test]
    async fn test_unregistered_redirect_uri() {
        let mut req = request();
        req.redirect_uri = "https://evil.example.com/cb".to_string();

        let response =
            authorize_handler(State(provider()), Ok(Query(req)), CookieJar::new()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("location").is_none());
        let body = json_body(response).await;
        assert_eq!(body["error"], "access_denied");
    }

    #[tokio::test]
    async fn test_approve_issues_code() {
        let provider = provider();
        let session = provider.sessions().create("u1");
        let jar = CookieJar::new().add(Cookie::new("sid", session.session_id.to_string()));

        let response = approve_handler(State(provider.clone()), jar, Ok(Form(request()))).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).contains("code="));
        assert_eq!(provider.codes().len(), 1);
    }

    #[tokio::test]
    async fn test_approve_without_session() {
        let response =
            approve_handler(State(provider()), CookieJar::new(), Ok(Form(request()))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "login_required");
    }

    #[tokio::test]
    async fn test_malformed_query_is_invalid_request() {
        let uri: Uri = "/authorize?client_id=c1&client_id=c2&response_type=code"
            .parse()
            .unwrap();
        let query = Query::<AuthenticationRequest>::try_from_uri(&uri);
        assert!(query.is_err());

        let response = authorize_handler(State(provider()), query, CookieJar::new()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("location").is_none());
        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_approve_with_non_form_body() {
        let provider = provider();
        let session = provider.sessions().create("u1");
        let jar = CookieJar::new().add(Cookie::new("sid", session.session_id.to_string()));

        let request = post("application/json", r#"{"client_id":"c1"}"#);
        let form = Form::<AuthenticationRequest>::from_request(request, &()).await;
        assert!(form.is_err());

        let response = approve_handler(State(provider.clone()), jar, form).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid_request");
        assert!(provider.codes().is_empty());
    }
}
