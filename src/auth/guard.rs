//! Authentication and role policies.
//!
//! The policies are plain functions over headers, URI and stored claims;
//! [`require_auth`] and [`require_role`] adapt them to axum middleware so a
//! router can stack "authenticated" and "has one of these roles" layers.

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::warn;

use super::{
    claims::{AuthContext, Capability, Role},
    jwt::TokenService,
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bearer token from the `Authorization` header, else from `?token=`
/// (clients that cannot set headers, e.g. WebSocket upgrades).
pub fn bearer_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

pub fn authenticate(tokens: &TokenService, headers: &HeaderMap, uri: &Uri) -> AppResult<AuthContext> {
    let token = bearer_token(headers, uri).ok_or(AppError::MissingCredentials)?;
    let claims = tokens.validate(&token)?;
    Ok(AuthContext::from(claims))
}

/// Set of roles allowed through a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    allowed: Vec<Role>,
}

impl RolePolicy {
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: roles.into_iter().collect(),
        }
    }

    /// Every role whose capability table grants `capability`.
    pub fn capability(capability: Capability) -> Self {
        Self::any_of(Role::ALL.into_iter().filter(|role| role.can(capability)))
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    /// Must run after authentication: a missing context is an error, never a pass.
    pub fn check(&self, ctx: Option<&AuthContext>) -> AppResult<AuthContext> {
        let ctx = ctx.copied().ok_or(AppError::MissingRole)?;
        if !self.allows(ctx.role) {
            return Err(AppError::Forbidden);
        }
        Ok(ctx)
    }
}

/// Validates the caller's token and stores its [`AuthContext`] in the request extensions.
pub async fn require_auth(
    State(tokens): State<TokenService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = match authenticate(&tokens, req.headers(), req.uri()) {
        Ok(ctx) => ctx,
        Err(e) => {
            // path only: the query string may carry the token
            warn!(error = %e, path = %req.uri().path(), "authentication rejected");
            return Err(e);
        }
    };
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

pub async fn require_role(
    State(policy): State<RolePolicy>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Err(e) = policy.check(req.extensions().get::<AuthContext>()) {
        warn!(error = %e, path = %req.uri().path(), "role check rejected");
        return Err(e);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use time::Duration;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::extractors::AuthUser;

    fn tokens() -> TokenService {
        TokenService::new("guard-secret", Duration::hours(1)).unwrap()
    }

    async fn whoami(AuthUser(ctx): AuthUser) -> String {
        format!("{}:{}", ctx.user_id, ctx.role)
    }

    fn app(policy: Option<RolePolicy>) -> Router {
        let mut router = Router::new().route("/whoami", get(whoami));
        if let Some(policy) = policy {
            router = router.route_layer(from_fn_with_state(policy, require_role));
        }
        router.route_layer(from_fn_with_state(tokens(), require_auth))
    }

    async fn call(app: Router, uri: &str, bearer: Option<&str>) -> (StatusCode, String) {
        let mut req = HttpRequest::builder().uri(uri);
        if let Some(token) = bearer {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());
        let uri: Uri = "/chats?token=from-query".parse().unwrap();
        assert_eq!(bearer_token(&headers, &uri).as_deref(), Some("from-header"));
    }

    #[test]
    fn query_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        let uri: Uri = "/ws?room=1&token=from-query".parse().unwrap();
        assert_eq!(bearer_token(&headers, &uri).as_deref(), Some("from-query"));
    }

    #[test]
    fn nothing_means_missing_credentials() {
        let uri: Uri = "/chats?token=".parse().unwrap();
        assert_eq!(bearer_token(&HeaderMap::new(), &uri), None);
        let err = authenticate(&tokens(), &HeaderMap::new(), &uri).unwrap_err();
        assert!(matches!(err, AppError::MissingCredentials));
    }

    #[test]
    fn role_policy_without_context_is_missing_role() {
        let policy = RolePolicy::any_of([Role::Employer]);
        assert!(matches!(policy.check(None), Err(AppError::MissingRole)));
    }

    #[test]
    fn employer_policy_filters_roles() {
        let policy = RolePolicy::any_of([Role::Employer]);
        let seeker = AuthContext { user_id: 1, role: Role::JobSeeker };
        let employer = AuthContext { user_id: 2, role: Role::Employer };
        assert!(matches!(policy.check(Some(&seeker)), Err(AppError::Forbidden)));
        assert_eq!(policy.check(Some(&employer)).unwrap(), employer);
    }

    #[test]
    fn chat_capability_admits_both_roles() {
        let policy = RolePolicy::capability(Capability::Chat);
        assert!(policy.allows(Role::JobSeeker));
        assert!(policy.allows(Role::Employer));
        let posting = RolePolicy::capability(Capability::PostJobs);
        assert_eq!(posting, RolePolicy::any_of([Role::Employer]));
    }

    #[tokio::test]
    async fn missing_token_fails_before_role_check() {
        let (status, body) = call(app(Some(RolePolicy::any_of([Role::Employer]))), "/whoami", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("MISSING_TOKEN"));
    }

    #[tokio::test]
    async fn invalid_token_is_401() {
        let (status, body) = call(app(None), "/whoami", Some("not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("INVALID_TOKEN"));
    }

    #[tokio::test]
    async fn employer_route_rejects_job_seeker_and_admits_employer() {
        let policy = RolePolicy::any_of([Role::Employer]);

        let seeker = tokens().issue(5, Role::JobSeeker).unwrap();
        let (status, body) = call(app(Some(policy.clone())), "/whoami", Some(&seeker)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("FORBIDDEN_ROLE"));

        let employer = tokens().issue(9, Role::Employer).unwrap();
        let (status, body) = call(app(Some(policy)), "/whoami", Some(&employer)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "9:employer");
    }

    #[tokio::test]
    async fn query_token_authenticates() {
        let token = tokens().issue(3, Role::JobSeeker).unwrap();
        let (status, body) = call(app(None), &format!("/whoami?token={token}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "3:job_seeker");
    }
}
