use crate::http::HttpError;
use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use junkan_api::{ApiError, ApiErrorCode, RouteAccess};
use junkan_model::{Profile, UserRole, UserStatus};
use serde_json::json;

#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub Profile);

#[derive(Debug, Clone)]
pub(crate) struct SessionToken(pub String);

const PUBLIC_EXACT: [&str; 6] = [
    "/",
    "/healthz",
    "/readyz",
    "/v1/version",
    "/v1/openapi.json",
    "/v1/invites/verify",
];

#[must_use]
pub(crate) fn route_access(path: &str) -> RouteAccess {
    if path == "/v1/auth/screening" {
        RouteAccess::Session
    } else if PUBLIC_EXACT.contains(&path)
        || path.starts_with("/v1/auth/")
        || path.starts_with("/media/")
    {
        RouteAccess::Public
    } else if path == "/v1/admin" || path.starts_with("/v1/admin/") {
        RouteAccess::Admin
    } else {
        RouteAccess::Member
    }
}

/// Session token from the cookie, else from `Authorization: Bearer`.
#[must_use]
pub(crate) fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string());
    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|v| v.trim().to_string())
        })
        .filter(|token| !token.is_empty())
}

/// Whether `profile` may use a route of the given access class.
pub(crate) fn check_access(access: RouteAccess, profile: Option<&Profile>) -> Result<(), ApiError> {
    if access == RouteAccess::Public {
        return Ok(());
    }
    let profile = profile.ok_or_else(ApiError::unauthenticated)?;
    match (access, profile.status) {
        (_, UserStatus::Suspended) => Err(ApiError::new(
            ApiErrorCode::AccountSuspended,
            "account is suspended",
            json!({}),
        )),
        (RouteAccess::Session, _) => Ok(()),
        (_, UserStatus::Pending) => Err(ApiError::new(
            ApiErrorCode::AccountPending,
            "account is awaiting approval",
            json!({}),
        )),
        (RouteAccess::Admin, UserStatus::Active) if profile.role != UserRole::Admin => {
            Err(ApiError::forbidden("admin role required"))
        }
        _ => Ok(()),
    }
}

/// Resolves the caller's session and enforces the access class of the path.
pub(crate) async fn session_gate_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let access = route_access(request.uri().path());
    let mut profile = None;
    if let Some(token) = session_token(request.headers(), &state.config.cookie_name) {
        let now = state.clock.now();
        let lookup = token.clone();
        match crate::http::blocking(&state, move |store| store.session_user(&lookup, now)).await {
            Ok(found) => profile = found,
            Err(err) => return err.into_response(),
        }
        request.extensions_mut().insert(SessionToken(token));
    }
    if let Err(err) = check_access(access, profile.as_ref()) {
        return HttpError(err).into_response();
    }
    if let Some(profile) = profile {
        tracing::Span::current().record("user_id", profile.id.as_str());
        request.extensions_mut().insert(CurrentUser(profile));
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use junkan_model::{parse_ts, MemberRank};

    fn profile(role: UserRole, status: UserStatus) -> Profile {
        let at = parse_ts("2026-03-01T00:00:00.000000Z").expect("ts");
        Profile {
            id: "u1".to_string(),
            member_id: "JK-00000001".to_string(),
            display_name: "Ito Ren".to_string(),
            email: "ren@example.com".to_string(),
            phone: None,
            bio: None,
            location: None,
            company: None,
            position: None,
            avatar_url: None,
            rank: MemberRank::Standard,
            role,
            status,
            screening_answer: None,
            invited_by: None,
            email_confirmed: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn paths_are_classified_by_prefix() {
        assert_eq!(route_access("/"), RouteAccess::Public);
        assert_eq!(route_access("/v1/auth/signin"), RouteAccess::Public);
        assert_eq!(route_access("/media/thumbnails/a.png"), RouteAccess::Public);
        assert_eq!(route_access("/v1/invites/verify"), RouteAccess::Public);
        assert_eq!(route_access("/v1/auth/screening"), RouteAccess::Session);
        assert_eq!(route_access("/v1/admin/users"), RouteAccess::Admin);
        assert_eq!(route_access("/v1/administrators"), RouteAccess::Member);
        assert_eq!(route_access("/v1/feed"), RouteAccess::Member);
    }

    #[test]
    fn documented_routes_match_the_gate() {
        for doc in junkan_api::ROUTES {
            let path = doc
                .path
                .replace("{id}", "x1")
                .replace("{bucket}", "thumbnails")
                .replace("{path}", "a.png");
            assert_eq!(route_access(&path), doc.access, "{} {}", doc.method, doc.path);
        }
    }

    #[test]
    fn gate_orders_status_before_role() {
        let code = |access, p: Option<&Profile>| check_access(access, p).err().map(|e| e.code);
        assert_eq!(code(RouteAccess::Member, None), Some(ApiErrorCode::Unauthenticated));
        let pending = profile(UserRole::Member, UserStatus::Pending);
        assert_eq!(code(RouteAccess::Session, Some(&pending)), None);
        assert_eq!(code(RouteAccess::Member, Some(&pending)), Some(ApiErrorCode::AccountPending));
        let suspended = profile(UserRole::Member, UserStatus::Suspended);
        assert_eq!(
            code(RouteAccess::Session, Some(&suspended)),
            Some(ApiErrorCode::AccountSuspended)
        );
        let member = profile(UserRole::Member, UserStatus::Active);
        assert_eq!(code(RouteAccess::Admin, Some(&member)), Some(ApiErrorCode::Forbidden));
        let admin = profile(UserRole::Admin, UserStatus::Active);
        assert_eq!(code(RouteAccess::Admin, Some(&admin)), None);
    }

    #[test]
    fn tokens_come_from_cookie_or_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; junkan_session=abc123"),
        );
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer zzz"));
        assert_eq!(session_token(&headers, "junkan_session").as_deref(), Some("abc123"));
        headers.remove(header::COOKIE);
        assert_eq!(session_token(&headers, "junkan_session").as_deref(), Some("zzz"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic zzz"));
        assert!(session_token(&headers, "junkan_session").is_none());
    }
}
