use crate::error_mapping::API_ERROR_SCHEMA_REF;
use crate::ApiErrorCode;
use serde_json::{json, Map, Value};

/// Who may call a route once the access gate has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    /// Signed in, any status; used by the screening step.
    Session,
    Member,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
    pub access: RouteAccess,
}

const fn route(
    method: &'static str,
    path: &'static str,
    summary: &'static str,
    access: RouteAccess,
) -> RouteDoc {
    RouteDoc {
        method,
        path,
        summary,
        access,
    }
}

use RouteAccess::{Admin, Member, Public, Session};

pub const ROUTES: &[RouteDoc] = &[
    route("GET", "/healthz", "liveness", Public),
    route("GET", "/readyz", "readiness (database ping)", Public),
    route("GET", "/v1/version", "build identity", Public),
    route("GET", "/v1/openapi.json", "this document", Public),
    route("POST", "/v1/auth/signup", "register with an invite code", Public),
    route("POST", "/v1/auth/signin", "start a session", Public),
    route("POST", "/v1/auth/signout", "end the current session", Public),
    route("GET", "/v1/auth/confirm", "confirm an e-mail address", Public),
    route("POST", "/v1/auth/confirm/resend", "send a fresh confirmation link", Public),
    route("POST", "/v1/auth/password-reset/request", "mail a reset link", Public),
    route("POST", "/v1/auth/password-reset", "set a new password from a reset link", Public),
    route("POST", "/v1/auth/screening", "submit the screening answer", Session),
    route("GET", "/v1/invites/verify", "check an invite code and count the click", Public),
    route("GET", "/v1/me/invite-code", "newest unused invite code", Member),
    route("POST", "/v1/me/invite-code", "mint an invite code", Member),
    route("GET", "/v1/me/invite-slots", "invite slot balance", Member),
    route("GET", "/v1/me/unlock-conditions", "bonus slot conditions", Member),
    route("GET", "/v1/me/referrals", "referral statistics", Member),
    route("GET", "/v1/me/profile", "own profile", Member),
    route("PUT", "/v1/me/profile", "update own profile", Member),
    route("GET", "/v1/me/notifications", "notification preferences", Member),
    route("PUT", "/v1/me/notifications", "update notification preferences", Member),
    route("POST", "/v1/me/password", "change password", Member),
    route("GET", "/v1/me/logins", "recent sign-ins", Member),
    route("POST", "/v1/me/feedback", "send feedback", Member),
    route("GET", "/v1/me/likes", "liked contents", Member),
    route("GET", "/v1/me/bookmarks", "bookmarked contents", Member),
    route("GET", "/v1/feed", "live contents", Member),
    route("GET", "/v1/contents/{id}", "content detail (records a view)", Member),
    route("POST", "/v1/contents/{id}/like", "toggle like", Member),
    route("POST", "/v1/contents/{id}/bookmark", "toggle bookmark", Member),
    route("POST", "/v1/contents/{id}/share", "record a share", Member),
    route("GET", "/v1/recommended", "most engaged live contents", Member),
    route("GET", "/v1/broadcasts", "broadcasts addressed to the member", Member),
    route("GET", "/v1/rewards", "reward milestones and claims", Member),
    route("POST", "/v1/rewards/{id}/claim", "claim an achieved reward", Member),
    route("GET", "/v1/admin/contents", "list contents", Admin),
    route("POST", "/v1/admin/contents", "create content", Admin),
    route("PUT", "/v1/admin/contents/{id}", "update content", Admin),
    route("DELETE", "/v1/admin/contents/{id}", "delete content", Admin),
    route("PUT", "/v1/admin/contents/{id}/thumbnail", "set content thumbnail", Admin),
    route("POST", "/v1/admin/media/thumbnail", "upload a thumbnail image", Admin),
    route("POST", "/v1/admin/media/video", "upload a video", Admin),
    route("GET", "/v1/admin/users", "members with referral figures", Admin),
    route("PUT", "/v1/admin/users/{id}/status", "approve or suspend a member", Admin),
    route("PUT", "/v1/admin/users/{id}/rank", "change a member's rank", Admin),
    route("GET", "/v1/admin/dashboard", "growth statistics", Admin),
    route("GET", "/v1/admin/rewards", "reward tiers and achievers", Admin),
    route("PUT", "/v1/admin/rewards/{id}", "edit a reward", Admin),
    route("POST", "/v1/admin/reward-claims/{id}/grant", "grant a reward claim", Admin),
    route("GET", "/v1/admin/broadcasts", "sent broadcasts", Admin),
    route("POST", "/v1/admin/broadcasts", "send a broadcast", Admin),
    route("GET", "/media/{bucket}/{path}", "stored media object", Public),
];

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {"application/json": {"schema": {"$ref": API_ERROR_SCHEMA_REF}}}
    })
}

fn operation(doc: &RouteDoc) -> Value {
    let mut responses = Map::new();
    responses.insert("200".to_string(), json!({"description": "ok"}));
    if matches!(doc.method, "POST" | "PUT") {
        responses.insert("400".to_string(), error_response("malformed request"));
        responses.insert("422".to_string(), error_response("validation failed"));
    }
    if doc.path.contains('{') {
        responses.insert("404".to_string(), error_response("not found"));
    }
    if doc.access != Public {
        responses.insert("401".to_string(), error_response("sign in required"));
        responses.insert("403".to_string(), error_response("access denied"));
    }
    if doc.path == "/v1/auth/signin" {
        responses.insert("429".to_string(), error_response("rate limited"));
    }
    if doc.path.starts_with("/v1/admin/media/") {
        responses.insert("413".to_string(), error_response("payload too large"));
        responses.insert("415".to_string(), error_response("unsupported media type"));
    }
    let mut op = json!({
        "summary": doc.summary,
        "responses": Value::Object(responses),
    });
    if doc.access != Public {
        op["security"] = json!([{"sessionCookie": []}, {"bearerToken": []}]);
    }
    op
}

#[must_use]
pub fn openapi_v1_spec() -> Value {
    let mut paths = Map::new();
    for doc in ROUTES {
        let entry = paths
            .entry(doc.path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        entry[doc.method.to_ascii_lowercase()] = operation(doc);
    }
    let codes: Vec<&str> = ApiErrorCode::ALL.iter().map(|c| c.as_str()).collect();
    json!({
      "openapi": "3.0.3",
      "info": {"title": "junkan API", "version": "v1"},
      "paths": Value::Object(paths),
      "components": {
        "securitySchemes": {
          "sessionCookie": {"type": "apiKey", "in": "cookie", "name": "junkan_session"},
          "bearerToken": {"type": "http", "scheme": "bearer"}
        },
        "schemas": {
          "ApiErrorCode": {"type": "string", "enum": codes},
          "ApiError": {
            "type": "object",
            "required": ["error"],
            "additionalProperties": false,
            "properties": {
              "error": {
                "type": "object",
                "required": ["code", "message", "details", "request_id"],
                "additionalProperties": false,
                "properties": {
                  "code": {"$ref": "#/components/schemas/ApiErrorCode"},
                  "message": {"type": "string"},
                  "details": {"type": "object"},
                  "request_id": {"type": "string"}
                }
              }
            }
          }
        }
      }
    })
}
