use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const STAFF_ROLES: [&str; 2] = ["admin", "hr"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum AuthFailure {
    MissingAuthorization,
    BadAuthorization,
    UnsupportedScheme,
    InvalidToken,
    Forbidden,
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AuthFailure::MissingAuthorization => (StatusCode::UNAUTHORIZED, "missing_authorization"),
            AuthFailure::BadAuthorization => (StatusCode::UNAUTHORIZED, "bad_authorization"),
            AuthFailure::UnsupportedScheme => (StatusCode::UNAUTHORIZED, "unsupported_scheme"),
            AuthFailure::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AuthFailure::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
        };
        (status, Json(json!({ "error": code }))).into_response()
    }
}

fn verify_bearer(req: &Request, secret: &str, allowed_roles: &[&str]) -> Result<Claims, AuthFailure> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthFailure::MissingAuthorization)?;
    let value = header.to_str().map_err(|_| AuthFailure::BadAuthorization)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthFailure::UnsupportedScheme)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AuthFailure::InvalidToken)?;

    let role = data.claims.role.clone().unwrap_or_default();
    if !allowed_roles.iter().any(|r| r.eq_ignore_ascii_case(&role)) {
        return Err(AuthFailure::Forbidden);
    }
    Ok(data.claims)
}

/// Admin routes: a valid HS256 bearer token with role `hr` or `admin`.
pub async fn require_hr_or_admin(mut req: Request, next: Next) -> Response {
    let config = crate::config::get_config();
    match verify_bearer(&req, &config.jwt_secret, &STAFF_ROLES) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(failure) => {
            tracing::debug!(?failure, path = %req.uri().path(), "admin request rejected");
            failure.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";

    fn token(role: Option<&str>, exp_offset: i64) -> String {
        let claims = Claims {
            sub: "user-1".into(),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
            role: role.map(str::to_string),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn request(auth: Option<String>) -> Request {
        let mut builder = Request::builder().uri("/api/admin/tests");
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn accepts_staff_roles_case_insensitively() {
        let req = request(Some(format!("Bearer {}", token(Some("HR"), 600))));
        let claims = verify_bearer(&req, SECRET, &STAFF_ROLES).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn rejects_missing_malformed_and_foreign_tokens() {
        assert_eq!(
            verify_bearer(&request(None), SECRET, &STAFF_ROLES).unwrap_err(),
            AuthFailure::MissingAuthorization
        );
        assert_eq!(
            verify_bearer(&request(Some("Basic abc".into())), SECRET, &STAFF_ROLES).unwrap_err(),
            AuthFailure::UnsupportedScheme
        );
        assert_eq!(
            verify_bearer(&request(Some("Bearer nonsense".into())), SECRET, &STAFF_ROLES)
                .unwrap_err(),
            AuthFailure::InvalidToken
        );
        let expired = format!("Bearer {}", token(Some("admin"), -3600));
        assert_eq!(
            verify_bearer(&request(Some(expired)), SECRET, &STAFF_ROLES).unwrap_err(),
            AuthFailure::InvalidToken
        );
    }

    #[test]
    fn rejects_non_staff_roles() {
        let employee = format!("Bearer {}", token(Some("employee"), 600));
        assert_eq!(
            verify_bearer(&request(Some(employee)), SECRET, &STAFF_ROLES).unwrap_err(),
            AuthFailure::Forbidden
        );
        let no_role = format!("Bearer {}", token(None, 600));
        assert_eq!(
            verify_bearer(&request(Some(no_role)), SECRET, &STAFF_ROLES).unwrap_err(),
            AuthFailure::Forbidden
        );
    }
}
