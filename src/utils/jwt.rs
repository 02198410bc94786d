use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::utils::error::{ApiError, ApiResult};

/// Claims embedded in a session token issued at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub identifier: String,
    pub exp: usize,
    pub iat: usize,
}

/// Issues and verifies the bearer tokens handed out by `/v1/auth/login`.
pub struct JwtUtil {
    secret: String,
    expires_in_secs: i64,
}

impl JwtUtil {
    pub fn new(secret: impl Into<String>, expires_in: impl AsRef<str>) -> Self {
        let expires_in_secs = parse_duration_secs(expires_in.as_ref()).unwrap_or(86_400);
        Self { secret: secret.into(), expires_in_secs }
    }

    pub fn generate_token(&self, user_id: &str, identifier: &str) -> ApiResult<String> {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            identifier: identifier.to_string(),
            iat: now,
            exp: now + self.expires_in_secs as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| ApiError::internal_error(format!("failed to sign token: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::unauthorized())
    }
}

fn parse_duration_secs(input: &str) -> Option<i64> {
    if let Ok(v) = input.parse::<i64>() {
        return Some(v);
    }
    let s = input.trim().to_lowercase();
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    let unit = &s[digits.len()..];
    let n: i64 = digits.parse().ok()?;
    match unit {
        "s" | "sec" | "secs" => Some(n),
        "m" | "min" | "mins" => Some(n * 60),
        "h" | "hr" | "hours" => Some(n * 3600),
        "d" | "day" | "days" => Some(n * 86_400),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_token() {
        let util = JwtUtil::new("test-secret", "24h");
        let token = util.generate_token("user-1", "user@example.com").unwrap();
        let claims = util.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let a = JwtUtil::new("secret-a", "24h");
        let b = JwtUtil::new("secret-b", "24h");
        let token = a.generate_token("user-1", "user@example.com").unwrap();
        assert!(b.verify_token(&token).is_err());
    }
}
