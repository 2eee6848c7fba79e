use jsonwebtoken::{decode, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Claims of tokens issued by the account service. Only verified here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub(crate) fn sign(user_id: Uuid, token_type: TokenType, ttl: Duration, secret: &str) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: "someone@example.com".into(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            token_type,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_round_trips_subject() {
        let user = Uuid::new_v4();
        let token = sign(user, TokenType::Access, Duration::minutes(15), "secret");
        let data = verify_token(&token, "secret").unwrap();
        assert_eq!(data.claims.sub, user);
        assert_eq!(data.claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_wrong_secret_and_expired_tokens_are_rejected() {
        let user = Uuid::new_v4();
        let token = sign(user, TokenType::Access, Duration::minutes(15), "secret");
        assert!(matches!(verify_token(&token, "other"), Err(AppError::Unauthorized)));

        let expired = sign(user, TokenType::Access, Duration::hours(-2), "secret");
        assert!(matches!(verify_token(&expired, "secret"), Err(AppError::Unauthorized)));
    }
}
