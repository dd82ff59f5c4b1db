use crate::error::{AppError, AppResult};
use crate::models::{AuthContext, Role};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user_id
    pub tenant_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String, // "access"
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        AuthContext {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            company_id: claims.company_id,
            role: claims.role,
        }
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
        }
    }

    pub fn generate_access_token(&self, ctx: &AuthContext) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expires_in);

        let claims = Claims {
            sub: ctx.user_id,
            tenant_id: ctx.tenant_id,
            company_id: ctx.company_id,
            role: ctx.role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: "access".to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<AuthContext> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "access" {
            return Err(AppError::AuthError("Invalid access token type".to_string()));
        }

        Ok(claims.into())
    }

    pub fn get_access_token_expires_in(&self) -> i64 {
        self.access_token_expires_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            role: Role::Cashier,
        }
    }

    #[test]
    fn test_access_token_carries_scope() {
        let service = JwtService::new("secret", 3600);
        let ctx = ctx();
        let token = service.generate_access_token(&ctx).unwrap();
        let decoded = service.verify_access_token(&token).unwrap();
        assert_eq!(decoded, ctx);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtService::new("secret", 3600)
            .generate_access_token(&ctx())
            .unwrap();
        let other = JwtService::new("other-secret", 3600);
        assert!(matches!(
            other.verify_access_token(&token),
            Err(AppError::JwtError(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // 默认 leeway 为 60 秒
        let service = JwtService::new("secret", -3600);
        let token = service.generate_access_token(&ctx()).unwrap();
        assert!(service.verify_access_token(&token).is_err());
    }
}
