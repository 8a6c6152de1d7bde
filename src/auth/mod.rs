//! # 认证核心模块
//!
//! 授权码交换、令牌缓存、本地令牌签发与凭据验证。网关层只通过这里导出的组件访问认证逻辑。

pub mod credentials;
pub mod exchange;
pub mod header_parser;
pub mod jwt;
pub mod provider;
pub mod token_cache;
pub mod types;
pub mod verifier;

pub use exchange::{AuthorizationCodeExchanger, ClientCredentials, build_authorization_url};
pub use header_parser::AuthHeaderParser;
pub use jwt::JwtManager;
pub use provider::{HttpIdentityProvider, IdentityProvider, TokenRequest};
pub use token_cache::TokenCache;
pub use types::{AuthorizationUrl, IssuedToken, Principal, SignedTokenClaims, TokenRecord};
pub use verifier::{CredentialVerifier, DelegatedVerifier, LocalVerifier, build_verifier};
