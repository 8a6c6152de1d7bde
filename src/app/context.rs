//! 应用上下文（DI 容器）
//!
//! 启动时根据配置一次性组装所有共享组件，测试中可以注入替身身份提供商。

use std::sync::Arc;
use std::time::Instant;

use crate::auth::{
    AuthorizationCodeExchanger, ClientCredentials, CredentialVerifier, HttpIdentityProvider,
    IdentityProvider, JwtManager, TokenCache, build_verifier,
};
use crate::config::{AppConfig, VerificationMode};
use crate::error::{GatewayError, Result};
use crate::gateway::resource_client::ResourceClient;
use crate::movie_service::MovieStore;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    /// 授权码到交换结果的缓存，进程内唯一
    pub token_cache: TokenCache,
    /// 委托模式下的授权码交换器
    pub exchanger: Option<AuthorizationCodeExchanger>,
    /// 本地模式下的令牌签发/验证器
    pub jwt: Option<Arc<JwtManager>>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub resource_client: ResourceClient,
    /// 内嵌电影服务的存储
    pub movie_store: Arc<MovieStore>,
    pub started_at: Instant,
}

impl AppContext {
    /// 使用真实 HTTP 身份提供商组装
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        let provider: Arc<dyn IdentityProvider> =
            Arc::new(HttpIdentityProvider::new(&config.provider)?);
        Self::with_provider(config, provider)
    }

    /// 使用指定的身份提供商组装
    pub fn with_provider(
        config: Arc<AppConfig>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let mode = config.auth.verification_mode;

        let (exchanger, jwt) = match mode {
            VerificationMode::Delegated => (
                Some(AuthorizationCodeExchanger::new(
                    Arc::clone(&provider),
                    ClientCredentials::from(&config.provider),
                )),
                None,
            ),
            VerificationMode::Local => (None, Some(Arc::new(JwtManager::new(&config.local_auth)?))),
        };

        let verifier = build_verifier(mode, Some(provider), jwt.clone())
            .map_err(|e| GatewayError::config(e.to_string()))?;

        let resource_client =
            ResourceClient::new(config.movie_service.base_url.clone(), config.upstream_timeout())?;

        Ok(Self {
            config,
            token_cache: TokenCache::new(),
            exchanger,
            jwt,
            verifier,
            resource_client,
            movie_store: Arc::new(MovieStore::new()),
            started_at: Instant::now(),
        })
    }

    #[must_use]
    pub fn verification_mode(&self) -> VerificationMode {
        self.config.auth.verification_mode
    }
}
