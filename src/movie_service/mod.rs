//! # 电影资源服务
//!
//! 网关后面的资源服务：内存中的电影增删改查。只检查 `Authorization` 头的
//! `Bearer <token>` 形状，所有真正的凭据验证都由网关负责。

pub mod handlers;
pub mod server;
pub mod store;

pub use handlers::MovieServiceError;
pub use server::{MovieServer, movie_router};
pub use store::{Movie, MovieStore};
