//! # 电影内存存储

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// 电影实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
}

/// 按插入顺序保存电影，进程重启后清空
#[derive(Debug, Default)]
pub struct MovieStore {
    movies: RwLock<Vec<Movie>>,
}

impl MovieStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部电影
    pub async fn list(&self) -> Vec<Movie> {
        self.movies.read().await.clone()
    }

    /// 追加一部电影，不检查 id 是否重复
    pub async fn create(&self, movie: Movie) -> Movie {
        self.movies.write().await.push(movie.clone());
        movie
    }

    /// 用请求体整体替换第一条匹配 `id` 的记录
    pub async fn update(&self, id: i64, movie: Movie) -> Option<Movie> {
        let mut movies = self.movies.write().await;
        let slot = movies.iter_mut().find(|m| m.id == id)?;
        *slot = movie.clone();
        Some(movie)
    }

    /// 删除第一条匹配 `id` 的记录
    pub async fn delete(&self, id: i64) -> bool {
        let mut movies = self.movies.write().await;
        match movies.iter().position(|m| m.id == id) {
            Some(index) => {
                movies.remove(index);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.movies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
