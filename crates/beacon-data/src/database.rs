//! postgres/mysql 겸용 연결 래퍼.
//!
//! 연결 URL 스킴(`postgres://`, `mysql://`)에 따라 드라이버가 선택되는
//! `sqlx::AnyPool`을 감쌉니다. 풀 튜닝은 하지 않습니다. 점검은 순차
//! 단일 패스라 연결 1개면 충분합니다.

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::debug;

/// 연결 풀 설정
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 연결 URL (postgres:// 또는 mysql://)
    pub url: String,
    /// 최대 연결 수
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// 준비 상태 점검용 설정
    pub fn for_check(url: String) -> Self {
        Self {
            url,
            max_connections: 1,
        }
    }
}

/// Any 풀 래퍼
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// 연결 풀 생성
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        // Any 드라이버 등록 (중복 호출은 무해)
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        debug!("데이터베이스 연결 완료");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// 풀 반환. 데이터 소스 하나의 점검이 끝날 때마다 호출됩니다.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
