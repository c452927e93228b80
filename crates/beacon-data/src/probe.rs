//! 준비 상태 프로브의 sqlx 구현.
//!
//! 버전 배너 조회와 레거시(v1) 마이그레이션 이력 조회를 담당합니다.
//! 두 쿼리 모두 postgres/mysql 공통 SQL이라 Any 풀 하나로 처리합니다.

use async_trait::async_trait;
use tracing::debug;

use beacon_core::check::{DatabaseProbe, ProbeConnector, LEGACY_CUTOFF_DATE, MIGRATIONS_TABLE};
use beacon_core::config::DataSourceConfig;
use beacon_core::error::Result;

use crate::database::{Database, DatabaseConfig};

/// 연결된 데이터 소스 하나의 프로브
pub struct SqlxProbe {
    db: Database,
}

impl SqlxProbe {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DatabaseProbe for SqlxProbe {
    async fn server_version(&self) -> Result<String> {
        let banner: String = sqlx::query_scalar("SELECT version()")
            .fetch_one(self.db.pool())
            .await?;
        Ok(banner)
    }

    async fn legacy_migration_count(&self) -> Result<i64> {
        // 전환일은 고정 상수라 바인드 없이 리터럴로 비교
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE started_at < '{}'",
            MIGRATIONS_TABLE, LEGACY_CUTOFF_DATE
        );

        let count: std::result::Result<i64, sqlx::Error> =
            sqlx::query_scalar(&sql).fetch_one(self.db.pool()).await;
        match count {
            Ok(n) => Ok(n),
            // 이력 테이블 자체가 없으면 신규 DB이거나 v2 이후 생성 DB. 레거시 아님.
            Err(sqlx::Error::Database(e)) => {
                debug!(error = %e, "마이그레이션 이력 테이블 조회 실패, 레거시 0건으로 간주");
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn close(&self) {
        self.db.close().await;
    }
}

/// 데이터 소스별 범위 연결 생성기 (sqlx 구현)
#[derive(Debug, Default)]
pub struct SqlxConnector;

impl SqlxConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProbeConnector for SqlxConnector {
    async fn connect(&self, source: &DataSourceConfig) -> Result<Box<dyn DatabaseProbe>> {
        let db = Database::connect(&DatabaseConfig::for_check(source.url.clone())).await?;
        Ok(Box::new(SqlxProbe::new(db)))
    }
}
