//! 준비 상태 점검 모델과 협력자 인터페이스.
//!
//! 오케스트레이터는 여기 정의된 트레이트만 바라봅니다. 실제 sqlx 구현은
//! beacon-data, 외부 도구 호출은 beacon-cli에 있고, 테스트에서는 모의
//! 구현으로 대체합니다.

use std::fmt;

use async_trait::async_trait;

use crate::config::DataSourceConfig;
use crate::error::Result;

/// 마이그레이션 이력 테이블 (v1 시절 러너가 기록하던 테이블)
pub const MIGRATIONS_TABLE: &str = "schema_migrations";
/// v1 → v2 전환일. 이 날짜 이전에 시작된 마이그레이션 행이 있으면 레거시 스키마.
pub const LEGACY_CUTOFF_DATE: &str = "2023-04-17";
/// v1 레거시 스키마 수동 마이그레이션 가이드
pub const LEGACY_MIGRATION_GUIDE_URL: &str = "https://beacon-analytics.dev/docs/migrate-v1-v2";

/// 단계별 점검 결과. 생성 즉시 상태 라인으로 출력됩니다.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// 단계 라벨
    pub label: String,
    /// 통과 여부
    pub passed: bool,
    /// 사람용 메시지
    pub message: String,
}

impl CheckResult {
    pub fn pass(label: &str, message: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(label: &str, message: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            passed: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "✅" } else { "❌" };
        write!(f, "  {} {}: {}", mark, self.label, self.message)
    }
}

/// 외부 마이그레이션 도구의 캡처된 출력
#[derive(Debug, Clone, Default)]
pub struct MigrationOutput {
    pub stdout: String,
    pub stderr: String,
    /// 종료 코드 (시그널로 종료된 경우 None)
    pub code: Option<i32>,
    pub success: bool,
}

/// 연결된 데이터 소스 하나에 대한 준비 상태 프로브
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    /// `SELECT version()` 결과 배너
    async fn server_version(&self) -> Result<String>;

    /// 전환일 이전에 시작된 마이그레이션 이력 행 수
    async fn legacy_migration_count(&self) -> Result<i64>;

    /// 연결 반환. 성공/실패와 무관하게 소스 점검이 끝나면 호출됩니다.
    async fn close(&self);
}

/// 데이터 소스별 범위 연결 생성기
#[async_trait]
pub trait ProbeConnector: Send + Sync {
    async fn connect(&self, source: &DataSourceConfig) -> Result<Box<dyn DatabaseProbe>>;
}

/// 외부 스키마 마이그레이션 도구 호출자.
///
/// 재시도 없음. 반복 적용의 멱등성은 외부 도구 책임입니다.
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    /// 검증된 연결 컨텍스트로 마이그레이션을 적용하고 출력을 캡처합니다.
    async fn apply(&self, source: &DataSourceConfig) -> Result<MigrationOutput>;
}
