//! 준비 상태 점검 에러 타입 정의.

use thiserror::Error;

use crate::version::EngineVersion;

/// 데이터베이스 준비 상태 점검 에러.
///
/// `Config`는 운영자가 환경변수를 고치면 재시도 가능하고, 나머지는 전부
/// 해당 실행을 중단시키는 치명적 에러입니다. 자동 재시도는 없습니다.
#[derive(Debug, Error)]
pub enum CheckError {
    /// 필수 환경변수 누락 (누락된 변수를 전부 모아 한 번에 보고)
    #[error("필수 환경변수 누락: {}", .missing.join(", "))]
    Config { missing: Vec<String> },

    /// 데이터베이스 연결/쿼리 실패
    #[error("데이터베이스 연결 실패: {0}")]
    Connectivity(#[from] sqlx::Error),

    /// `SELECT version()` 배너에서 버전을 추출하지 못함
    #[error("버전 문자열을 해석할 수 없습니다: {raw:?}")]
    UnparseableVersion { raw: String },

    /// 엔진 버전이 계열별 최소 지원 버전 미만
    #[error("{family} {actual} 은(는) 최소 지원 버전 {minimum} 미만입니다")]
    IncompatibleVersion {
        family: String,
        minimum: EngineVersion,
        actual: EngineVersion,
    },

    /// v1 레거시 스키마 감지. 수동 마이그레이션 전까지는 진행 불가.
    #[error("'{label}' 데이터베이스에 v1 레거시 스키마가 있습니다. 가이드를 따라 먼저 마이그레이션하세요: {guide}")]
    LegacySchema { label: String, guide: String },

    /// 외부 마이그레이션 도구가 0이 아닌 종료 코드로 종료
    #[error("마이그레이션 적용 실패 (종료 코드 {code:?})")]
    MigrationApply { code: Option<i32> },

    /// 외부 마이그레이션 도구 실행 자체가 실패
    #[error("마이그레이션 도구 실행 실패: {0}. sqlx-cli 설치 여부를 확인하세요")]
    MigrationTool(#[from] std::io::Error),

    /// 데이터 소스 라벨이 붙은 점검 실패 (최상위 경계에서 한 번 감쌈)
    #[error("데이터 소스 '{label}' 점검 실패: {error}")]
    DataSource {
        label: String,
        #[source]
        error: Box<CheckError>,
    },
}

impl CheckError {
    /// 데이터 소스 라벨로 감싸기.
    ///
    /// 이미 감싼 에러를 다시 감싸지 않습니다.
    pub fn for_source(self, label: &str) -> Self {
        match self {
            CheckError::DataSource { .. } => self,
            other => CheckError::DataSource {
                label: label.to_string(),
                error: Box::new(other),
            },
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CheckError>;
