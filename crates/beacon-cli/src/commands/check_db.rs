//! 배포 전 데이터베이스 준비 상태 점검.
//!
//! 고정 순서: 환경변수 검증 → 데이터 소스별로 연결 → 버전 게이트 →
//! 레거시(v1) 스키마 감지 → 마이그레이션 적용.
//!
//! 한 데이터 소스라도 실패하면 전체 실행을 중단합니다. 소스 간 부분
//! 마이그레이션을 만들지 않기 위한 동작이라 이후 소스는 점검하지 않습니다.

use tracing::info;

use beacon_core::check::{
    CheckResult, DatabaseProbe, MigrationRunner, ProbeConnector, LEGACY_MIGRATION_GUIDE_URL,
};
use beacon_core::config::{self, CheckConfig, DataSourceConfig};
use beacon_core::error::{CheckError, Result};
use beacon_core::version::{check_version, database_family, minimum_version};
use beacon_data::SqlxConnector;

use crate::commands::migrate::SqlxCliRunner;

/// check-db 진입점. 실제 협력자(sqlx 프로브, sqlx CLI 러너)를 묶어 실행합니다.
pub async fn run(migrations_dir: &str) -> anyhow::Result<()> {
    // 탈출구는 설정 검증보다 먼저 평가 (다른 환경 상태와 무관하게 동작)
    if config::skip_requested() {
        println!("⏭️  SKIP_DB_CHECK 설정됨: 데이터베이스 점검을 생략합니다.");
        return Ok(());
    }

    let config = match CheckConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            println!("❌ {}", e);
            println!("   필수 환경변수: {}", config::REQUIRED_VARS.join(", "));
            return Err(e.into());
        }
    };

    let connector = SqlxConnector::new();
    let runner = SqlxCliRunner::new(migrations_dir);
    run_check(&config, &connector, &runner).await?;
    Ok(())
}

/// 점검 시퀀스 본체.
///
/// 협력자는 주입받으므로 테스트에서 모의 구현으로 대체할 수 있습니다.
/// 각 단계의 성공/실패는 즉시 상태 라인으로 출력되고, 첫 실패는 데이터
/// 소스 라벨을 붙인 에러 하나로 전파됩니다.
pub async fn run_check(
    config: &CheckConfig,
    connector: &dyn ProbeConnector,
    runner: &dyn MigrationRunner,
) -> Result<Vec<CheckResult>> {
    println!(
        "\n🔍 데이터베이스 준비 상태 점검 시작 ({}개 데이터 소스)\n",
        config.data_sources.len()
    );

    let mut results = Vec::new();

    for source in &config.data_sources {
        println!("📦 {}", source.name);

        let probe = match connector.connect(source).await {
            Ok(p) => {
                emit(
                    &mut results,
                    CheckResult::pass("연결", config::mask_database_url(&source.url)),
                );
                p
            }
            Err(e) => {
                emit_fail(&mut results, "연결", &e);
                return Err(e.for_source(&source.name));
            }
        };

        // 연결은 성공/실패와 무관하게 소스 점검이 끝나면 반환
        let outcome = check_source(source, probe.as_ref(), runner, &mut results).await;
        probe.close().await;

        if let Err(e) = outcome {
            return Err(e.for_source(&source.name));
        }
        println!();
    }

    info!("데이터베이스 준비 상태 점검 통과");
    println!("✅ 모든 데이터 소스 점검 통과");
    Ok(results)
}

/// 연결된 데이터 소스 하나에 대한 버전 → 레거시 → 마이그레이션 시퀀스
async fn check_source(
    source: &DataSourceConfig,
    probe: &dyn DatabaseProbe,
    runner: &dyn MigrationRunner,
    results: &mut Vec<CheckResult>,
) -> Result<()> {
    // 1. 버전 게이트
    let family = database_family(&source.url);
    let banner = match probe.server_version().await {
        Ok(b) => b,
        Err(e) => {
            emit_fail(results, "버전", &e);
            return Err(e);
        }
    };
    match check_version(&family, &banner) {
        Ok(version) => emit(
            results,
            CheckResult::pass(
                "버전",
                format!("{} {} (최소 {})", family, version, minimum_version(&family)),
            ),
        ),
        Err(e) => {
            emit_fail(results, "버전", &e);
            return Err(e);
        }
    }

    // 2. 레거시(v1) 스키마 감지
    let legacy_rows = match probe.legacy_migration_count().await {
        Ok(n) => n,
        Err(e) => {
            emit_fail(results, "레거시 스키마", &e);
            return Err(e);
        }
    };
    if legacy_rows > 0 {
        let e = CheckError::LegacySchema {
            label: source.name.clone(),
            guide: LEGACY_MIGRATION_GUIDE_URL.to_string(),
        };
        emit_fail(results, "레거시 스키마", &e);
        return Err(e);
    }
    emit(results, CheckResult::pass("레거시 스키마", "해당 없음"));

    // 3. 마이그레이션 적용 (외부 도구 위임, 캡처된 출력은 그대로 재출력)
    let output = match runner.apply(source).await {
        Ok(o) => o,
        Err(e) => {
            emit_fail(results, "마이그레이션", &e);
            return Err(e);
        }
    };
    if !output.stdout.is_empty() {
        print!("{}", output.stdout);
    }
    if !output.stderr.is_empty() {
        eprint!("{}", output.stderr);
    }
    if !output.success {
        let e = CheckError::MigrationApply { code: output.code };
        emit_fail(results, "마이그레이션", &e);
        return Err(e);
    }
    emit(results, CheckResult::pass("마이그레이션", "적용 완료"));

    Ok(())
}

fn emit(results: &mut Vec<CheckResult>, result: CheckResult) {
    println!("{}", result);
    results.push(result);
}

fn emit_fail(results: &mut Vec<CheckResult>, label: &str, error: &CheckError) {
    let result = CheckResult::fail(label, error.to_string());
    println!("{}", result);
    results.push(result);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use beacon_core::check::MigrationOutput;

    use super::*;

    struct MockProbe {
        banner: String,
        legacy_rows: i64,
    }

    #[async_trait]
    impl DatabaseProbe for MockProbe {
        async fn server_version(&self) -> Result<String> {
            Ok(self.banner.clone())
        }

        async fn legacy_migration_count(&self) -> Result<i64> {
            Ok(self.legacy_rows)
        }

        async fn close(&self) {}
    }

    /// URL별로 준비된 배너/레거시 행 수를 돌려주는 모의 커넥터
    #[derive(Default)]
    struct MockConnector {
        banners: HashMap<String, String>,
        legacy_rows: HashMap<String, i64>,
        /// 연결을 거부할 URL 목록
        refuse: Vec<String>,
    }

    #[async_trait]
    impl ProbeConnector for MockConnector {
        async fn connect(&self, source: &DataSourceConfig) -> Result<Box<dyn DatabaseProbe>> {
            if self.refuse.contains(&source.url) {
                return Err(CheckError::Connectivity(sqlx::Error::PoolClosed));
            }
            Ok(Box::new(MockProbe {
                banner: self.banners.get(&source.url).cloned().unwrap_or_default(),
                legacy_rows: self.legacy_rows.get(&source.url).copied().unwrap_or(0),
            }))
        }
    }

    /// apply 호출 순서를 기록하는 모의 러너
    #[derive(Default)]
    struct RecordingRunner {
        applied: Mutex<Vec<String>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl MigrationRunner for RecordingRunner {
        async fn apply(&self, source: &DataSourceConfig) -> Result<MigrationOutput> {
            self.applied.lock().unwrap().push(source.name.clone());
            if self.fail_for.as_deref() == Some(source.name.as_str()) {
                return Ok(MigrationOutput {
                    stdout: String::new(),
                    stderr: "error: migration failed\n".to_string(),
                    code: Some(1),
                    success: false,
                });
            }
            Ok(MigrationOutput {
                stdout: "Applied 1/migrate init\n".to_string(),
                stderr: String::new(),
                code: Some(0),
                success: true,
            })
        }
    }

    const PRIMARY_URL: &str = "postgres://db-one:5432/beacon";
    const DIRECT_URL: &str = "postgres://db-two:5432/beacon";

    fn two_source_config() -> CheckConfig {
        CheckConfig {
            data_sources: vec![
                DataSourceConfig {
                    name: "primary".to_string(),
                    url: PRIMARY_URL.to_string(),
                },
                DataSourceConfig {
                    name: "direct".to_string(),
                    url: DIRECT_URL.to_string(),
                },
            ],
        }
    }

    fn connector_with_banners(primary: &str, direct: &str) -> MockConnector {
        MockConnector {
            banners: HashMap::from([
                (PRIMARY_URL.to_string(), primary.to_string()),
                (DIRECT_URL.to_string(), direct.to_string()),
            ]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_all_sources_pass() {
        let connector = connector_with_banners("PostgreSQL 14.5 on x86_64", "PostgreSQL 15.2");
        let runner = RecordingRunner::default();

        let results = run_check(&two_source_config(), &connector, &runner)
            .await
            .unwrap();

        // 소스 2개 × 4단계, 전부 통과
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.passed));
        assert_eq!(
            *runner.applied.lock().unwrap(),
            vec!["primary".to_string(), "direct".to_string()]
        );
    }

    #[tokio::test]
    async fn test_second_source_fails_version_gate() {
        // 두 번째 소스만 최소 버전 미달 → 전체 실패, 첫 소스는 전부 통과
        let connector = connector_with_banners("PostgreSQL 14.5 on x86_64", "PostgreSQL 8.0.0");
        let runner = RecordingRunner::default();

        let err = run_check(&two_source_config(), &connector, &runner)
            .await
            .unwrap_err();

        match err {
            CheckError::DataSource { label, error } => {
                assert_eq!(label, "direct");
                assert!(matches!(*error, CheckError::IncompatibleVersion { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
        // 마이그레이션은 첫 소스에만 적용됨
        assert_eq!(*runner.applied.lock().unwrap(), vec!["primary".to_string()]);
    }

    #[tokio::test]
    async fn test_legacy_schema_aborts_before_migration() {
        let mut connector = connector_with_banners("PostgreSQL 14.5", "PostgreSQL 14.5");
        connector
            .legacy_rows
            .insert(PRIMARY_URL.to_string(), 3);
        let runner = RecordingRunner::default();

        let err = run_check(&two_source_config(), &connector, &runner)
            .await
            .unwrap_err();

        match err {
            CheckError::DataSource { label, error } => {
                assert_eq!(label, "primary");
                match *error {
                    CheckError::LegacySchema { ref guide, .. } => {
                        assert!(guide.contains("migrate-v1-v2"));
                    }
                    ref other => panic!("unexpected: {other:?}"),
                }
            }
            other => panic!("unexpected: {other:?}"),
        }
        // 레거시 스키마가 있으면 마이그레이션은 호출되지 않음
        assert!(runner.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_version_never_passes() {
        let connector = connector_with_banners("", "PostgreSQL 14.5");
        let runner = RecordingRunner::default();

        let err = run_check(&two_source_config(), &connector, &runner)
            .await
            .unwrap_err();

        match err {
            CheckError::DataSource { label, error } => {
                assert_eq!(label, "primary");
                assert!(matches!(*error, CheckError::UnparseableVersion { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(runner.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_is_labeled() {
        let connector = MockConnector {
            refuse: vec![PRIMARY_URL.to_string()],
            ..Default::default()
        };
        let runner = RecordingRunner::default();

        let err = run_check(&two_source_config(), &connector, &runner)
            .await
            .unwrap_err();

        match err {
            CheckError::DataSource { label, error } => {
                assert_eq!(label, "primary");
                assert!(matches!(*error, CheckError::Connectivity(_)));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(runner.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_migration_failure_aborts_run() {
        let connector = connector_with_banners("PostgreSQL 14.5", "PostgreSQL 14.5");
        let runner = RecordingRunner {
            fail_for: Some("primary".to_string()),
            ..Default::default()
        };

        let err = run_check(&two_source_config(), &connector, &runner)
            .await
            .unwrap_err();

        match err {
            CheckError::DataSource { label, error } => {
                assert_eq!(label, "primary");
                assert!(matches!(
                    *error,
                    CheckError::MigrationApply { code: Some(1) }
                ));
            }
            other => panic!("unexpected: {other:?}"),
        }
        // 첫 소스에서 실패했으므로 두 번째 소스는 점검되지 않음
        assert_eq!(*runner.applied.lock().unwrap(), vec!["primary".to_string()]);
    }
}
