//! 외부 마이그레이션 도구(sqlx CLI) 호출.
//!
//! check-db 오케스트레이터가 쓰는 `MigrationRunner` 구현과
//! 독립 실행용 status/apply 액션을 제공합니다.
//!
//! 재시도나 스키마 비교는 하지 않습니다. 전부 외부 도구에 위임합니다.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use beacon_core::check::{MigrationOutput, MigrationRunner};
use beacon_core::config::{self, DataSourceConfig};
use beacon_core::error::Result;

/// migrate 서브커맨드 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    Status,
    Apply,
}

impl MigrateAction {
    /// 문자열에서 파싱
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "status" | "info" => Some(Self::Status),
            "apply" | "run" => Some(Self::Apply),
            _ => None,
        }
    }
}

/// sqlx CLI를 호출하는 마이그레이션 러너
pub struct SqlxCliRunner {
    migrations_dir: PathBuf,
}

impl SqlxCliRunner {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }
}

#[async_trait]
impl MigrationRunner for SqlxCliRunner {
    /// `sqlx migrate run`을 동기 호출하고 출력을 캡처합니다.
    ///
    /// 전달하는 인자는 검증된 연결 컨텍스트(소스 URL)와 마이그레이션
    /// 디렉토리뿐입니다. 외부 프로세스가 끝날 때까지 블로킹합니다.
    async fn apply(&self, source: &DataSourceConfig) -> Result<MigrationOutput> {
        let dir = self.migrations_dir.to_string_lossy().to_string();
        info!(source = %source.name, "마이그레이션 적용 시작");

        let output = std::process::Command::new("sqlx")
            .args([
                "migrate",
                "run",
                "--source",
                &dir,
                "--database-url",
                &source.url,
            ])
            .output()?;

        Ok(MigrationOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
            success: output.status.success(),
        })
    }
}

/// migrate 액션 진입점
pub async fn run(action: MigrateAction, dir: &str, db_url: Option<String>) -> anyhow::Result<()> {
    let url = db_url
        .or_else(|| std::env::var(config::ENV_DATABASE_URL).ok())
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL이 설정되지 않았습니다. --db-url 옵션 사용"))?;

    match action {
        MigrateAction::Status => run_status(dir, &url).await,
        MigrateAction::Apply => run_apply(dir, &url).await,
    }
}

/// 마이그레이션 상태 확인 (sqlx migrate info 래퍼)
async fn run_status(dir: &str, url: &str) -> anyhow::Result<()> {
    info!(url = %config::mask_database_url(url), "마이그레이션 상태 확인");

    let output = std::process::Command::new("sqlx")
        .args(["migrate", "info", "--source", dir, "--database-url", url])
        .output()
        .map_err(|e| {
            anyhow::anyhow!("sqlx 실행 실패: {}. sqlx-cli가 설치되어 있는지 확인하세요.", e)
        })?;

    print!("{}", String::from_utf8_lossy(&output.stdout));
    if !output.status.success() {
        eprint!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("마이그레이션 상태 확인 실패");
    }
    Ok(())
}

/// 마이그레이션 직접 적용 (준비 상태 점검 없이 러너만 실행)
async fn run_apply(dir: &str, url: &str) -> anyhow::Result<()> {
    println!("\n🚀 마이그레이션 적용 시작...\n");

    let runner = SqlxCliRunner::new(dir);
    let source = DataSourceConfig {
        name: "primary".to_string(),
        url: url.to_string(),
    };
    let output = runner.apply(&source).await?;

    if !output.stdout.is_empty() {
        print!("{}", output.stdout);
    }
    if !output.stderr.is_empty() {
        eprint!("{}", output.stderr);
    }

    if output.success {
        println!("\n✅ 마이그레이션 적용 완료!");
        Ok(())
    } else {
        anyhow::bail!("마이그레이션 실패 (종료 코드 {:?})", output.code)
    }
}
