//! Beacon 운영 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 배포 전 데이터베이스 준비 상태 점검
//! # (DATABASE_URL / DIRECT_DATABASE_URL 환경변수 필요)
//! beacon check-db
//!
//! # 점검 생략 (긴급 탈출구)
//! SKIP_DB_CHECK=1 beacon check-db
//!
//! # 마이그레이션 상태 확인 / 직접 적용
//! beacon migrate status
//! beacon migrate apply --db-url "postgres://..."
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::migrate::MigrateAction;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "Beacon 웹 분석 서버 운영 CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// 로그 레벨 (RUST_LOG 미설정 시 기본값)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 배포 전 데이터베이스 준비 상태 점검 (연결 → 버전 → 레거시 → 마이그레이션)
    CheckDb {
        /// 마이그레이션 디렉토리
        #[arg(long, default_value = "migrations")]
        migrations_dir: String,
    },

    /// 마이그레이션 관리 (status, apply)
    Migrate {
        /// 서브커맨드 (status, apply)
        #[arg(value_name = "ACTION")]
        action: String,

        /// 마이그레이션 디렉토리
        #[arg(short, long, default_value = "migrations")]
        dir: String,

        /// 데이터베이스 URL (기본: DATABASE_URL 환경변수)
        #[arg(long)]
        db_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (없어도 에러 안남)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "beacon_cli={},beacon_core={},beacon_data={}",
                    cli.log_level, cli.log_level, cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::CheckDb { migrations_dir } => {
            commands::check_db::run(&migrations_dir).await?;
        }
        Commands::Migrate {
            action,
            dir,
            db_url,
        } => {
            let action = MigrateAction::parse(&action).ok_or_else(|| {
                anyhow::anyhow!("알 수 없는 액션: {}. 사용 가능: status, apply", action)
            })?;
            commands::migrate::run(action, &dir, db_url).await?;
        }
    }

    Ok(())
}
