//! Beacon 데이터 접근 계층.
//!
//! postgres/mysql 겸용 Any 풀 래퍼와 준비 상태 프로브의 sqlx 구현.

pub mod database;
pub mod probe;

pub use database::{Database, DatabaseConfig};
pub use probe::{SqlxConnector, SqlxProbe};
