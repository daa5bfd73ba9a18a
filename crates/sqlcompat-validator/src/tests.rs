//! Scan, validate and report against mock databases

use crate::testing::{MockDatabase, Recorder};
use crate::*;
use indoc::indoc;
use pretty_assertions::assert_eq;
use sqlcompat_core::{DialectInfo, ExplainConfig, PlaceholderStyle, StatementKind, Value};
use sqlcompat_scanner::{MapperScanner, ScanConfig};
use std::path::Path;
use std::sync::Arc;

const ORDER_MAPPER: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <!DOCTYPE mapper PUBLIC "-//mybatis.org//DTD Mapper 3.0//EN" "http://mybatis.org/dtd/mybatis-3-mapper.dtd">
    <mapper namespace="com.example.OrderMapper">
      <select id="findById">
        SELECT id, total FROM orders WHERE id = #{id,jdbcType=INTEGER}
      </select>
      <select id="search">
        SELECT * FROM orders
        <where>
          <if test="customer.id != null">AND customer_id = #{customer.id,jdbcType=BIGINT}</if>
          <if test="placedAfter != null">AND placed_at &gt; #{placedAfter,jdbcType=TIMESTAMP}</if>
        </where>
      </select>
      <update id="archive">
        UPDATE orders SET archived = #{flag,jdbcType=BOOLEAN}
        WHERE id IN
        <foreach collection="ids" item="id" open="(" separator="," close=")">#{id,jdbcType=NUMERIC}</foreach>
      </update>
    </mapper>
"#};

fn postgres_like() -> DialectInfo {
    DialectInfo {
        id: "postgresql".into(),
        placeholder_style: PlaceholderStyle::Numbered,
        explain_config: ExplainConfig::postgresql(),
        ..Default::default()
    }
}

fn scan(root: &Path) -> Vec<Arc<sqlcompat_core::StatementRecord>> {
    std::fs::write(root.join("OrderMapper.xml"), ORDER_MAPPER).unwrap();
    MapperScanner::new(ScanConfig::new(vec![root.to_path_buf()]))
        .scan()
        .unwrap()
        .statements
}

fn target(label: &str, database: &MockDatabase) -> DatabaseTarget {
    DatabaseTarget::new(label, format!("mock://{}", label), postgres_like(), database.clone())
}

#[test]
fn rewritten_markers_match_scanned_parameters() {
    let dir = tempfile::tempdir().unwrap();
    for statement in scan(dir.path()) {
        let rewritten = rewrite_placeholders(statement.resolved_sql(), PlaceholderStyle::Numbered);
        assert_eq!(
            rewritten.markers,
            statement.parameters().len(),
            "{}",
            statement.full_id()
        );
        assert!(!rewritten.sql.contains("#{"));
        assert!(!rewritten.sql.contains('?'));
    }
}

#[tokio::test]
async fn clean_run_validates_both_databases_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let statements = scan(dir.path());
    assert_eq!(statements.len(), 3);
    let origin = MockDatabase::accepting();
    let destination = MockDatabase::accepting();

    let run = run_validation(
        &ValidationEngine::new(ValidationOptions::default()),
        &target("origin", &origin),
        &target("target", &destination),
        &statements,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(run.passed());
    assert_eq!(run.total(), 6);
    assert_eq!(Recorder::count(&destination.recorder.savepoint_rollbacks), 3);

    let prepared = origin.recorder.prepared.lock().clone();
    assert!(prepared.contains(
        &"EXPLAIN (FORMAT JSON) SELECT id, total FROM orders WHERE id = $1".to_string()
    ));
    let search = prepared
        .iter()
        .find(|sql| sql.contains("customer_id"))
        .unwrap();
    assert!(search.contains("customer_id = $1"), "{}", search);
    assert!(search.contains("placed_at > $2"), "{}", search);

    assert!(origin
        .recorder
        .bound
        .lock()
        .contains(&vec![Value::Bool(true), Value::Decimal("1".into())]));

    let report = ValidationReport::from_run(&run);
    assert_eq!(report.failures, 0);
    assert_eq!(report.entries_by_database["target"][2].kind, StatementKind::Update);
    assert!(report.entries_by_database["origin"][0].file.is_absolute());
}

#[tokio::test]
async fn origin_failure_fails_run_and_skips_target() {
    let dir = tempfile::tempdir().unwrap();
    let statements = scan(dir.path());
    let origin = MockDatabase::failing("permission denied for table orders");
    let destination = MockDatabase::accepting();

    let run = run_validation(
        &ValidationEngine::new(ValidationOptions::default()),
        &target("origin", &origin),
        &target("target", &destination),
        &statements,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(!run.passed());
    assert_eq!(run.failures(), 3);
    assert_eq!(run.target, None);
    assert!(run.results.iter().all(|r| r.error.as_deref()
        == Some("origin: Query error: permission denied for table orders")));
    assert!(destination.recorder.prepared.lock().is_empty());
}
