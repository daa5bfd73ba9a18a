use super::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("id", "id", None)]
#[case("id,jdbcType=integer", "id", Some("INTEGER"))]
#[case(" createdAt , javaType=java.util.Date , jdbcType = TIMESTAMP ", "createdAt", Some("TIMESTAMP"))]
#[case("flag,JDBCTYPE=bit", "flag", Some("BIT"))]
#[case("amount,type=numeric", "amount", Some("NUMERIC"))]
#[case("name,typeHandler=com.example.Handler", "name", None)]
#[case("name,jdbcType=", "name", None)]
#[case("", "param", None)]
#[case("   ", "param", None)]
#[case(",jdbcType=VARCHAR", "param", Some("VARCHAR"))]
fn parses_placeholder_tokens(
    #[case] token: &str,
    #[case] name: &str,
    #[case] declared: Option<&str>,
) {
    let spec = ParameterSpec::from_token(token);
    assert_eq!(spec.name(), name);
    assert_eq!(spec.declared_type(), declared);
}

#[test]
fn parameter_display_includes_type_when_declared() {
    assert_eq!(ParameterSpec::new("id", Some("integer")).to_string(), "id:INTEGER");
    assert_eq!(ParameterSpec::new("id", None).to_string(), "id");
}

#[rstest]
#[case("select", Some(StatementKind::Select))]
#[case("INSERT", Some(StatementKind::Insert))]
#[case("Update", Some(StatementKind::Update))]
#[case("delete", Some(StatementKind::Delete))]
#[case("sql", None)]
#[case("selectKey", None)]
fn classifies_tag_names(#[case] tag: &str, #[case] expected: Option<StatementKind>) {
    assert_eq!(StatementKind::from_tag_name(tag), expected);
}

#[test]
fn kind_serializes_uppercase() {
    assert_eq!(
        serde_json::to_string(&StatementKind::Select).unwrap(),
        "\"SELECT\""
    );
}

#[test]
fn normalizes_whitespace() {
    assert_eq!(
        normalize_whitespace("\n  SELECT *\r\n\tFROM   users  \n WHERE id = ?  "),
        "SELECT * FROM users WHERE id = ?"
    );
    assert_eq!(normalize_whitespace(" \n\t "), "");
}

#[test]
fn full_id_omits_empty_namespace() {
    let with_ns = StatementRecord::new(
        "com.example.UserMapper",
        "findById",
        StatementKind::Select,
        "/src/UserMapper.xml",
        "UserMapper.xml",
        "SELECT 1",
        vec![],
    );
    let without_ns = StatementRecord::new(
        "",
        "findById",
        StatementKind::Select,
        "/src/UserMapper.xml",
        "UserMapper.xml",
        "SELECT 1",
        vec![],
    );

    assert_eq!(with_ns.full_id(), "com.example.UserMapper.findById");
    assert_eq!(without_ns.full_id(), "findById");
}

#[test]
fn identity_ignores_declaring_file() {
    let a = StatementRecord::new(
        "ns",
        "stmt",
        StatementKind::Select,
        "/one/mappers/AMapper.xml",
        "mappers/AMapper.xml",
        "SELECT 1",
        vec![],
    );
    let b = StatementRecord::new(
        "ns",
        "stmt",
        StatementKind::Select,
        "/two/legacy/BMapper.xml",
        "legacy/BMapper.xml",
        "SELECT  2",
        vec![],
    );
    let update = StatementRecord::new(
        "ns",
        "stmt",
        StatementKind::Update,
        "/one/mappers/AMapper.xml",
        "mappers/AMapper.xml",
        "UPDATE t SET a = 1",
        vec![],
    );

    assert_eq!(a.identity(), b.identity());
    assert_ne!(a.identity(), update.identity());
    assert_eq!(b.resolved_sql(), "SELECT 2");
}
