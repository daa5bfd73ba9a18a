//! Sample value synthesis for bind parameters

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use sqlcompat_core::{ParameterSpec, PreparedStatement, Result, Value};

const SAMPLE_TEXT: &str = "sample";

/// Produces a plausible value for each parameter from its declared type.
///
/// The clock is read once when the generator is created, so every date and
/// timestamp it hands out is identical. UUIDs are the only values that
/// differ between calls.
#[derive(Debug, Clone)]
pub struct SampleValueGenerator {
    now: DateTime<Utc>,
    today: NaiveDate,
    time_of_day: NaiveTime,
}

impl SampleValueGenerator {
    pub fn new() -> Self {
        Self::with_clock(Utc::now(), Local::now().date_naive())
    }

    /// A generator pinned to a given instant and calendar date
    pub fn with_clock(now: DateTime<Utc>, today: NaiveDate) -> Self {
        Self {
            now,
            today,
            time_of_day: NaiveTime::from_hms_opt(0, 0, 1).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn generate(&self, spec: &ParameterSpec) -> Value {
        let Some(declared) = spec.declared_type() else {
            return Value::String(SAMPLE_TEXT.to_string());
        };

        match declared {
            "UUID" => Value::Uuid(uuid::Uuid::new_v4()),
            "INTEGER" | "INT" | "SMALLINT" | "TINYINT" => Value::Int32(1),
            "BIGINT" => Value::Int64(1),
            "NUMERIC" | "DECIMAL" => Value::Decimal("1".to_string()),
            "BOOLEAN" | "BIT" => Value::Bool(true),
            "DATE" => Value::Date(self.today),
            "TIMESTAMP" | "TIMESTAMPTZ" | "TIMESTAMP_WITH_TIMEZONE" => Value::DateTimeUtc(self.now),
            "TIME" => Value::Time(self.time_of_day),
            // VARCHAR, CHAR, TEXT, CLOB and anything unrecognised
            _ => Value::String(SAMPLE_TEXT.to_string()),
        }
    }

    pub fn generate_all(&self, parameters: &[ParameterSpec]) -> Vec<Value> {
        parameters.iter().map(|spec| self.generate(spec)).collect()
    }

    /// Bind one generated value per parameter, in order, to positions 1..=n
    pub fn bind(
        &self,
        statement: &mut dyn PreparedStatement,
        parameters: &[ParameterSpec],
    ) -> Result<()> {
        for (index, value) in self.generate_all(parameters).into_iter().enumerate() {
            statement.bind(index + 1, value)?;
        }
        Ok(())
    }
}

impl Default for SampleValueGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sqlcompat_core::StatementResult;

    fn generator() -> SampleValueGenerator {
        SampleValueGenerator::with_clock(
            Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
        )
    }

    #[rstest]
    #[case(None, Value::String("sample".into()))]
    #[case(Some("VARCHAR"), Value::String("sample".into()))]
    #[case(Some("char"), Value::String("sample".into()))]
    #[case(Some("CLOB"), Value::String("sample".into()))]
    #[case(Some("INTEGER"), Value::Int32(1))]
    #[case(Some("smallint"), Value::Int32(1))]
    #[case(Some("TINYINT"), Value::Int32(1))]
    #[case(Some("BIGINT"), Value::Int64(1))]
    #[case(Some("DECIMAL"), Value::Decimal("1".into()))]
    #[case(Some("BIT"), Value::Bool(true))]
    #[case(Some("DATE"), Value::Date(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()))]
    #[case(Some("TIMESTAMPTZ"), Value::DateTimeUtc(Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()))]
    #[case(Some("TIME"), Value::Time(NaiveTime::from_hms_opt(0, 0, 1).unwrap()))]
    #[case(Some("ARRAY"), Value::String("sample".into()))]
    fn value_for_declared_type(#[case] declared: Option<&str>, #[case] expected: Value) {
        let spec = ParameterSpec::new("p", declared);
        assert_eq!(generator().generate(&spec), expected);
    }

    #[test]
    fn uuids_are_fresh() {
        let spec = ParameterSpec::new("id", Some("UUID"));
        let generator = generator();
        let first = generator.generate(&spec);
        let second = generator.generate(&spec);
        assert!(matches!(first, Value::Uuid(_)));
        assert_ne!(first, second);
    }

    #[test]
    fn clock_is_captured_once() {
        let generator = SampleValueGenerator::new();
        let spec = ParameterSpec::new("at", Some("TIMESTAMP"));
        assert_eq!(generator.generate(&spec), generator.generate(&spec));
    }

    #[derive(Default)]
    struct RecordingStatement {
        bound: Vec<(usize, Value)>,
    }

    #[async_trait]
    impl PreparedStatement for RecordingStatement {
        fn parameter_count(&self) -> usize {
            self.bound.len()
        }

        fn bind(&mut self, position: usize, value: Value) -> Result<()> {
            self.bound.push((position, value));
            Ok(())
        }

        async fn execute(&mut self) -> Result<StatementResult> {
            Ok(StatementResult::default())
        }
    }

    #[test]
    fn binds_positionally_from_one() {
        let mut statement = RecordingStatement::default();
        let parameters = vec![
            ParameterSpec::new("id", Some("BIGINT")),
            ParameterSpec::new("name", None),
        ];

        generator().bind(&mut statement, &parameters).unwrap();

        assert_eq!(
            statement.bound,
            vec![(1, Value::Int64(1)), (2, Value::String("sample".into()))]
        );
    }
}
