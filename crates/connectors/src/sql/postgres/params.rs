use model::core::value::Value;
use tokio_postgres::types::{Json as PgJson, ToSql, Type};

pub struct PgParam(Box<dyn ToSql + Sync + Send>);

impl PgParam {
    /// Converts a value for a parameter whose server-side type is `ty`.
    ///
    /// tokio-postgres refuses to serialize e.g. a `DateTime<Utc>` into a
    /// `timestamp` parameter, so narrowing happens here.
    pub fn for_type(value: Value, ty: &Type) -> Self {
        match value {
            // Out-of-range values stay i64 so the bind fails instead of truncating.
            Value::Int(v) if *ty == Type::INT2 => match i16::try_from(v) {
                Ok(narrow) => PgParam(Box::new(narrow)),
                Err(_) => PgParam(Box::new(v)),
            },
            Value::Int(v) if *ty == Type::INT4 => match i32::try_from(v) {
                Ok(narrow) => PgParam(Box::new(narrow)),
                Err(_) => PgParam(Box::new(v)),
            },
            Value::Int(v) if *ty == Type::FLOAT8 => PgParam(Box::new(v as f64)),
            Value::Timestamp(v) if *ty == Type::TIMESTAMP => PgParam(Box::new(v.naive_utc())),
            Value::Timestamp(v) if *ty == Type::DATE => PgParam(Box::new(v.date_naive())),
            other => PgParam::from_value(other),
        }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Int(v) => PgParam(Box::new(v)),
            Value::Float(v) => PgParam(Box::new(v)),
            Value::String(v) => PgParam(Box::new(v)),
            Value::Boolean(v) => PgParam(Box::new(v)),
            Value::Json(v) => PgParam(Box::new(PgJson(v))),
            Value::Date(v) => PgParam(Box::new(v)),
            Value::Timestamp(v) => PgParam(Box::new(v)),
            Value::StringArray(v) => PgParam(Box::new(v)),
            Value::Null => PgParam(Box::new(Option::<String>::None)),
        }
    }
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &*self.0
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            params: values.into_iter().map(PgParam::from_value).collect(),
        }
    }

    /// Pairs each value with the parameter type reported by a prepared statement.
    pub fn for_statement(values: Vec<Value>, types: &[Type]) -> Self {
        let params = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| match types.get(i) {
                Some(ty) => PgParam::for_type(value, ty),
                None => PgParam::from_value(value),
            })
            .collect();
        Self { params }
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref())
            .collect::<Vec<_>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_timestamp_narrowed_for_timestamp_param() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let param = PgParam::for_type(Value::Timestamp(ts), &Type::TIMESTAMP);
        assert!(param.as_ref().to_sql_checked(&Type::TIMESTAMP, &mut Default::default()).is_ok());

        let param = PgParam::for_type(Value::Timestamp(ts), &Type::TIMESTAMPTZ);
        assert!(
            param
                .as_ref()
                .to_sql_checked(&Type::TIMESTAMPTZ, &mut Default::default())
                .is_ok()
        );
    }

    #[test]
    fn test_int_narrowed_for_int4_param() {
        let param = PgParam::for_type(Value::Int(42), &Type::INT4);
        assert!(param.as_ref().to_sql_checked(&Type::INT4, &mut Default::default()).is_ok());
        assert!(param.as_ref().to_sql_checked(&Type::INT8, &mut Default::default()).is_err());
    }

    #[test]
    fn test_out_of_range_int_is_not_truncated() {
        let floor = i64::from(i32::MAX) + 1;
        let param = PgParam::for_type(Value::Int(floor), &Type::INT4);
        assert!(param.as_ref().to_sql_checked(&Type::INT4, &mut Default::default()).is_err());

        let param = PgParam::for_type(Value::Int(70_000), &Type::INT2);
        assert!(param.as_ref().to_sql_checked(&Type::INT2, &mut Default::default()).is_err());

        let param = PgParam::for_type(Value::Int(-12), &Type::INT2);
        assert!(param.as_ref().to_sql_checked(&Type::INT2, &mut Default::default()).is_ok());
    }

    #[test]
    fn test_store_lines_up_with_statement_types() {
        let store = PgParamStore::for_statement(
            vec![Value::Int(1), Value::Null],
            &[Type::INT8, Type::TEXT],
        );
        assert_eq!(store.as_refs().len(), 2);
    }
}
