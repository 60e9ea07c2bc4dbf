use chrono::{Datelike, Timelike};
use model::core::value::Value;
use mysql_async::{Params, Value as MySqlValue};

pub struct MySqlParam(MySqlValue);

impl MySqlParam {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Int(i) => MySqlParam(MySqlValue::Int(*i)),
            Value::Float(f) => MySqlParam(MySqlValue::Double(*f)),
            Value::String(s) => MySqlParam(MySqlValue::Bytes(s.clone().into_bytes())),
            Value::Boolean(b) => MySqlParam(MySqlValue::Int(i64::from(*b))),
            Value::Json(j) => MySqlParam(MySqlValue::Bytes(j.to_string().into_bytes())),
            Value::Date(d) => MySqlParam(MySqlValue::Date(
                d.year() as u16,
                d.month() as u8,
                d.day() as u8,
                0,
                0,
                0,
                0,
            )),
            Value::Timestamp(ts) => {
                let naive = ts.naive_utc();
                MySqlParam(MySqlValue::Date(
                    naive.year() as u16,
                    naive.month() as u8,
                    naive.day() as u8,
                    naive.hour() as u8,
                    naive.minute() as u8,
                    naive.second() as u8,
                    ts.timestamp_subsec_micros(),
                ))
            }
            // Array columns are stored as JSON text on the forum side.
            Value::StringArray(v) => MySqlParam(MySqlValue::Bytes(
                serde_json::to_string(v).unwrap_or_default().into_bytes(),
            )),
            Value::Null => MySqlParam(MySqlValue::NULL),
        }
    }
}

pub struct MySqlParamStore {
    pub params: Vec<MySqlParam>,
}

impl MySqlParamStore {
    pub fn from_values(values: &[Value]) -> Self {
        let params = values.iter().map(MySqlParam::from_value).collect();
        MySqlParamStore { params }
    }

    pub fn params(&self) -> Params {
        if self.params.is_empty() {
            return Params::Empty;
        }
        let mysql_values: Vec<MySqlValue> = self.params.iter().map(|p| p.0.clone()).collect();
        Params::Positional(mysql_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_timestamp_keeps_microseconds() {
        let ts = Utc
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(250))
            .unwrap();
        let MySqlParam(value) = MySqlParam::from_value(&Value::Timestamp(ts));
        assert_eq!(value, MySqlValue::Date(2024, 3, 9, 7, 5, 1, 250));
    }

    #[test]
    fn test_string_array_is_json_text() {
        let MySqlParam(value) =
            MySqlParam::from_value(&Value::StringArray(vec!["a".into(), "b\"c".into()]));
        assert_eq!(value, MySqlValue::Bytes(br#"["a","b\"c"]"#.to_vec()));
    }

    #[test]
    fn test_empty_store_has_no_params() {
        assert_eq!(MySqlParamStore::from_values(&[]).params(), Params::Empty);
        match MySqlParamStore::from_values(&[Value::Int(1), Value::Null]).params() {
            Params::Positional(values) => assert_eq!(values, vec![MySqlValue::Int(1), MySqlValue::NULL]),
            other => panic!("unexpected params: {other:?}"),
        }
    }
}
