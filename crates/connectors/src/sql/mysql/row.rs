use chrono::NaiveDate;
use model::core::value::Value;
use mysql_async::Value as MySqlValue;

/// Converts a raw MySQL value into a model value. Text comes back as
/// `String`, DATE/DATETIME as `Timestamp` (UTC).
pub fn from_mysql_value(value: MySqlValue) -> Value {
    match value {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Int(i) => Value::Int(i),
        MySqlValue::UInt(u) => i64::try_from(u).map(Value::Int).unwrap_or(Value::Float(u as f64)),
        MySqlValue::Float(f) => Value::Float(f.into()),
        MySqlValue::Double(f) => Value::Float(f),
        MySqlValue::Bytes(bytes) => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            // Aggregates over numeric columns may come back as text.
            match text.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::String(text),
            }
        }
        MySqlValue::Date(y, m, d, h, mi, s, us) => {
            NaiveDate::from_ymd_opt(y.into(), m.into(), d.into())
                .and_then(|date| date.and_hms_micro_opt(h.into(), mi.into(), s.into(), us))
                .map(|naive| Value::Timestamp(naive.and_utc()))
                .unwrap_or(Value::Null)
        }
        MySqlValue::Time(negative, days, h, mi, s, us) => Value::String(format!(
            "{}{:02}:{:02}:{:02}.{:06}",
            if negative { "-" } else { "" },
            u32::from(h) + days * 24,
            mi,
            s,
            us
        )),
    }
}

pub fn to_i64(value: MySqlValue) -> Option<i64> {
    from_mysql_value(value).as_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_becomes_utc_timestamp() {
        let value = from_mysql_value(MySqlValue::Date(2024, 2, 29, 23, 59, 58, 0));
        let ts = value.as_timestamp().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-02-29T23:59:58+00:00");
    }

    #[test]
    fn test_zero_date_is_null() {
        assert_eq!(from_mysql_value(MySqlValue::Date(0, 0, 0, 0, 0, 0, 0)), Value::Null);
    }

    #[test]
    fn test_numeric_text_is_parsed() {
        assert_eq!(from_mysql_value(MySqlValue::Bytes(b"1700000000123".to_vec())), Value::Int(1_700_000_000_123));
        assert_eq!(
            from_mysql_value(MySqlValue::Bytes(b"hello".to_vec())),
            Value::String("hello".into())
        );
        assert_eq!(to_i64(MySqlValue::UInt(7)), Some(7));
    }
}
