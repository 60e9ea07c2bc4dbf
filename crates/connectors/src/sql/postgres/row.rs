use crate::sql::base::error::DbError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::{
    core::value::{FieldValue, Value},
    records::row::RowData,
};
use std::error::Error;
use tokio_postgres::{
    Row,
    types::{FromSql, Kind, Type},
};

/// Raw text of enum labels and other text-encoded values that `String`
/// refuses to decode.
struct RawText(String);

impl<'a> FromSql<'a> for RawText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawText(String::from_utf8(raw.to_vec())?))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_)) || *ty == Type::UNKNOWN
    }
}

pub fn to_row_data(row: &Row, entity: &str) -> Result<RowData, DbError> {
    let fields = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            decode(row, idx, column.type_())
                .map(|value| FieldValue::new(column.name(), value))
                .map_err(|message| DbError::Decode {
                    table: entity.to_string(),
                    column: column.name().to_string(),
                    message,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RowData::new(entity, fields))
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Result<Option<T>, String> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| e.to_string())
}

fn decode(row: &Row, idx: usize, ty: &Type) -> Result<Value, String> {
    let value = if *ty == Type::BOOL {
        get::<bool>(row, idx)?.map(Value::Boolean)
    } else if *ty == Type::INT2 {
        get::<i16>(row, idx)?.map(|v| Value::Int(v.into()))
    } else if *ty == Type::INT4 {
        get::<i32>(row, idx)?.map(|v| Value::Int(v.into()))
    } else if *ty == Type::INT8 {
        get::<i64>(row, idx)?.map(Value::Int)
    } else if *ty == Type::FLOAT4 {
        get::<f32>(row, idx)?.map(|v| Value::Float(v.into()))
    } else if *ty == Type::FLOAT8 {
        get::<f64>(row, idx)?.map(Value::Float)
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        get::<String>(row, idx)?.map(Value::String)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        get::<serde_json::Value>(row, idx)?.map(Value::Json)
    } else if *ty == Type::DATE {
        get::<NaiveDate>(row, idx)?.map(Value::Date)
    } else if *ty == Type::TIMESTAMP {
        get::<NaiveDateTime>(row, idx)?.map(|v| Value::Timestamp(v.and_utc()))
    } else if *ty == Type::TIMESTAMPTZ {
        get::<DateTime<Utc>>(row, idx)?.map(Value::Timestamp)
    } else if *ty == Type::TEXT_ARRAY || *ty == Type::VARCHAR_ARRAY {
        get::<Vec<Option<String>>>(row, idx)?
            .map(|items| Value::StringArray(items.into_iter().flatten().collect()))
    } else if RawText::accepts(ty) {
        get::<RawText>(row, idx)?.map(|v| Value::String(v.0))
    } else {
        return Err(format!("unsupported column type {}", ty.name()));
    };

    Ok(value.unwrap_or(Value::Null))
}
