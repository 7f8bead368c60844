//! Rows read from a session and records written through one.

use crate::error::{DbxError, DbxResult};
use crate::value::{FromValue, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A result row: column names and values in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// A column name without a matching value reads as missing.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<C, V>(pairs: impl IntoIterator<Item = (C, V)>) -> Self
    where
        C: Into<String>,
        V: Into<Value>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(c, v)| (c.into(), v.into()))
            .unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of a column. The first column with that name wins.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Typed access by column name.
    pub fn get<T: FromValue>(&self, column: &str) -> DbxResult<T> {
        let value = self
            .get_value(column)
            .ok_or_else(|| DbxError::decode(column, "no such column"))?;
        T::from_value(value).map_err(|e| with_column(e, column))
    }

    /// Typed access by position.
    pub fn get_idx<T: FromValue>(&self, idx: usize) -> DbxResult<T> {
        let value = self
            .values
            .get(idx)
            .ok_or_else(|| DbxError::decode(idx.to_string(), "column index out of range"))?;
        T::from_value(value).map_err(|e| with_column(e, &idx.to_string()))
    }

    /// Deserialize the row as a JSON object keyed by column name.
    pub fn deserialize<T: DeserializeOwned>(&self) -> DbxResult<T> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.clone(), v.to_json()))
            .collect();
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }
}

fn with_column(err: DbxError, column: &str) -> DbxError {
    match err {
        DbxError::Decode { message, .. } => DbxError::decode(column, message),
        other => other,
    }
}

/// Map a [`Row`] into a Rust type.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> DbxResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> DbxResult<Self> {
        Ok(row.clone())
    }
}

/// Column/value pairs written by an insert or update, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an earlier value for the same column.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only the listed columns, in record order. An empty list keeps everything.
    pub fn only(&self, columns: &[String]) -> Record {
        if columns.is_empty() {
            return self.clone();
        }
        Record {
            fields: self
                .fields
                .iter()
                .filter(|(c, _)| columns.iter().any(|k| k == c))
                .cloned()
                .collect(),
        }
    }

    /// Build a record from any serializable struct. Its fields become columns,
    /// sorted by name rather than in declaration order.
    pub fn from_serde<T: Serialize + ?Sized>(value: &T) -> DbxResult<Self> {
        match serde_json::to_value(value)? {
            serde_json::Value::Object(map) => Ok(Record {
                fields: map
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            }),
            other => Err(DbxError::Serialization(format!(
                "expected a struct or map, got {other}"
            ))),
        }
    }
}

/// Turn a Rust value into the record an insert/update writes.
pub trait ToRecord {
    fn to_record(&self) -> DbxResult<Record>;
}

impl ToRecord for Record {
    fn to_record(&self) -> DbxResult<Record> {
        Ok(self.clone())
    }
}

impl ToRecord for Row {
    fn to_record(&self) -> DbxResult<Record> {
        Ok(Record {
            fields: self
                .columns
                .iter()
                .cloned()
                .zip(self.values.iter().cloned())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
        email: Option<String>,
    }

    #[test]
    fn typed_access_reports_the_column() {
        let row = Row::from_pairs([("id", Value::Int(1)), ("name", Value::Text("a".into()))]);
        assert_eq!(row.get::<i64>("id").unwrap(), 1);
        assert_eq!(row.get_idx::<String>(1).unwrap(), "a");

        match row.get::<i64>("name") {
            Err(DbxError::Decode { column, .. }) => assert_eq!(column, "name"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(row.get::<i64>("missing").is_err());
    }

    #[test]
    fn short_value_list_reads_as_missing() {
        let row = Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::Int(1)],
        );
        assert_eq!(row.get::<i64>("id").unwrap(), 1);
        assert_eq!(row.get_value("name"), None);
        match row.get::<String>("name") {
            Err(DbxError::Decode { column, .. }) => assert_eq!(column, "name"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(row.get_idx::<String>(1).is_err());
    }

    #[test]
    fn deserialize_into_struct() {
        let row = Row::from_pairs([
            ("id", Value::Int(7)),
            ("name", Value::Text("rosbit".into())),
            ("email", Value::Null),
        ]);
        let user: User = row.deserialize().unwrap();
        assert_eq!(
            user,
            User {
                id: 7,
                name: "rosbit".into(),
                email: None
            }
        );
    }

    #[test]
    fn record_from_serde_and_projection() {
        let user = User {
            id: 1,
            name: "a".into(),
            email: Some("a@x".into()),
        };
        let record = Record::from_serde(&user).unwrap();
        assert_eq!(record.fields().len(), 3);

        let only = record.only(&["name".to_string()]);
        assert_eq!(only.fields(), &[("name".to_string(), Value::Text("a".into()))]);
        assert!(Record::from_serde(&5).is_err());
    }

    #[test]
    fn record_from_serde_sorts_columns_by_name() {
        #[derive(Serialize)]
        struct Goods {
            stock: i64,
            id: i64,
            name: &'static str,
        }

        let record = Record::from_serde(&Goods {
            stock: 4,
            id: 9,
            name: "pad",
        })
        .unwrap();
        let columns: Vec<&str> = record.fields().iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(columns, ["id", "name", "stock"]);
    }

    #[test]
    fn record_set_replaces_existing_column() {
        let record = Record::new().set("a", 1).set("b", 2).set("a", 3);
        assert_eq!(
            record.fields(),
            &[
                ("a".to_string(), Value::Int(3)),
                ("b".to_string(), Value::Int(2))
            ]
        );
    }
}
