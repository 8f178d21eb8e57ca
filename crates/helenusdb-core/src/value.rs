use crate::error::Error;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use derive_more::Display;
use std::{collections::BTreeMap, fmt, str::FromStr};
use uuid::Uuid;

///
/// DataType
///
/// Semantic column type of a key component, rendered as its CQL name.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum DataType {
    #[display("bigint")]
    BigInt,
    #[display("blob")]
    Blob,
    #[display("boolean")]
    Boolean,
    #[display("date")]
    Date,
    #[display("int")]
    Int,
    #[display("text")]
    Text,
    #[display("timestamp")]
    Timestamp,
    #[display("timeuuid")]
    TimeUuid,
    #[display("uuid")]
    Uuid,
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data_type = match s.trim().to_ascii_lowercase().as_str() {
            "bigint" | "long" => Self::BigInt,
            "blob" => Self::Blob,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "int" | "integer" => Self::Int,
            "text" | "varchar" | "ascii" => Self::Text,
            "timestamp" => Self::Timestamp,
            "timeuuid" => Self::TimeUuid,
            "uuid" => Self::Uuid,
            other => {
                return Err(Error::key_definition(format!(
                    "unsupported key data type '{other}'"
                )));
            }
        };

        Ok(data_type)
    }
}

///
/// Value
///
/// Typed value bound into statements and carried by identifiers.
/// Ordering is total so identifiers can key ordered maps.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Value {
    Null,
    BigInt(i64),
    Blob(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    Int(i32),
    Map(BTreeMap<String, String>),
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True when this value can be stored in a column of `data_type`.
    #[must_use]
    pub fn conforms_to(&self, data_type: DataType) -> bool {
        match (self, data_type) {
            (Self::Null, _)
            | (Self::BigInt(_), DataType::BigInt)
            | (Self::Blob(_), DataType::Blob)
            | (Self::Boolean(_), DataType::Boolean)
            | (Self::Date(_), DataType::Date)
            | (Self::Int(_), DataType::Int)
            | (Self::Text(_), DataType::Text)
            | (Self::Timestamp(_), DataType::Timestamp)
            | (Self::Uuid(_), DataType::Uuid) => true,
            (Self::Uuid(id), DataType::TimeUuid) => id.get_version_num() == 1,
            _ => false,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::BigInt(_) => "bigint",
            Self::Blob(_) => "blob",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Int(_) => "int",
            Self::Map(_) => "map<text,text>",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Uuid(_) => "uuid",
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::BigInt(v) => Some(*v),
            Self::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Blob(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Int(v) => write!(f, "{v}"),
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{k}': '{v}'")?;
                }
                f.write_str("}")
            }
            Self::Text(v) => write!(f, "'{v}'"),
            Self::Timestamp(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Uuid(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<BTreeMap<String, String>> for Value {
    fn from(v: BTreeMap<String, String>) -> Self {
        Self::Map(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

///
/// TESTS
///
