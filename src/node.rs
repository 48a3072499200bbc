use crate::convert::{FromValue, Registry};
use crate::decimal::Decimal;
use crate::error::HyperlispError;
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Int,
    UInt,
    Long,
    ULong,
    Short,
    UShort,
    Byte,
    SByte,
    Float,
    Double,
    Decimal,
    Bool,
    Char,
    Guid,
    Date,
    Time,
    Path,
    Blob,
    Node,
}

impl ValueKind {
    pub const ALL: [ValueKind; 20] = [
        ValueKind::String,
        ValueKind::Int,
        ValueKind::UInt,
        ValueKind::Long,
        ValueKind::ULong,
        ValueKind::Short,
        ValueKind::UShort,
        ValueKind::Byte,
        ValueKind::SByte,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::Decimal,
        ValueKind::Bool,
        ValueKind::Char,
        ValueKind::Guid,
        ValueKind::Date,
        ValueKind::Time,
        ValueKind::Path,
        ValueKind::Blob,
        ValueKind::Node,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Long => "long",
            ValueKind::ULong => "ulong",
            ValueKind::Short => "short",
            ValueKind::UShort => "ushort",
            ValueKind::Byte => "byte",
            ValueKind::SByte => "sbyte",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Decimal => "decimal",
            ValueKind::Bool => "bool",
            ValueKind::Char => "char",
            ValueKind::Guid => "guid",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::Path => "path",
            ValueKind::Blob => "blob",
            ValueKind::Node => "node",
        }
    }

    pub fn from_tag(tag: &str) -> Option<ValueKind> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dna(pub Vec<usize>);

impl Dna {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Dna {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

impl FromStr for Dna {
    type Err = HyperlispError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::root());
        }
        s.split('-')
            .map(|part| {
                part.parse::<usize>().map_err(|_| HyperlispError::Conversion {
                    from: "string".to_string(),
                    text: s.to_string(),
                    target: ValueKind::Path,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    #[default]
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "string")]
    String(String),
    /// A string written with an explicit `string` tag; kept apart so the
    /// encoder can emit the tag again.
    #[serde(rename = "typed-string")]
    TypedString(String),
    #[serde(rename = "int")]
    Int(i32),
    #[serde(rename = "uint")]
    UInt(u32),
    #[serde(rename = "long")]
    Long(i64),
    #[serde(rename = "ulong")]
    ULong(u64),
    #[serde(rename = "short")]
    Short(i16),
    #[serde(rename = "ushort")]
    UShort(u16),
    #[serde(rename = "byte")]
    Byte(u8),
    #[serde(rename = "sbyte")]
    SByte(i8),
    #[serde(rename = "float")]
    Float(f32),
    #[serde(rename = "double")]
    Double(f64),
    #[serde(rename = "decimal")]
    Decimal(Decimal),
    #[serde(rename = "bool")]
    Bool(bool),
    #[serde(rename = "char")]
    Char(char),
    #[serde(rename = "guid")]
    Guid(Uuid),
    #[serde(rename = "date")]
    Date(NaiveDateTime),
    #[serde(rename = "time")]
    Time(#[serde(with = "crate::convert::time_text")] TimeDelta),
    #[serde(rename = "path")]
    Path(Dna),
    #[serde(rename = "blob")]
    Blob(Vec<u8>),
    #[serde(rename = "node")]
    Node(Box<Node>),
    /// Value under a type tag outside the known vocabulary.
    #[serde(rename = "opaque")]
    Opaque { kind: String, text: String },
}

impl Value {
    pub fn kind(&self) -> Option<ValueKind> {
        Some(match self {
            Value::Null | Value::Opaque { .. } => return None,
            Value::String(_) | Value::TypedString(_) => ValueKind::String,
            Value::Int(_) => ValueKind::Int,
            Value::UInt(_) => ValueKind::UInt,
            Value::Long(_) => ValueKind::Long,
            Value::ULong(_) => ValueKind::ULong,
            Value::Short(_) => ValueKind::Short,
            Value::UShort(_) => ValueKind::UShort,
            Value::Byte(_) => ValueKind::Byte,
            Value::SByte(_) => ValueKind::SByte,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Bool(_) => ValueKind::Bool,
            Value::Char(_) => ValueKind::Char,
            Value::Guid(_) => ValueKind::Guid,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::Path(_) => ValueKind::Path,
            Value::Blob(_) => ValueKind::Blob,
            Value::Node(_) => ValueKind::Node,
        })
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Opaque { kind, .. } => kind,
            other => other.kind().map_or("null", ValueKind::tag),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::TypedString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(&**node),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(Box::new(node))
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    i16 => Short,
    u16 => UShort,
    u8 => Byte,
    i8 => SByte,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    bool => Bool,
    char => Char,
    Uuid => Guid,
    NaiveDateTime => Date,
    TimeDelta => Time,
    Dna => Path,
    Vec<u8> => Blob,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            children: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::Null,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn add(&mut self, child: Node) -> &mut Node {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    pub fn find(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn descendant(&self, dna: &Dna) -> Option<&Node> {
        dna.0
            .iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    pub fn descendant_mut(&mut self, dna: &Dna) -> Option<&mut Node> {
        dna.0
            .iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }

    pub fn get<T: FromValue>(&self, registry: &Registry, default: T) -> Result<T, HyperlispError> {
        registry.get(&self.value, default)
    }
}
