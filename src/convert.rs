use crate::decimal::Decimal;
use crate::error::HyperlispError;
use crate::node::{Dna, Node, Value, ValueKind};
use crate::{decoder, encoder};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::fmt;
use uuid::Uuid;

/// User supplied coercion. Returning `None` passes the value on to the next
/// converter in the chain.
pub trait Converter: Send + Sync {
    fn convert(&self, value: &Value, target: ValueKind) -> Option<Value>;
}

impl<F> Converter for F
where
    F: Fn(&Value, ValueKind) -> Option<Value> + Send + Sync,
{
    fn convert(&self, value: &Value, target: ValueKind) -> Option<Value> {
        self(value, target)
    }
}

#[derive(Default)]
pub struct Registry {
    converters: Vec<Box<dyn Converter>>,
}

#[derive(Default)]
pub struct RegistryBuilder {
    converters: Vec<Box<dyn Converter>>,
}

impl RegistryBuilder {
    pub fn register(mut self, converter: impl Converter + 'static) -> Self {
        self.converters.push(Box::new(converter));
        self
    }

    pub fn build(self) -> Registry {
        tracing::debug!(converters = self.converters.len(), "converter registry built");
        Registry {
            converters: self.converters,
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("converters", &self.converters.len())
            .finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn convert(
        &self,
        value: &Value,
        target: ValueKind,
    ) -> Result<Option<Value>, HyperlispError> {
        if value.is_null() {
            return Ok(None);
        }
        if value.kind() == Some(target) {
            return Ok(Some(value.clone()));
        }

        for converter in &self.converters {
            if let Some(converted) = converter.convert(value, target) {
                if converted.kind() != Some(target) {
                    return Err(HyperlispError::Conversion {
                        from: value.type_name().to_string(),
                        text: format!("converter returned {}", converted.type_name()),
                        target,
                    });
                }
                return Ok(Some(converted));
            }
        }

        if let Some(converted) = self.primitive(value, target)? {
            return Ok(Some(converted));
        }

        let text = self.stringify(value)?;
        self.parse(&text, target)
            .map(Some)
            .map_err(|e| match e {
                HyperlispError::Conversion { text, target, .. } => HyperlispError::Conversion {
                    from: value.type_name().to_string(),
                    text,
                    target,
                },
                other => other,
            })
    }

    pub fn convert_or(
        &self,
        value: &Value,
        target: ValueKind,
        default: Value,
    ) -> Result<Value, HyperlispError> {
        Ok(self.convert(value, target)?.unwrap_or(default))
    }

    pub fn get<T: FromValue>(&self, value: &Value, default: T) -> Result<T, HyperlispError> {
        match self.convert(value, T::KIND)? {
            None => Ok(default),
            Some(converted) => {
                let from = converted.type_name().to_string();
                T::from_value(converted).ok_or_else(|| HyperlispError::Conversion {
                    from,
                    text: String::new(),
                    target: T::KIND,
                })
            }
        }
    }

    pub fn render(&self, value: &Value) -> Result<String, HyperlispError> {
        match self.convert(value, ValueKind::String)? {
            None => Ok(String::new()),
            Some(Value::String(s)) | Some(Value::TypedString(s)) => Ok(s),
            Some(other) => self.stringify(&other),
        }
    }

    pub fn parse(&self, text: &str, kind: ValueKind) -> Result<Value, HyperlispError> {
        let fail = || HyperlispError::Conversion {
            from: "string".to_string(),
            text: text.to_string(),
            target: kind,
        };
        let trimmed = text.trim();
        let value = match kind {
            ValueKind::String => Value::String(text.to_string()),
            ValueKind::Int => Value::Int(trimmed.parse().map_err(|_| fail())?),
            ValueKind::UInt => Value::UInt(trimmed.parse().map_err(|_| fail())?),
            ValueKind::Long => Value::Long(trimmed.parse().map_err(|_| fail())?),
            ValueKind::ULong => Value::ULong(trimmed.parse().map_err(|_| fail())?),
            ValueKind::Short => Value::Short(trimmed.parse().map_err(|_| fail())?),
            ValueKind::UShort => Value::UShort(trimmed.parse().map_err(|_| fail())?),
            ValueKind::Byte => Value::Byte(trimmed.parse().map_err(|_| fail())?),
            ValueKind::SByte => Value::SByte(trimmed.parse().map_err(|_| fail())?),
            ValueKind::Float => Value::Float(trimmed.parse().map_err(|_| fail())?),
            ValueKind::Double => Value::Double(trimmed.parse().map_err(|_| fail())?),
            ValueKind::Decimal => Value::Decimal(trimmed.parse().map_err(|_| fail())?),
            ValueKind::Bool => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else {
                    return Err(fail());
                }
            }
            ValueKind::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Char(c),
                    _ => return Err(fail()),
                }
            }
            ValueKind::Guid => Value::Guid(Uuid::parse_str(trimmed).map_err(|_| fail())?),
            ValueKind::Date => Value::Date(parse_date(trimmed).ok_or_else(fail)?),
            ValueKind::Time => Value::Time(parse_time(trimmed).ok_or_else(fail)?),
            ValueKind::Path => Value::Path(trimmed.parse::<Dna>()?),
            ValueKind::Blob => Value::Blob(STANDARD.decode(trimmed).map_err(|_| fail())?),
            ValueKind::Node => Value::Node(Box::new(decoder::decode_single(self, text)?)),
        };
        Ok(value)
    }

    fn primitive(&self, value: &Value, target: ValueKind) -> Result<Option<Value>, HyperlispError> {
        if let Some(text) = value.as_str() {
            return self.parse(text, target).map(Some);
        }
        if target == ValueKind::String {
            return self.stringify(value).map(|s| Some(Value::String(s)));
        }
        let Some(num) = Num::of(value) else {
            return Ok(None);
        };
        let fail = || HyperlispError::Conversion {
            from: value.type_name().to_string(),
            text: num.to_string(),
            target,
        };
        num.cast(target).map_err(|()| fail())
    }

    fn stringify(&self, value: &Value) -> Result<String, HyperlispError> {
        Ok(match value {
            Value::Null => String::new(),
            Value::String(s) | Value::TypedString(s) => s.clone(),
            Value::Opaque { text, .. } => text.clone(),
            Value::Int(v) => v.to_string(),
            Value::UInt(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::ULong(v) => v.to_string(),
            Value::Short(v) => v.to_string(),
            Value::UShort(v) => v.to_string(),
            Value::Byte(v) => v.to_string(),
            Value::SByte(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Char(v) => v.to_string(),
            Value::Guid(v) => v.hyphenated().to_string(),
            Value::Date(v) => format_date(v),
            Value::Time(v) => format_time(*v),
            Value::Path(v) => v.to_string(),
            Value::Blob(v) => STANDARD.encode(v),
            Value::Node(node) => encoder::encode_node(self, node)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i128),
    Float(f64),
    Dec(Decimal),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        Some(match value {
            Value::Int(v) => Num::Int(i128::from(*v)),
            Value::UInt(v) => Num::Int(i128::from(*v)),
            Value::Long(v) => Num::Int(i128::from(*v)),
            Value::ULong(v) => Num::Int(i128::from(*v)),
            Value::Short(v) => Num::Int(i128::from(*v)),
            Value::UShort(v) => Num::Int(i128::from(*v)),
            Value::Byte(v) => Num::Int(i128::from(*v)),
            Value::SByte(v) => Num::Int(i128::from(*v)),
            Value::Bool(v) => Num::Int(i128::from(*v)),
            Value::Char(v) => Num::Int(i128::from(u32::from(*v))),
            Value::Float(v) => Num::Float(f64::from(*v)),
            Value::Double(v) => Num::Float(*v),
            Value::Decimal(v) => Num::Dec(*v),
            _ => return None,
        })
    }

    fn integral(self) -> Result<i128, ()> {
        match self {
            Num::Int(i) => Ok(i),
            Num::Dec(d) => Ok(d.round()),
            Num::Float(f) => {
                let r = f.round_ties_even();
                // i128 bounds are far outside every target range
                if r.is_finite() && r.abs() < 1e38 {
                    Ok(r as i128)
                } else {
                    Err(())
                }
            }
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
            Num::Dec(d) => d.to_f64(),
        }
    }

    fn cast(self, target: ValueKind) -> Result<Option<Value>, ()> {
        fn narrow<T: TryFrom<i128>>(i: i128) -> Result<T, ()> {
            T::try_from(i).map_err(|_| ())
        }

        let value = match target {
            ValueKind::Int => Value::Int(narrow(self.integral()?)?),
            ValueKind::UInt => Value::UInt(narrow(self.integral()?)?),
            ValueKind::Long => Value::Long(narrow(self.integral()?)?),
            ValueKind::ULong => Value::ULong(narrow(self.integral()?)?),
            ValueKind::Short => Value::Short(narrow(self.integral()?)?),
            ValueKind::UShort => Value::UShort(narrow(self.integral()?)?),
            ValueKind::Byte => Value::Byte(narrow(self.integral()?)?),
            ValueKind::SByte => Value::SByte(narrow(self.integral()?)?),
            ValueKind::Float => Value::Float(self.as_f64() as f32),
            ValueKind::Double => Value::Double(self.as_f64()),
            ValueKind::Decimal => Value::Decimal(match self {
                Num::Int(i) => Decimal::from(i),
                Num::Dec(d) => d,
                Num::Float(f) => Decimal::from_f64(f).ok_or(())?,
            }),
            ValueKind::Bool => Value::Bool(match self {
                Num::Int(i) => i != 0,
                Num::Float(f) => f != 0.0,
                Num::Dec(d) => d.mantissa() != 0,
            }),
            ValueKind::Char => match self {
                Num::Int(i) => Value::Char(
                    u32::try_from(i)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or(())?,
                ),
                _ => return Err(()),
            },
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Num::Int(i) => write!(f, "{i}"),
            Num::Float(v) => write!(f, "{v}"),
            Num::Dec(d) => write!(f, "{d}"),
        }
    }
}

pub trait FromValue: Sized {
    const KIND: ValueKind;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const KIND: ValueKind = ValueKind::$variant;

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_value! {
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

impl FromValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) | Value::TypedString(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for Node {
    const KIND: ValueKind = ValueKind::Node;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Node(node) => Some(*node),
            _ => None,
        }
    }
}

pub fn format_date(date: &NaiveDateTime) -> String {
    if date.time() == NaiveTime::MIN {
        date.format("%Y-%m-%d").to_string()
    } else {
        date.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

pub fn format_time(delta: TimeDelta) -> String {
    let negative = delta < TimeDelta::zero();
    let abs = delta.abs();
    let total = abs.num_seconds();
    let nanos = abs.subsec_nanos();
    let (days, hours) = (total / 86_400, (total % 86_400) / 3_600);
    let (minutes, seconds) = ((total % 3_600) / 60, total % 60);

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}

pub fn parse_time(text: &str) -> Option<TimeDelta> {
    fn unit(s: &str, max: i64) -> Option<i64> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok().filter(|v| *v <= max)
    }

    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (days, hours, minutes, seconds, nanos) = match body.split_once(':') {
        // a bare number is a day count
        None => (unit(body, i64::MAX / 86_400)?, 0, 0, 0, 0),
        Some((head, tail)) => {
            let (days, hours) = match head.split_once('.') {
                Some((d, h)) => (unit(d, i64::MAX / 86_400)?, unit(h, 23)?),
                None => (0, unit(head, 23)?),
            };
            let (minutes, rest) = match tail.split_once(':') {
                Some((m, s)) => (unit(m, 59)?, Some(s)),
                None => (unit(tail, 59)?, None),
            };
            let (seconds, nanos) = match rest {
                None => (0, 0),
                Some(s) => match s.split_once('.') {
                    None => (unit(s, 59)?, 0),
                    Some((whole, fraction)) => {
                        if fraction.len() > 9 {
                            return None;
                        }
                        let padded = format!("{fraction:0<9}");
                        (unit(whole, 59)?, unit(&padded, 999_999_999)?)
                    }
                },
            };
            (days, hours, minutes, seconds, nanos)
        }
    };

    let secs = days
        .checked_mul(86_400)?
        .checked_add(hours * 3_600 + minutes * 60 + seconds)?;
    let delta = TimeDelta::new(secs, u32::try_from(nanos).ok()?)?;
    Some(if negative { -delta } else { delta })
}

pub mod time_text {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*delta))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_time(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time span '{text}'")))
    }
}
