use chrono::{NaiveDate, NaiveTime, TimeDelta};
use hyperlisp::digest::{fingerprint, to_hex};
use hyperlisp::{Decimal, Dna, Node, Value, decode, encode};
use proptest::prelude::*;
use uuid::Uuid;

fn sample_tree() -> Result<Node, Box<dyn std::error::Error>> {
    let day = NaiveDate::from_ymd_opt(2012, 12, 21).ok_or("bad date")?;
    let nested = Node::named("inner")
        .with_child(Node::new("q", "a \"quoted\" value"))
        .with_child(Node::new("deep", Node::new("x", Value::Int(1))));

    Ok(Node::default()
        .with_child(
            Node::named("values")
                .with_child(Node::named("null"))
                .with_child(Node::new("string", "plain"))
                .with_child(Node::new("typed", Value::TypedString("typed".to_string())))
                .with_child(Node::new("int", Value::Int(-5)))
                .with_child(Node::new("uint", Value::UInt(5)))
                .with_child(Node::new("long", Value::Long(i64::MAX)))
                .with_child(Node::new("ulong", Value::ULong(u64::MAX)))
                .with_child(Node::new("short", Value::Short(-300)))
                .with_child(Node::new("ushort", Value::UShort(300)))
                .with_child(Node::new("byte", Value::Byte(7)))
                .with_child(Node::new("sbyte", Value::SByte(-7)))
                .with_child(Node::new("float", Value::Float(0.1)))
                .with_child(Node::new("double", Value::Double(-1.0e-7)))
                .with_child(Node::new("decimal", Value::Decimal("-12.500".parse::<Decimal>()?)))
                .with_child(Node::new("bool", Value::Bool(false)))
                .with_child(Node::new("char", Value::Char(':')))
                .with_child(Node::new("guid", Value::Guid(Uuid::nil())))
                .with_child(Node::new(
                    "date",
                    Value::Date(day.and_hms_micro_opt(8, 5, 3, 250).ok_or("bad time")?),
                ))
                .with_child(Node::new(
                    "time",
                    Value::Time(-TimeDelta::new(3_725, 10_000_000).ok_or("bad span")?),
                ))
                .with_child(Node::new("path", Value::Path(Dna(vec![3, 0, 12]))))
                .with_child(Node::new("blob", Value::Blob(vec![0, 255, 16])))
                .with_child(Node::new("node", nested))
                .with_child(Node::new(
                    "opaque",
                    Value::Opaque {
                        kind: "x-custom".to_string(),
                        text: "1:2".to_string(),
                    },
                )),
        )
        .with_child(
            Node::named("names")
                .with_child(Node::named(""))
                .with_child(Node::named(" padded "))
                .with_child(Node::named("//not a comment"))
                .with_child(Node::named("two\r\nlines"))
                .with_child(Node::new("", "unnamed")),
        ))
}

#[test]
fn tree_survives_encode_and_decode() -> Result<(), Box<dyn std::error::Error>> {
    let tree = sample_tree()?;

    let text = encode(&tree)?;
    let decoded = decode(&text)?;

    assert_eq!(decoded, tree);
    assert_eq!(fingerprint(&decoded), fingerprint(&tree));
    Ok(())
}

#[test]
fn canonical_text_is_stable() -> Result<(), Box<dyn std::error::Error>> {
    let canonical = "a:1\r\nb\r\n  c:int:2\r\n  d:@\"x\r\ny\"\r\ne:node:@\"f:g\"";

    assert_eq!(encode(&decode(canonical)?)?, canonical);

    let lf_only = canonical.replace("\r\n", "\n");
    assert_eq!(encode(&decode(&lf_only)?)?, canonical);
    Ok(())
}

#[test]
fn comments_and_blank_lines_are_dropped() -> Result<(), Box<dyn std::error::Error>> {
    let text = "// header\n\na:1\n/* block\n comment */\n  b:2\n";

    assert_eq!(encode(&decode(text)?)?, "a:1\r\n  b:2");
    Ok(())
}

#[test]
fn fingerprint_tracks_value_type() -> Result<(), Box<dyn std::error::Error>> {
    let int = decode("x:int:5")?;
    let long = decode("x:long:5")?;
    let text = decode("x:5")?;

    assert_ne!(fingerprint(&int), fingerprint(&long));
    assert_ne!(fingerprint(&int), fingerprint(&text));
    assert_eq!(fingerprint(&decode("x:decimal:1.50")?), fingerprint(&decode("x:decimal:1.5")?));

    let hex = to_hex(&fingerprint(&int));
    assert_eq!(hex.len(), 64);
    assert!(hex.bytes().all(|b| b.is_ascii_hexdigit()));
    Ok(())
}

#[test]
fn fingerprint_tracks_child_order() -> Result<(), Box<dyn std::error::Error>> {
    let a = decode("p\n  a\n  b")?;
    let b = decode("p\n  b\n  a")?;

    assert_ne!(fingerprint(&a), fingerprint(&b));
    Ok(())
}

fn text() -> impl Strategy<Value = String> {
    "[a-z0-9:\" @/\\\\\r\n\t*-]{0,8}"
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        text().prop_map(Value::String),
        text().prop_map(Value::TypedString),
        any::<i32>().prop_map(Value::Int),
        any::<u32>().prop_map(Value::UInt),
        any::<i64>().prop_map(Value::Long),
        any::<u64>().prop_map(Value::ULong),
        any::<i16>().prop_map(Value::Short),
        any::<u16>().prop_map(Value::UShort),
        any::<u8>().prop_map(Value::Byte),
        any::<i8>().prop_map(Value::SByte),
        (-1.0e6f32..1.0e6).prop_map(Value::Float),
        (-1.0e9f64..1.0e9).prop_map(Value::Double),
        any::<bool>().prop_map(Value::Bool),
        any::<char>().prop_map(Value::Char),
        (any::<i64>(), 0u32..10).prop_filter_map("scale", |(m, s)| {
            Decimal::new(i128::from(m), s).map(Value::Decimal)
        }),
        proptest::collection::vec(any::<u8>(), 0..8).prop_map(Value::Blob),
        proptest::collection::vec(0usize..10, 0..4).prop_map(|v| Value::Path(Dna(v))),
        any::<u128>().prop_map(|n| Value::Guid(Uuid::from_u128(n))),
        (1i32..=9999, 1u32..=365, 0u32..86_400, 0u32..1_000_000_000).prop_filter_map(
            "date",
            |(year, day, secs, nanos)| {
                let date = NaiveDate::from_yo_opt(year, day)?;
                let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)?;
                Some(Value::Date(date.and_time(time)))
            },
        ),
        (-1_000_000_000_000i64..1_000_000_000_000, 0u32..1_000_000_000)
            .prop_filter_map("span", |(secs, nanos)| TimeDelta::new(secs, nanos).map(Value::Time)),
        ("x-[a-z]{0,6}", text()).prop_map(|(kind, text)| Value::Opaque { kind, text }),
    ]
}

fn tree() -> impl Strategy<Value = Node> {
    let leaf = (text(), value()).prop_map(|(name, value)| Node::new(name, value));
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            text(),
            value(),
            proptest::collection::vec(inner.clone(), 0..4),
            proptest::option::of(inner),
        )
            .prop_map(|(name, value, children, nested)| {
                let value = nested.map_or(value, |n| Value::Node(Box::new(n)));
                Node {
                    name,
                    value,
                    children,
                }
            })
    })
}

proptest! {
    #[test]
    fn any_tree_round_trips(children in proptest::collection::vec(tree(), 0..4)) {
        let root = Node { children, ..Node::default() };

        let text = encode(&root).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let decoded = decode(&text).map_err(|e| TestCaseError::fail(format!("{e}\n{text:?}")))?;

        prop_assert_eq!(&decoded, &root);
        prop_assert_eq!(fingerprint(&decoded), fingerprint(&root));
    }
}
