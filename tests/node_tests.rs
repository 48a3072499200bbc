use hyperlisp::{Dna, Node, Value, ValueKind, decode};

#[test]
fn dna_text_form() -> Result<(), Box<dyn std::error::Error>> {
    let dna: Dna = "0-12-3".parse()?;

    assert_eq!(dna, Dna(vec![0, 12, 3]));
    assert_eq!(dna.to_string(), "0-12-3");
    assert_eq!(dna.depth(), 3);
    assert_eq!(dna.parent(), Some(Dna(vec![0, 12])));
    assert_eq!(dna.child(1).to_string(), "0-12-3-1");

    let root: Dna = "".parse()?;
    assert_eq!(root, Dna::root());
    assert_eq!(root.parent(), None);
    assert!("0--1".parse::<Dna>().is_err());
    assert!("a".parse::<Dna>().is_err());
    Ok(())
}

#[test]
fn tree_navigation() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode("a\n  b:1\n  c\n    d:2\n  b:3")?;
    let a = root.child(0).ok_or("missing a")?;

    assert_eq!(a.len(), 3);
    assert_eq!(a.find("b").map(|n| &n.value), Some(&Value::String("1".to_string())));
    assert!(a.find("z").is_none());
    assert_eq!(a.children().filter(|n| n.name == "b").count(), 2);

    let d = root.descendant(&Dna(vec![0, 1, 0])).ok_or("missing d")?;
    assert_eq!(d.name, "d");
    assert!(root.descendant(&Dna(vec![0, 5])).is_none());
    assert_eq!(root.descendant(&Dna::root()), Some(&root));
    Ok(())
}

#[test]
fn tree_editing() -> Result<(), Box<dyn std::error::Error>> {
    let mut root = decode("a\n  b:1")?;

    let b = root.descendant_mut(&Dna(vec![0, 0])).ok_or("missing b")?;
    b.value = Value::Int(2);
    b.add(Node::named("c")).add(Node::new("d", true));

    assert_eq!(
        hyperlisp::encode(&root)?,
        "a\r\n  b:int:2\r\n    c\r\n      d:bool:true"
    );
    Ok(())
}

#[test]
fn value_kinds() {
    assert_eq!(Value::Int(1).kind(), Some(ValueKind::Int));
    assert_eq!(Value::TypedString(String::new()).kind(), Some(ValueKind::String));
    assert_eq!(Value::Null.kind(), None);

    let opaque = Value::Opaque {
        kind: "x-custom".to_string(),
        text: String::new(),
    };
    assert_eq!(opaque.kind(), None);
    assert_eq!(opaque.type_name(), "x-custom");

    for kind in ValueKind::ALL {
        assert_eq!(ValueKind::from_tag(kind.tag()), Some(kind));
    }
    assert_eq!(ValueKind::from_tag("Int"), None);
}

#[test]
fn json_form_of_a_tree() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(
        r#"a:int:5
b
  c:decimal:1.250
  d:time:"1.02:03:04.5"
  e:date:"2012-12-21T23:59:59.987"
  f:blob:hv4M
  g:node:@"x:y"
  h:x-custom:payload"#,
    )?;

    let json = serde_json::to_string(&root)?;
    let back: Node = serde_json::from_str(&json)?;
    assert_eq!(back, root);

    let first = serde_json::to_value(&root.children[0])?;
    assert_eq!(
        first,
        serde_json::json!({ "name": "a", "value": { "type": "int", "value": 5 } })
    );

    let time = serde_json::to_value(&root.children[1].children[1].value)?;
    assert_eq!(
        time,
        serde_json::json!({ "type": "time", "value": "1.02:03:04.5" })
    );
    Ok(())
}
