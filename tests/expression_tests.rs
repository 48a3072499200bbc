use hyperlisp::expression::{Projection, Step};
use hyperlisp::{Dna, Expression, Hyperlisp, HyperlispError, Match, Node, Value, decode, evaluate};

const DATA: &str = "_data\r\n  tmp1\r\n  tmp2:howdy world\r\n_data\r\n  tmp12\r\n  tmp22:howdy world2\r\ncode\r\n  x:int:1";

#[test]
fn select_nodes_by_name() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(DATA)?;

    let found: Vec<&Node> = evaluate(&root, "*/_data/?node")?
        .filter_map(|m| m.as_node())
        .collect();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|n| n.name == "_data"));

    let codec = Hyperlisp::default();
    assert_eq!(
        codec.encode_nodes(found)?,
        "_data\r\n  tmp1\r\n  tmp2:howdy world\r\n_data\r\n  tmp12\r\n  tmp22:howdy world2"
    );
    Ok(())
}

#[test]
fn projections() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(DATA)?;

    let names: Vec<Match> = evaluate(&root, "*/_data/*/?name")?.collect();
    assert_eq!(
        names,
        vec![
            Match::Name("tmp1"),
            Match::Name("tmp2"),
            Match::Name("tmp12"),
            Match::Name("tmp22"),
        ]
    );

    let values: Vec<Match> = evaluate(&root, "*/_data/*/?value")?.collect();
    assert_eq!(values[0], Match::Value(&Value::Null));
    assert_eq!(
        values[1].as_value(),
        Some(&Value::String("howdy world".to_string()))
    );

    let count: Vec<Match> = evaluate(&root, "*/_data/*/?count")?.collect();
    assert_eq!(count, vec![Match::Count(4)]);
    assert_eq!(count[0].to_value(), Value::Int(4));
    Ok(())
}

#[test]
fn count_of_nothing_is_zero() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(DATA)?;

    let count: Vec<Match> = evaluate(&root, "*/missing/?count")?.collect();
    assert_eq!(count, vec![Match::Count(0)]);
    Ok(())
}

#[test]
fn parent_step_drops_duplicates() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(DATA)?;

    let parents: Vec<Match> = evaluate(&root, "*/_data/*/..")?.collect();
    assert_eq!(parents.len(), 2);
    assert_eq!(parents[0].as_node(), Some(&root.children[0]));
    assert_eq!(parents[1].as_node(), Some(&root.children[1]));

    let roots: Vec<Match> = evaluate(&root, "*/*/../..")?.collect();
    assert_eq!(roots.len(), 1);
    Ok(())
}

#[test]
fn root_has_no_parent() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(DATA)?;

    assert_eq!(evaluate(&root, "..")?.count(), 0);
    assert_eq!(evaluate(&root, "../*")?.count(), 0);
    Ok(())
}

#[test]
fn empty_expression_selects_context() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(DATA)?;

    for text in ["", "@", "@/"] {
        let found: Vec<Match> = evaluate(&root, text)?.collect();
        assert_eq!(found, vec![Match::Node(&root)], "{text:?}");
    }
    Ok(())
}

#[test]
fn name_step_filters_the_working_set() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(DATA)?;

    // the root itself is unnamed
    assert_eq!(evaluate(&root, "_data")?.count(), 0);
    assert_eq!(evaluate(&root, "*/code/*/x/?value")?.count(), 1);
    Ok(())
}

#[test]
fn relative_to_a_context_node() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode("_data:one\r\n_data:two\r\nctx")?;
    let expression: Expression = "@/../*/_data/?value".parse()?;

    let values: Vec<Value> = expression
        .evaluate_at(&root, &Dna(vec![2]))?
        .map(|m| m.to_value())
        .collect();
    assert_eq!(
        values,
        vec![
            Value::String("one".to_string()),
            Value::String("two".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn sibling_steps() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode("_data:one\r\n_data:two\r\nctx")?;
    let at = Dna(vec![1]);

    let previous: Vec<Match> = Expression::parse("-/?value")?.evaluate_at(&root, &at)?.collect();
    assert_eq!(previous, vec![Match::Value(&Value::String("one".to_string()))]);

    let next: Vec<Match> = Expression::parse("+/?name")?.evaluate_at(&root, &at)?.collect();
    assert_eq!(next, vec![Match::Name("ctx")]);

    let first = Dna(vec![0]);
    assert_eq!(Expression::parse("-")?.evaluate_at(&root, &first)?.count(), 0);
    assert_eq!(Expression::parse("-")?.evaluate(&root).count(), 0);
    Ok(())
}

#[test]
fn missing_context_node_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(DATA)?;
    let expression = Expression::parse("*")?;

    assert!(matches!(
        expression.evaluate_at(&root, &Dna(vec![9])),
        Err(HyperlispError::Expression { .. })
    ));
    assert!(expression.evaluate_at(&root, &Dna(vec![0, 1])).is_ok());
    Ok(())
}

#[test]
fn malformed_expressions() {
    for text in ["?value/x", "*/?count/..", "?foo", "a//b", "*/", "//"] {
        assert!(
            matches!(
                Expression::parse(text),
                Err(HyperlispError::Expression { .. })
            ),
            "{text:?}"
        );
    }
}

#[test]
fn parsed_steps() -> Result<(), Box<dyn std::error::Error>> {
    let expression = Expression::parse("@/../*/-/+/_data/?value")?;

    assert_eq!(
        expression.steps(),
        &[
            Step::Parent,
            Step::Children,
            Step::Previous,
            Step::Next,
            Step::Name("_data".to_string()),
        ]
    );
    assert_eq!(expression.projection(), Some(Projection::Value));
    assert_eq!(expression.to_string(), "@/../*/-/+/_data/?value");
    Ok(())
}

#[test]
fn evaluation_restarts() -> Result<(), Box<dyn std::error::Error>> {
    let root = decode(DATA)?;
    let expression = Expression::parse("*/*/?name")?;

    let first: Vec<Match> = expression.evaluate(&root).collect();
    let second: Vec<Match> = expression.evaluate(&root).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
    Ok(())
}

#[test]
fn results_are_lazy() -> Result<(), Box<dyn std::error::Error>> {
    let mut root = Node::default();
    for i in 0..1_000 {
        root.add(Node::new(format!("n{i}"), Value::Int(i)));
    }

    let first: Vec<Match> = evaluate(&root, "*")?.take(2).collect();
    assert_eq!(first.len(), 2);
    assert_eq!(first[1].as_node().map(|n| n.name.as_str()), Some("n1"));
    Ok(())
}

#[test]
fn codec_collects_matches_as_nodes() -> Result<(), Box<dyn std::error::Error>> {
    let codec = Hyperlisp::default();
    let root = codec.decode(DATA)?;

    let values = codec.evaluate(&root, "*/_data/tmp2/?value")?;
    assert!(values.is_empty());

    let values = codec.evaluate(&root, "*/_data/*/?value")?;
    assert_eq!(values.len(), 4);
    assert_eq!(values[1], Node::new("", "howdy world"));

    let nodes = codec.evaluate(&root, "*/code")?;
    assert_eq!(nodes, vec![root.children[2].clone()]);
    Ok(())
}

#[test]
fn matched_string_values_decode_as_documents() -> Result<(), Box<dyn std::error::Error>> {
    let root = Node::default()
        .with_child(Node::new("_data", "_foo\r\n  tmp1\r\n  tmp2:howdy world"))
        .with_child(Node::new("_data", "_foo2\r\n  tmp12"));

    let mut documents = Vec::new();
    for m in evaluate(&root, "*/_data/?value")? {
        let text = m.as_value().and_then(Value::as_str).ok_or("not a string")?;
        documents.push(decode(text)?);
    }

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].children[0].name, "_foo");
    assert_eq!(documents[0].children[0].len(), 2);
    assert_eq!(documents[1].children[0].children[0].name, "tmp12");
    Ok(())
}
