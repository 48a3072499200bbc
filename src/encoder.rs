use crate::convert::Registry;
use crate::error::HyperlispError;
use crate::node::{Node, Value, ValueKind};
use crate::{INDENT_WIDTH, NEWLINE};
use tracing::debug;

pub fn encode(registry: &Registry, root: &Node) -> Result<String, HyperlispError> {
    encode_nodes(registry, &root.children)
}

pub fn encode_nodes<'a>(
    registry: &Registry,
    nodes: impl IntoIterator<Item = &'a Node>,
) -> Result<String, HyperlispError> {
    let mut encoder = Encoder {
        registry,
        out: String::new(),
        count: 0,
    };
    for node in nodes {
        encoder.write_node(node, 0)?;
    }
    debug!(
        nodes = encoder.count,
        bytes = encoder.out.len(),
        "encoded hyperlisp document"
    );
    Ok(encoder.out)
}

pub fn encode_node(registry: &Registry, node: &Node) -> Result<String, HyperlispError> {
    encode_nodes(registry, std::iter::once(node))
}

struct Encoder<'r> {
    registry: &'r Registry,
    out: String,
    count: usize,
}

impl Encoder<'_> {
    fn write_node(&mut self, node: &Node, depth: usize) -> Result<(), HyperlispError> {
        if self.count > 0 {
            self.out.push_str(NEWLINE);
        }
        self.count += 1;

        for _ in 0..depth * INDENT_WIDTH {
            self.out.push(' ');
        }
        self.out.push_str(&quote_name(&node.name, node.value.is_null()));

        match &node.value {
            Value::Null => {}
            Value::String(s) => {
                self.out.push(':');
                self.out.push_str(&quote_text(s));
            }
            Value::TypedString(s) => self.write_typed(ValueKind::String.tag(), s),
            Value::Opaque { kind, text } => {
                // a known tag would read back as a different variant
                if let Some(target) = ValueKind::from_tag(kind) {
                    return Err(HyperlispError::Conversion {
                        from: "opaque".to_string(),
                        text: text.clone(),
                        target,
                    });
                }
                self.write_typed(kind, text);
            }
            Value::Node(inner) => {
                let document = encode_node(self.registry, inner)?;
                self.out.push_str(":node:");
                self.out.push_str(&multi_line(&document));
            }
            other => {
                let text = self.registry.render(other)?;
                self.write_typed(other.type_name(), &text);
            }
        }

        for child in &node.children {
            self.write_node(child, depth + 1)?;
        }
        Ok(())
    }

    fn write_typed(&mut self, tag: &str, text: &str) {
        self.out.push(':');
        self.out.push_str(&quote_text(tag));
        self.out.push(':');
        self.out.push_str(&quote_text(text));
    }
}

fn needs_quotes(text: &str) -> bool {
    text.contains([':', '\n', '\r'])
        || text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.starts_with('"')
        || text.starts_with("@\"")
}

fn quote_name(name: &str, bare: bool) -> String {
    // a lone empty name would read back as a blank line
    if needs_quotes(name)
        || name.starts_with("//")
        || name.starts_with("/*")
        || (bare && name.is_empty())
    {
        quoted(name)
    } else {
        name.to_string()
    }
}

fn quote_text(text: &str) -> String {
    if needs_quotes(text) {
        quoted(text)
    } else {
        text.to_string()
    }
}

fn quoted(text: &str) -> String {
    // the multi line form can only carry CRLF pairs
    let crlf_only = !text.replace(NEWLINE, "").contains(['\n', '\r']);
    if text.contains(NEWLINE) && crlf_only {
        multi_line(text)
    } else {
        single_line(text)
    }
}

fn multi_line(text: &str) -> String {
    let normalized = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', NEWLINE);
    format!("@\"{}\"", normalized.replace('"', "\"\""))
}

fn single_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                out.push_str("\\n");
            }
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            c if c.is_control() => out.push_str(&format!("\\x{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
