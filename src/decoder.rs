use crate::INDENT_WIDTH;
use crate::convert::Registry;
use crate::error::HyperlispError;
use crate::lexer::{self, Cursor};
use crate::node::{Node, Value, ValueKind};
use tracing::{debug, trace, warn};

pub fn decode(registry: &Registry, text: &str) -> Result<Node, HyperlispError> {
    let mut decoder = Decoder {
        registry,
        cursor: Cursor::new(text),
        stack: vec![Node::default()],
        count: 0,
    };
    decoder.run()?;
    debug!(
        lines = decoder.cursor.line(),
        nodes = decoder.count,
        "decoded hyperlisp document"
    );
    Ok(decoder.finish())
}

pub fn decode_single(registry: &Registry, text: &str) -> Result<Node, HyperlispError> {
    let mut root = decode(registry, text)?;
    if root.children.len() != 1 {
        return Err(HyperlispError::MultipleRoots {
            found: root.children.len(),
        });
    }
    Ok(root.children.remove(0))
}

struct Decoder<'r, 'a> {
    registry: &'r Registry,
    cursor: Cursor<'a>,
    stack: Vec<Node>,
    count: usize,
}

struct Token {
    text: String,
    quoted: bool,
}

impl Decoder<'_, '_> {
    fn run(&mut self) -> Result<(), HyperlispError> {
        while !self.cursor.is_eof() {
            let line = self.cursor.line();
            let spaces = self.cursor.take_until(|c| c != ' ').len();

            if self.cursor.at_line_end() {
                self.cursor.eat_line_end();
                continue;
            }
            if self.cursor.starts_with("//") {
                self.skip_rest_of_line();
                continue;
            }
            if self.cursor.eat("/*") {
                self.skip_block_comment(line)?;
                continue;
            }

            if spaces % INDENT_WIDTH != 0 {
                return Err(HyperlispError::Indentation { line, spaces });
            }
            let level = spaces / INDENT_WIDTH;
            if level >= self.stack.len() {
                return Err(HyperlispError::Indentation { line, spaces });
            }
            while self.stack.len() > level + 1 {
                self.close_top();
            }

            let node = self.read_node(line)?;
            trace!(line, level, name = %node.name, "node");
            self.count += 1;
            self.stack.push(node);
        }
        Ok(())
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close_top();
        }
        self.stack.pop().unwrap_or_default()
    }

    fn close_top(&mut self) {
        if let Some(node) = self.stack.pop() {
            if let Some(parent) = self.stack.last_mut() {
                parent.children.push(node);
            }
        }
    }

    fn skip_rest_of_line(&mut self) {
        self.cursor.take_until(|c| c == '\n' || c == '\r');
        self.cursor.eat_line_end();
    }

    fn skip_block_comment(&mut self, line: usize) -> Result<(), HyperlispError> {
        while !self.cursor.eat("*/") {
            if self.cursor.bump().is_none() {
                return Err(HyperlispError::UnterminatedComment { line });
            }
        }
        let trailing_line = self.cursor.line();
        let trailing = self.cursor.take_until(|c| c == '\n' || c == '\r');
        if !trailing.trim().is_empty() {
            return Err(HyperlispError::syntax(
                trailing_line,
                format!("unexpected '{}' after block comment", trailing.trim()),
            ));
        }
        self.cursor.eat_line_end();
        Ok(())
    }

    fn read_node(&mut self, line: usize) -> Result<Node, HyperlispError> {
        let name = self.read_token(false)?;

        let value = if self.cursor.at_line_end() {
            Value::Null
        } else {
            self.expect_colon(&name)?;
            let second = self.read_token(false)?;
            if self.cursor.eat(":") {
                let value = self.read_token(true)?;
                self.typed_value(second.text, value.text, line)?
            } else {
                Value::String(second.text)
            }
        };

        if !self.cursor.at_line_end() {
            let found = self.cursor.take_until(|c| c == '\n' || c == '\r');
            return Err(HyperlispError::syntax(
                self.cursor.line(),
                format!("unexpected '{found}' after value"),
            ));
        }
        self.cursor.eat_line_end();

        Ok(Node {
            name: name.text,
            value,
            children: Vec::new(),
        })
    }

    fn expect_colon(&mut self, after: &Token) -> Result<(), HyperlispError> {
        if self.cursor.eat(":") {
            return Ok(());
        }
        let found = self.cursor.peek().unwrap_or(' ');
        let token = if after.quoted { "quoted name" } else { "name" };
        Err(HyperlispError::syntax(
            self.cursor.line(),
            format!("expected ':' after {token} '{}', found '{found}'", after.text),
        ))
    }

    /// A quoted literal, or a bare run of characters. Bare tokens stop at `:`
    /// unless `rest_of_line` is set.
    fn read_token(&mut self, rest_of_line: bool) -> Result<Token, HyperlispError> {
        if self.cursor.eat("@\"") {
            let text = lexer::read_multi_line_literal(&mut self.cursor)?;
            return Ok(Token { text, quoted: true });
        }
        if self.cursor.eat("\"") {
            let text = lexer::read_single_line_literal(&mut self.cursor)?;
            return Ok(Token { text, quoted: true });
        }
        let text = self
            .cursor
            .take_until(|c| c == '\n' || c == '\r' || (!rest_of_line && c == ':'));
        Ok(Token {
            text: text.to_string(),
            quoted: false,
        })
    }

    fn typed_value(
        &self,
        type_name: String,
        text: String,
        line: usize,
    ) -> Result<Value, HyperlispError> {
        match ValueKind::from_tag(&type_name) {
            Some(ValueKind::String) => Ok(Value::TypedString(text)),
            Some(kind) => self
                .registry
                .convert(&Value::String(text), kind)
                .map(Option::unwrap_or_default)
                .map_err(|e| e.at_line(line)),
            None => {
                warn!(line, kind = %type_name, "unknown type tag, keeping value as opaque text");
                Ok(Value::Opaque {
                    kind: type_name,
                    text,
                })
            }
        }
    }
}
