pub mod convert;
pub mod decimal;
pub mod decoder;
pub mod digest;
pub mod encoder;
pub mod error;
pub mod expression;
pub mod lexer;
pub mod node;

use std::sync::Arc;

pub use convert::{Converter, FromValue, Registry};
pub use decimal::Decimal;
pub use error::HyperlispError;
pub use expression::{Expression, Match, Matches};
pub use node::{Dna, Node, Value, ValueKind};

pub const INDENT_WIDTH: usize = 2;

/// Line terminator written by the encoder and produced for every line break
/// inside decoded literals.
pub const NEWLINE: &str = "\r\n";

#[derive(Debug, Clone, Default)]
pub struct Hyperlisp {
    registry: Arc<Registry>,
}

impl Hyperlisp {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn decode(&self, text: &str) -> Result<Node, HyperlispError> {
        decoder::decode(&self.registry, text)
    }

    pub fn encode(&self, root: &Node) -> Result<String, HyperlispError> {
        encoder::encode(&self.registry, root)
    }

    pub fn encode_nodes<'a>(
        &self,
        nodes: impl IntoIterator<Item = &'a Node>,
    ) -> Result<String, HyperlispError> {
        encoder::encode_nodes(&self.registry, nodes)
    }

    pub fn evaluate(&self, root: &Node, expression: &str) -> Result<Vec<Node>, HyperlispError> {
        Ok(expression::evaluate(root, expression)?
            .map(Match::into_node)
            .collect())
    }
}

pub fn decode(text: &str) -> Result<Node, HyperlispError> {
    decoder::decode(&Registry::default(), text)
}

pub fn encode(root: &Node) -> Result<String, HyperlispError> {
    encoder::encode(&Registry::default(), root)
}

pub use expression::evaluate;
