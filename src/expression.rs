use crate::error::HyperlispError;
use crate::node::{Dna, Node, Value};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Parent,
    Children,
    Previous,
    Next,
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Value,
    Name,
    Node,
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    source: String,
    steps: Vec<Step>,
    projection: Option<Projection>,
}

impl Expression {
    pub fn parse(text: &str) -> Result<Self, HyperlispError> {
        let trimmed = text.trim();
        let body = trimmed.strip_prefix('@').unwrap_or(trimmed);
        let body = body.strip_prefix('/').unwrap_or(body);

        let mut steps = Vec::new();
        let mut projection = None;
        if !body.is_empty() {
            let segments: Vec<&str> = body.split('/').collect();
            for (i, segment) in segments.iter().enumerate() {
                if projection.is_some() {
                    return Err(HyperlispError::expression(
                        text,
                        "a projection must be the last step",
                    ));
                }
                if segment.is_empty() {
                    return Err(HyperlispError::expression(
                        text,
                        format!("empty step at position {}", i + 1),
                    ));
                }
                if let Some(name) = segment.strip_prefix('?') {
                    projection = Some(match name {
                        "value" => Projection::Value,
                        "name" => Projection::Name,
                        "node" => Projection::Node,
                        "count" => Projection::Count,
                        other => {
                            return Err(HyperlispError::expression(
                                text,
                                format!("unknown projection '?{other}'"),
                            ));
                        }
                    });
                    continue;
                }
                steps.push(match *segment {
                    ".." => Step::Parent,
                    "*" => Step::Children,
                    "-" => Step::Previous,
                    "+" => Step::Next,
                    name => Step::Name(name.to_string()),
                });
            }
        }

        Ok(Self {
            source: text.to_string(),
            steps,
            projection,
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn projection(&self) -> Option<Projection> {
        self.projection
    }

    pub fn evaluate<'a>(&self, root: &'a Node) -> Matches<'a> {
        let arena = Rc::new(Arena::build(root));
        self.run(arena, 0)
    }

    /// Evaluates with the descendant of `root` at `start` as the context node.
    /// `..` can still climb above it, up to `root`.
    pub fn evaluate_at<'a>(&self, root: &'a Node, start: &Dna) -> Result<Matches<'a>, HyperlispError> {
        let arena = Rc::new(Arena::build(root));
        let context = start
            .0
            .iter()
            .try_fold(0usize, |id, &index| arena.children[id].get(index).copied())
            .ok_or_else(|| {
                HyperlispError::expression(&self.source, format!("no node at path '{start}'"))
            })?;
        Ok(self.run(arena, context))
    }

    fn run<'a>(&self, arena: Rc<Arena<'a>>, context: usize) -> Matches<'a> {
        debug!(
            expression = %self.source,
            steps = self.steps.len(),
            nodes = arena.nodes.len(),
            "evaluating path expression"
        );

        let mut current: Box<dyn Iterator<Item = usize> + 'a> = Box::new(std::iter::once(context));
        for step in &self.steps {
            let step = step.clone();
            let arena = Rc::clone(&arena);
            let mut seen = HashSet::new();
            current = Box::new(
                current
                    .flat_map(move |id| arena.apply(&step, id))
                    .filter(move |id| seen.insert(*id)),
            );
        }

        let inner: Box<dyn Iterator<Item = Match<'a>> + 'a> = match self.projection {
            None | Some(Projection::Node) => {
                Box::new(current.map(move |id| Match::Node(arena.nodes[id])))
            }
            Some(Projection::Value) => Box::new(current.map(move |id| {
                let node: &'a Node = arena.nodes[id];
                Match::Value(&node.value)
            })),
            Some(Projection::Name) => Box::new(current.map(move |id| {
                let node: &'a Node = arena.nodes[id];
                Match::Name(node.name.as_str())
            })),
            Some(Projection::Count) => {
                Box::new(std::iter::once_with(move || Match::Count(current.count())))
            }
        };
        Matches { inner }
    }
}

impl FromStr for Expression {
    type Err = HyperlispError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

pub fn evaluate<'a>(root: &'a Node, expression: &str) -> Result<Matches<'a>, HyperlispError> {
    Ok(Expression::parse(expression)?.evaluate(root))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Match<'a> {
    Node(&'a Node),
    Value(&'a Value),
    Name(&'a str),
    Count(usize),
}

impl<'a> Match<'a> {
    pub fn as_node(&self) -> Option<&'a Node> {
        match self {
            Match::Node(node) => Some(*node),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&'a Value> {
        match self {
            Match::Value(value) => Some(*value),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Match::Node(node) => Value::Node(Box::new((*node).clone())),
            Match::Value(value) => (*value).clone(),
            Match::Name(name) => Value::String(name.to_string()),
            Match::Count(n) => i32::try_from(*n).map_or(Value::Long(*n as i64), Value::Int),
        }
    }

    pub fn into_node(self) -> Node {
        match self {
            Match::Node(node) => node.clone(),
            other => Node::new("", other.to_value()),
        }
    }
}

pub struct Matches<'a> {
    inner: Box<dyn Iterator<Item = Match<'a>> + 'a>,
}

impl<'a> Iterator for Matches<'a> {
    type Item = Match<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl fmt::Debug for Matches<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matches").finish_non_exhaustive()
    }
}

struct Arena<'a> {
    nodes: Vec<&'a Node>,
    parents: Vec<Option<usize>>,
    positions: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl<'a> Arena<'a> {
    fn build(root: &'a Node) -> Self {
        let mut arena = Arena {
            nodes: vec![root],
            parents: vec![None],
            positions: vec![0],
            children: vec![Vec::new()],
        };
        let mut pending = vec![0usize];
        while let Some(id) = pending.pop() {
            let node = arena.nodes[id];
            for (position, child) in node.children.iter().enumerate() {
                let child_id = arena.nodes.len();
                arena.nodes.push(child);
                arena.parents.push(Some(id));
                arena.positions.push(position);
                arena.children.push(Vec::new());
                arena.children[id].push(child_id);
                pending.push(child_id);
            }
        }
        arena
    }

    fn sibling(&self, id: usize, offset: isize) -> Option<usize> {
        let parent = self.parents[id]?;
        let position = self.positions[id].checked_add_signed(offset)?;
        self.children[parent].get(position).copied()
    }

    fn apply(&self, step: &Step, id: usize) -> Vec<usize> {
        match step {
            Step::Parent => self.parents[id].into_iter().collect(),
            Step::Children => self.children[id].clone(),
            Step::Previous => self.sibling(id, -1).into_iter().collect(),
            Step::Next => self.sibling(id, 1).into_iter().collect(),
            Step::Name(name) => {
                if self.nodes[id].name == *name {
                    vec![id]
                } else {
                    Vec::new()
                }
            }
        }
    }
}
