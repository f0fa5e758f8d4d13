//! The graph: an owned tree of scalar-valued nodes.
//!
//! Every node holds one [`Scalar`] and an ordered list of owned children.
//! Duplicate names among siblings are allowed. Navigation never fails:
//! a missing target is the nil sentinel.

use std::fmt;

use crate::model::Scalar;
use crate::path::{Path, Segment, Selector};

static NIL: Graph = Graph::nil();

/// A node and, recursively, its owned subtree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Graph {
    value: Scalar,
    children: Vec<Graph>,
}

impl Graph {
    /// The empty sentinel: nil value, no children.
    pub const fn nil() -> Self {
        Self {
            value: Scalar::Nil,
            children: Vec::new(),
        }
    }

    /// Creates a leaf holding `value`.
    pub fn new(value: impl Into<Scalar>) -> Self {
        Self {
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Borrow of the shared nil sentinel, returned by failed lookups.
    pub fn nil_ref() -> &'static Graph {
        &NIL
    }

    /// The node's own value.
    pub fn this(&self) -> &Scalar {
        &self.value
    }

    /// Replaces the node's own value, keeping its children.
    pub fn set_this(&mut self, value: impl Into<Scalar>) {
        self.value = value.into();
    }

    /// True iff the node's own value is absent, whatever its children.
    pub fn is_nil(&self) -> bool {
        self.value.is_nil()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True if the node has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Length of the longest chain of child hops below this node.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> &[Graph] {
        &self.children
    }

    /// Iterates over direct children.
    pub fn iter(&self) -> std::slice::Iter<'_, Graph> {
        self.children.iter()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Appends a new leaf child and returns it for chained building.
    pub fn add(&mut self, value: impl Into<Scalar>) -> &mut Graph {
        self.add_node(Graph::new(value))
    }

    /// Appends an existing subtree and returns it.
    pub fn add_node(&mut self, node: Graph) -> &mut Graph {
        self.children.push(node);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Removes the child at `index`, shifting later siblings down.
    ///
    /// Out-of-range indices leave the node untouched and return `None`.
    pub fn delete_at(&mut self, index: usize) -> Option<Graph> {
        if index < self.children.len() {
            Some(self.children.remove(index))
        } else {
            None
        }
    }

    /// Removes every child.
    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// Sets `path` to `value`, creating missing segments.
    ///
    /// The path is resolved against this node's children. The final
    /// segment's existing children are replaced by a single leaf.
    /// Malformed path text is logged and leaves the graph unchanged.
    ///
    /// `b{n}` reaches an existing `b` or creates the next one, so it can
    /// add `b{1}` after a single `b` but not `b{3}`. An `[n]` ordinal must
    /// exist. Past either limit the value is not stored, and segments
    /// before it may already have been created.
    pub fn set(&mut self, path: &str, value: impl Into<Scalar>) -> &mut Graph {
        match Path::parse(path) {
            Ok(p) => self.set_path(&p, value),
            Err(err) => {
                tracing::debug!(path, %err, "set: malformed path");
                self
            }
        }
    }

    /// [`set`](Self::set) with a compiled path. Returns the final segment's node.
    pub fn set_path(&mut self, path: &Path, value: impl Into<Scalar>) -> &mut Graph {
        let mut node = self;
        for segment in path.segments() {
            node = match node.step_or_create(segment) {
                Some(i) => &mut node.children[i],
                None => {
                    tracing::debug!(path = %path, %segment, "set: index out of range");
                    return node;
                }
            };
        }
        node.children.clear();
        node.children.push(Graph::new(value));
        node
    }

    fn step_or_create(&mut self, segment: &Segment) -> Option<usize> {
        match segment {
            Segment::Ordinal(n) => (*n < self.children.len()).then_some(*n),
            Segment::Name { name, selector, .. } => {
                let wanted = match selector {
                    Selector::Index(n) => *n,
                    Selector::First | Selector::Group => 0,
                };
                let matches: Vec<usize> = self
                    .children
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.value.matches_name(name))
                    .map(|(i, _)| i)
                    .collect();
                if let Some(i) = matches.get(wanted) {
                    return Some(*i);
                }
                // Only the next sibling of that name can be created.
                if wanted > matches.len() {
                    return None;
                }
                self.children.push(Graph::new(name.as_str()));
                Some(self.children.len() - 1)
            }
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// First child whose value equals `name`, or the nil sentinel.
    pub fn child(&self, name: &str) -> &Graph {
        self.children
            .iter()
            .find(|c| c.value.matches_name(name))
            .unwrap_or(&NIL)
    }

    /// Mutable access to the first child named `name`.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Graph> {
        self.children.iter_mut().find(|c| c.value.matches_name(name))
    }

    /// Child at `index`, or the nil sentinel when out of range.
    pub fn at(&self, index: usize) -> &Graph {
        self.children.get(index).unwrap_or(&NIL)
    }

    /// Mutable child at `index`.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Graph> {
        self.children.get_mut(index)
    }

    /// Resolves `path` and returns the children of the matched node(s).
    ///
    /// The result is always nil-rooted. A group selector (`{}`)
    /// concatenates the children of every matched sibling. Unmatched or
    /// malformed paths yield the nil sentinel.
    pub fn get(&self, path: &str) -> Graph {
        match Path::parse(path) {
            Ok(p) => self.get_path(&p),
            Err(err) => {
                tracing::debug!(path, %err, "get: malformed path");
                Graph::nil()
            }
        }
    }

    /// [`get`](Self::get) with a compiled path.
    ///
    /// Call segments need an evaluator; here they match nothing.
    pub fn get_path(&self, path: &Path) -> Graph {
        let mut frontier = vec![self.top_level()];
        for segment in path.segments() {
            if segment.args().is_some() {
                return Graph::nil();
            }
            frontier = select(&frontier, segment)
                .into_iter()
                .map(Graph::children)
                .collect();
        }
        Graph::group(frontier.into_iter().flatten())
    }

    /// The sibling list a path's first segment is matched against.
    ///
    /// A node with a value is addressed by its own name; a nil root is
    /// transparent.
    pub(crate) fn top_level(&self) -> &[Graph] {
        if self.value.is_nil() {
            &self.children
        } else {
            std::slice::from_ref(self)
        }
    }

    /// Builds a nil-rooted graph over clones of `nodes`.
    pub(crate) fn group<'g>(nodes: impl IntoIterator<Item = &'g Graph>) -> Graph {
        Graph {
            value: Scalar::Nil,
            children: nodes.into_iter().cloned().collect(),
        }
    }

    // =========================================================================
    // Scalar access
    // =========================================================================

    /// First non-nil value along the first-child chain, starting here.
    pub fn value(&self) -> &Scalar {
        let mut node = self;
        loop {
            if !node.value.is_nil() {
                return &node.value;
            }
            match node.children.first() {
                Some(first) => node = first,
                None => return &node.value,
            }
        }
    }

    /// [`value`](Self::value) with numeric text converted to a number.
    pub fn scalar(&self) -> Scalar {
        self.value().coerced()
    }

    /// Numeric view of [`value`](Self::value), if it is or parses as a number.
    pub fn number(&self) -> Option<Scalar> {
        self.value().number()
    }

    /// Text of the value at `path`.
    pub fn get_string(&self, path: &str) -> Option<String> {
        let found = self.get(path);
        let value = found.value();
        (!value.is_nil()).then(|| value.text())
    }

    /// Integer at `path`.
    pub fn get_int(&self, path: &str) -> Option<i64> {
        self.get(path).value().to_i64()
    }

    /// Float at `path`.
    pub fn get_float(&self, path: &str) -> Option<f64> {
        self.get(path).value().to_f64()
    }

    /// Boolean at `path`.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).value().to_bool()
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// Indented text form: one value per line, two spaces per level.
    ///
    /// A nil root is not printed; its children start at level 0.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_text(0, &mut out);
        out
    }

    fn write_text(&self, level: usize, out: &mut String) {
        let child_level = if self.value.is_nil() {
            level
        } else {
            if !out.is_empty() {
                out.push('\n');
            }
            for _ in 0..level {
                out.push_str("  ");
            }
            push_quoted(&self.value.text(), out);
            level + 1
        };
        for child in &self.children {
            child.write_text(child_level, out);
        }
    }
}

/// Nodes matched by one navigation step over a list of sibling slices.
///
/// Selectors index into the combined, ordered list of matches.
pub(crate) fn select<'g>(frontier: &[&'g [Graph]], segment: &Segment) -> Vec<&'g Graph> {
    let siblings = frontier.iter().copied().flat_map(|s| s.iter());
    match segment {
        Segment::Ordinal(n) => frontier.iter().copied().filter_map(|s| s.get(*n)).collect(),
        Segment::Name { name, selector, .. } => {
            let mut matches = siblings.filter(|c| c.value.matches_name(name));
            match selector {
                Selector::First => matches.next().into_iter().collect(),
                Selector::Index(n) => matches.nth(*n).into_iter().collect(),
                Selector::Group => matches.collect(),
            }
        }
    }
}

fn push_quoted(text: &str, out: &mut String) {
    let needs_quotes = text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | ','));
    if !needs_quotes {
        out.push_str(text);
        return;
    }
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl std::ops::Index<usize> for Graph {
    type Output = Graph;

    fn index(&self, index: usize) -> &Graph {
        self.at(index)
    }
}

impl<'g> IntoIterator for &'g Graph {
    type Item = &'g Graph;
    type IntoIter = std::slice::Iter<'g, Graph>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcb() -> Graph {
        let mut g = Graph::new("a");
        g.add("b").add(1);
        g.add("c").add(2);
        g.add("b").add(3);
        g
    }

    #[test]
    fn test_nil_graph() {
        let g = Graph::nil();
        assert_eq!(g.len(), 0);
        assert!(g.is_nil());

        let g = Graph::new(Scalar::Nil);
        assert_eq!(g.len(), 0);
        assert!(g.is_nil());
    }

    #[test]
    fn test_new_graph() {
        let g = Graph::new("a");
        assert_eq!(g.len(), 0);
        assert!(!g.is_nil());
    }

    #[test]
    fn test_depth() {
        let mut g = Graph::new("a");
        assert_eq!(g.depth(), 0);
        g.add("b");
        assert_eq!(g.depth(), 1);
        g.add("c").add("d");
        assert_eq!(g.depth(), 2);
        g.at_mut(1).unwrap().at_mut(0).unwrap().add("e");
        assert_eq!(g.depth(), 3);
    }

    #[test]
    fn test_delete_at() {
        let mut g = Graph::nil();
        for i in 1..=4 {
            g.add(i);
        }
        assert_eq!(g.len(), 4);

        g.delete_at(2);
        assert_eq!(g.len(), 3);
        assert!(g.delete_at(5).is_none());
        assert_eq!(g.len(), 3);
        g.delete_at(0);
        g.delete_at(1);
        assert_eq!(g.len(), 1);
        assert_eq!(g.at(0).this(), &Scalar::Int(2));
    }

    #[test]
    fn test_child_and_at_fall_back_to_nil() {
        let g = abcb();
        assert_eq!(g.child("c").at(0).this(), &Scalar::Int(2));
        assert!(g.child("zz").is_nil());
        assert!(g.child("zz").child("yy").at(7).is_nil());
        assert!(g.at(99).is_nil());
    }

    #[test]
    fn test_get_with_selectors() {
        let g = abcb();
        assert_eq!(g.get("a.b{0}").text(), "1");
        assert_eq!(g.get("a.b{1}").text(), "3");
        assert_eq!(g.get("a.b{}").text(), "1\n3");
        assert_eq!(g.get("a.b").scalar(), Scalar::Int(1));
        assert!(g.get("a.b{2}").is_empty());
        assert!(g.get("a.x.y").is_empty());
        assert!(g.get("a.b{").is_empty());
    }

    #[test]
    fn test_get_from_nil_root() {
        let mut g = Graph::nil();
        g.add("a").add(1);
        assert_eq!(g.get("a").scalar(), Scalar::Int(1));
        assert_eq!(g.get_int("a"), Some(1));
        assert_eq!(g.get_string("a"), Some("1".to_string()));
        assert_eq!(g.get("").len(), 1);
    }

    #[test]
    fn test_get_ordinal() {
        let g = abcb();
        assert_eq!(g.get("a[1]").scalar(), Scalar::Int(2));
        assert_eq!(g.get("a[2]").scalar(), Scalar::Int(3));
        assert!(g.get("a[3]").is_empty());
    }

    #[test]
    fn test_set_replaces_subtree() {
        let mut g = Graph::new("a");
        g.add("b").add("c");
        g.set("b", "d");
        assert_eq!(g.text(), "a\n  b\n    d");
    }

    #[test]
    fn test_set_creates_missing() {
        let mut g = Graph::nil();
        g.add("R").add("b");
        g.child_mut("R").unwrap().set("id", "1");
        assert_eq!(g.text(), "R\n  b\n  id\n    1");

        let mut g = Graph::nil();
        g.set("x.y.z", 5);
        assert_eq!(g.get_int("x.y.z"), Some(5));
        assert_eq!(g.depth(), 4);
    }

    #[test]
    fn test_set_indexed_sibling() {
        let mut g = Graph::nil();
        g.add("b").add(1);
        g.add("b").add(2);
        g.set("b{1}", 20);
        assert_eq!(g.get("b{1}").scalar(), Scalar::Int(20));
        assert_eq!(g.get("b{0}").scalar(), Scalar::Int(1));
    }

    #[test]
    fn test_set_index_past_end_stores_nothing() {
        let mut g = Graph::nil();
        g.add("b").add(1);
        g.set("b{3}", 9);
        assert_eq!(g.text(), "b\n  1");
        assert!(g.get("b{3}").is_empty());

        g.set("b{1}", 2);
        assert_eq!(g.get("b{1}").scalar(), Scalar::Int(2));
        g.set("b{2}", 3);
        assert_eq!(g.get("b{2}").scalar(), Scalar::Int(3));
        assert_eq!(g.len(), 3);

        g.set("[5]", 0);
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn test_text() {
        assert_eq!(Graph::nil().text(), "");
        let mut g = Graph::nil();
        g.add("name").add("two words");
        g.add("n").add(2.0);
        assert_eq!(g.text(), "name\n  \"two words\"\nn\n  2");
        assert_eq!(g.to_string(), g.text());
    }

    #[test]
    fn test_value_coercion() {
        let g = Graph::new(1.0);
        assert_eq!(g.value(), &Scalar::Float(1.0));
        let g = Graph::new(b"-1".to_vec());
        assert_eq!(g.number(), Some(Scalar::Int(-1)));
        let g = Graph::new("abc");
        assert_eq!(g.number(), None);
        assert_eq!(g.scalar(), Scalar::from("abc"));
        let g = Graph::new(" 7 ");
        assert_eq!(g.scalar(), Scalar::Int(7));
    }
}
