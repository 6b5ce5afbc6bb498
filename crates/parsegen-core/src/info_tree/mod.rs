//! The loss-free info tree.
//!
//! Every byte (here: every `char`) of input is covered by exactly one leaf;
//! concatenating all leaf texts in document order reproduces the input.
//! Produced by every backend as a by-product of `parse`, including the
//! error-recovery case, so an editor always has something to colorize and
//! indent even when the parse as a whole failed.

use crate::grammar::{IndentKind, ProdId};
use parsegen_runtime::{IString, IStringStore};

#[derive(Clone, Debug)]
pub struct IndentSpec {
  pub child_start: u32,
  pub child_end: u32,
  pub kind: IndentKind,
}

#[derive(Clone, Debug)]
pub enum InfoNode {
  Internal { prod: ProdId, children: Vec<InfoNode>, indent: Option<IndentSpec>, start: u32, end: u32 },
  Leaf { start: u32, end: u32, text: String, color: Option<IString> },
}

impl InfoNode {
  pub fn leaf(start: u32, text: String, color: Option<IString>) -> Self {
    let end = start + text.chars().count() as u32;
    InfoNode::Leaf { start, end, text, color }
  }

  pub fn internal(prod: ProdId, children: Vec<InfoNode>, indent: Option<IndentSpec>) -> Self {
    let start = children.first().map(|c| c.span().0).unwrap_or(0);
    let end = children.last().map(|c| c.span().1).unwrap_or(start);
    InfoNode::Internal { prod, children, indent, start, end }
  }

  pub fn span(&self) -> (u32, u32) {
    match self {
      InfoNode::Leaf { start, end, .. } => (*start, *end),
      InfoNode::Internal { start, end, .. } => (*start, *end),
    }
  }

  /// Number of input positions covered by this node.
  pub fn length(&self) -> u32 {
    let (s, e) = self.span();
    e - s
  }

  /// The leaf whose span contains `offset`, if any.
  pub fn leaf_at(&self, offset: u32) -> Option<&InfoNode> {
    match self {
      InfoNode::Leaf { start, end, .. } => ((*start..*end).contains(&offset) || (*start == *end && *start == offset)).then_some(self),
      InfoNode::Internal { children, .. } => children.iter().find_map(|c| c.leaf_at(offset)),
    }
  }

  /// Resolves the effective indentation at `offset` by walking down the
  /// tree, composing nested descriptors: `Increase`/`Decrease` accumulate,
  /// `SameAs`/`Level` override whatever was accumulated above them.
  pub fn indent_at(&self, offset: u32) -> IndentKind {
    self.indent_at_acc(offset, IndentKind::None)
  }

  fn indent_at_acc(&self, offset: u32, acc: IndentKind) -> IndentKind {
    let InfoNode::Internal { children, indent, .. } = self else { return acc };

    let next_acc = match (&acc, indent) {
      (_, None) => acc.clone(),
      (IndentKind::None, Some(spec)) => spec.kind,
      (IndentKind::Increase, Some(IndentSpec { kind: IndentKind::Increase, .. })) => IndentKind::Increase,
      (IndentKind::Decrease, Some(IndentSpec { kind: IndentKind::Decrease, .. })) => IndentKind::Decrease,
      (_, Some(spec)) => match spec.kind {
        IndentKind::SameAs(_) | IndentKind::Level(_) => spec.kind,
        other => other,
      },
    };

    for (i, child) in children.iter().enumerate() {
      let (cs, ce) = child.span();
      let in_range = (cs..ce).contains(&offset) || (cs == ce && cs == offset);
      if !in_range {
        continue;
      }
      let applies = indent.as_ref().map(|spec| (i as u32) >= spec.child_start && (i as u32) < spec.child_end).unwrap_or(true);
      return child.indent_at_acc(offset, if applies { next_acc } else { acc.clone() });
    }
    acc
  }

  /// Concatenates every leaf's text in document order; must equal the
  /// matched input slice.
  pub fn leaf_concatenation(&self) -> String {
    match self {
      InfoNode::Leaf { text, .. } => text.clone(),
      InfoNode::Internal { children, .. } => children.iter().map(|c| c.leaf_concatenation()).collect(),
    }
  }

  /// Reconstructs the source with `[color]` and `{indent:...}` annotations
  /// for editor consumption; a minimal, human-readable stand-in for a real
  /// IDE renderer. Indentation is resolved the same way `indent_at` resolves
  /// it -- composed by addition down the tree, with `SameAs`/`Level`
  /// overriding whatever accumulated above them -- so a leaf's annotation
  /// always matches what `indent_at(leaf.span().0)` would report.
  pub fn format(&self, buffer: &mut String) {
    self.format_acc(buffer, IndentKind::None, &IStringStore::default());
  }

  fn format_acc(&self, buffer: &mut String, acc: IndentKind, store: &IStringStore) {
    match self {
      InfoNode::Leaf { text, color, .. } => {
        if acc != IndentKind::None {
          buffer.push_str(&format!("{{indent:{acc:?}}}"));
        }
        match color {
          Some(c) => {
            buffer.push('[');
            buffer.push_str(&c.to_string(store));
            buffer.push(']');
            buffer.push_str(text);
            buffer.push_str("[/]");
          }
          None => buffer.push_str(text),
        }
      }
      InfoNode::Internal { children, indent, .. } => {
        let next_acc = match (&acc, indent) {
          (_, None) => acc,
          (IndentKind::None, Some(spec)) => spec.kind,
          (IndentKind::Increase, Some(IndentSpec { kind: IndentKind::Increase, .. })) => IndentKind::Increase,
          (IndentKind::Decrease, Some(IndentSpec { kind: IndentKind::Decrease, .. })) => IndentKind::Decrease,
          (_, Some(spec)) => match spec.kind {
            IndentKind::SameAs(_) | IndentKind::Level(_) => spec.kind,
            other => other,
          },
        };
        for (i, child) in children.iter().enumerate() {
          let applies = indent.as_ref().map(|spec| (i as u32) >= spec.child_start && (i as u32) < spec.child_end).unwrap_or(true);
          child.format_acc(buffer, if applies { next_acc } else { acc }, store);
        }
      }
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn leaf_concatenation_reproduces_input() {
    let tree = InfoNode::internal(
      ProdId::from(0),
      vec![InfoNode::leaf(0, "foo".into(), None), InfoNode::leaf(3, " +".into(), None)],
      None,
    );
    assert_eq!(tree.leaf_concatenation(), "foo +");
  }

  #[test]
  fn indent_composes_by_addition_and_overrides_by_level() {
    let inner = InfoNode::internal(
      ProdId::from(1),
      vec![InfoNode::leaf(1, "b".into(), None)],
      Some(IndentSpec { child_start: 0, child_end: 1, kind: IndentKind::Level(2) }),
    );
    let outer = InfoNode::internal(
      ProdId::from(0),
      vec![InfoNode::leaf(0, "a".into(), None), inner],
      Some(IndentSpec { child_start: 1, child_end: 2, kind: IndentKind::Increase }),
    );
    assert_eq!(outer.indent_at(1), IndentKind::Level(2));
  }

  #[test]
  fn format_emits_color_and_indent_annotations() {
    use parsegen_runtime::CachedString;
    let store = IStringStore::default();
    let keyword = "keyword".to_token();
    let inner = InfoNode::internal(
      ProdId::from(1),
      vec![InfoNode::leaf(1, "b".into(), Some(keyword))],
      None,
    );
    let outer = InfoNode::internal(
      ProdId::from(0),
      vec![InfoNode::leaf(0, "a".into(), None), inner],
      Some(IndentSpec { child_start: 1, child_end: 2, kind: IndentKind::Increase }),
    );
    let mut buffer = String::new();
    outer.format(&mut buffer);
    assert_eq!(buffer, format!("a{{indent:Increase}}[{}]b[/]", keyword.to_string(&store)));
  }
}
