//! Small AST simplifications applied after a node list is annotated.

use std::sync::Arc;

use quill_ir::{BinaryOp, Expr, ExprKind, IfBranch, Node, NodeKind, Span, SwitchCase};

/// Merge runs of adjacent text nodes into one.
pub(crate) fn merge_text(nodes: &mut Vec<Node>) {
    if nodes.len() < 2 {
        return;
    }
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        if let (Some(prev), NodeKind::Text(text)) = (merged.last_mut(), &node.kind) {
            if let NodeKind::Text(prev_text) = &prev.kind {
                let joined: Arc<str> = Arc::from(format!("{prev_text}{text}"));
                prev.kind = NodeKind::Text(joined);
                prev.span = prev.span.merge(node.span);
                continue;
            }
        }
        merged.push(node);
    }
    *nodes = merged;
}

/// Drop whitespace-only text containing a line break when neither neighbour
/// produces inline output, i.e. the line holds nothing but directives.
pub(crate) fn strip_blank_lines(nodes: &mut Vec<Node>) {
    let inline = |node: Option<&Node>| {
        matches!(
            node.map(|n| &n.kind),
            Some(NodeKind::Interpolation(_) | NodeKind::Text(_) | NodeKind::Call(_))
        )
    };
    let mut keep = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let blank_line = matches!(
            &node.kind,
            NodeKind::Text(text) if text.contains('\n') && text.trim().is_empty()
        );
        let prev = i.checked_sub(1).and_then(|p| nodes.get(p));
        keep.push(!(blank_line && !inline(prev) && !inline(nodes.get(i + 1))));
    }
    let mut flags = keep.into_iter();
    nodes.retain(|_| flags.next().unwrap_or(true));
}

/// Turn a switch with a single case into a conditional.
///
/// Returns the switch unchanged when the case body breaks anywhere but at its
/// very end, since a `break` would then escape to an enclosing loop.
pub(crate) fn single_case_switch(value: Expr, mut cases: Vec<SwitchCase>, span: Span) -> NodeKind {
    if cases.len() != 1 {
        return NodeKind::Switch { value, cases };
    }
    if matches!(cases[0].body.last().map(|n| &n.kind), Some(NodeKind::Break)) {
        cases[0].body.pop();
    }
    if contains_break(&cases[0].body) {
        return NodeKind::Switch { value, cases };
    }
    let Some(case) = cases.pop() else {
        return NodeKind::Switch { value, cases };
    };
    let condition = match case.values {
        None => Expr::new(ExprKind::Bool(true), case.span),
        Some(values) => values
            .into_iter()
            .map(|candidate| {
                let span = candidate.span;
                Expr::new(
                    ExprKind::Binary {
                        op: BinaryOp::Eq,
                        left: Box::new(value.clone()),
                        right: Box::new(candidate),
                    },
                    span,
                )
            })
            .reduce(|left, right| {
                let span = left.span.merge(right.span);
                Expr::new(
                    ExprKind::Binary {
                        op: BinaryOp::Or,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                )
            })
            .unwrap_or_else(|| Expr::new(ExprKind::Bool(false), span)),
    };
    NodeKind::If {
        branches: vec![IfBranch {
            condition,
            body: case.body,
            span: case.span,
        }],
        otherwise: None,
    }
}

/// `break` reachable without entering another loop, switch, macro or call.
fn contains_break(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match &node.kind {
        NodeKind::Break => true,
        NodeKind::If {
            branches,
            otherwise,
        } => {
            branches.iter().any(|b| contains_break(&b.body))
                || otherwise.as_deref().is_some_and(contains_break)
        }
        NodeKind::Attempt { body, recover } => contains_break(body) || contains_break(recover),
        NodeKind::Escape { body, .. } | NodeKind::NoEscape(body) | NodeKind::Compress(body) => {
            contains_break(body)
        }
        _ => false,
    })
}
