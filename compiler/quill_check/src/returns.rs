//! All-paths return analysis for function bodies.

use quill_ir::{Node, NodeKind};

/// Whether every path through `nodes` ends in `return <value>` (or `stop`)
/// before falling off the end.
pub(crate) fn always_returns(nodes: &[Node]) -> bool {
    for node in nodes {
        match terminates(node) {
            Flow::Returns => return true,
            Flow::Breaks => return false,
            Flow::FallsThrough => {}
        }
    }
    false
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Flow {
    Returns,
    /// Leaves the enclosing loop or switch without returning.
    Breaks,
    FallsThrough,
}

fn sequence(nodes: &[Node]) -> Flow {
    for node in nodes {
        match terminates(node) {
            Flow::FallsThrough => {}
            flow => return flow,
        }
    }
    Flow::FallsThrough
}

fn terminates(node: &Node) -> Flow {
    match &node.kind {
        NodeKind::Return(Some(_)) | NodeKind::Stop(_) => Flow::Returns,
        NodeKind::Break => Flow::Breaks,
        NodeKind::If {
            branches,
            otherwise: Some(otherwise),
        } => {
            let all = branches
                .iter()
                .map(|branch| sequence(&branch.body))
                .chain(std::iter::once(sequence(otherwise)));
            join(all)
        }
        NodeKind::Switch { cases, .. } if cases.iter().any(|c| c.is_default()) => {
            // Cases fall through into the next one until a break.
            let mut next = Flow::FallsThrough;
            let mut all_return = true;
            for case in cases.iter().rev() {
                let flow = match sequence(&case.body) {
                    Flow::FallsThrough => next,
                    flow => flow,
                };
                all_return &= flow == Flow::Returns;
                next = flow;
            }
            if all_return {
                Flow::Returns
            } else {
                Flow::FallsThrough
            }
        }
        NodeKind::Attempt { body, recover } => {
            if sequence(body) == Flow::Returns && sequence(recover) == Flow::Returns {
                Flow::Returns
            } else {
                Flow::FallsThrough
            }
        }
        NodeKind::Escape { body, .. } | NodeKind::NoEscape(body) | NodeKind::Compress(body) => {
            sequence(body)
        }
        _ => Flow::FallsThrough,
    }
}

/// Combined flow of alternative branches.
fn join(flows: impl Iterator<Item = Flow>) -> Flow {
    let mut result = Flow::Returns;
    for flow in flows {
        match flow {
            Flow::Returns => {}
            Flow::Breaks => result = Flow::Breaks,
            Flow::FallsThrough => return Flow::FallsThrough,
        }
    }
    result
}
