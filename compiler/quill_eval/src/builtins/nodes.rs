//! Node navigation builtins.

use quill_ir::BuiltinKind;
use quill_value::{NodeRef, Value};

pub(super) fn apply(kind: BuiltinKind, node: &NodeRef) -> Value {
    let nodes = |list: Vec<NodeRef>| Value::seq(list.into_iter().map(Value::node).collect());
    match kind {
        BuiltinKind::NodeName => Value::Str(node.name().clone()),
        BuiltinKind::NodeType => Value::from(node.node_type().as_str()),
        BuiltinKind::Children => nodes(node.children()),
        BuiltinKind::Parent => node.parent().map_or(Value::Nothing, Value::node),
        BuiltinKind::Root => Value::node(node.root()),
        BuiltinKind::Ancestors => nodes(node.ancestors()),
        _ => Value::string(node.text()),
    }
}
