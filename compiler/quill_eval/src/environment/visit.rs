//! `[#visit]` and `[#recurse]`: dispatch markup nodes to handler macros.
//!
//! A handler is a macro bound directly in one of the searched namespaces
//! under the node's name. Elements without their own handler try
//! `@element`; text nodes use `@text` and documents `@document`. With no
//! handler at all, text is written out and the children of elements and
//! documents are visited in turn.

use quill_ir::Expr;
use quill_value::{
    type_mismatch, undeclared_variable, Capabilities, EvalError, MacroValue, NodeRef, NodeType,
    ScopeId, Value,
};

use super::call::CallArguments;
use super::{Evaluator, VisitState};

const ELEMENT_HANDLER: &str = "@element";

impl Evaluator<'_, '_> {
    pub(crate) fn exec_visit(&mut self, target: &Value, using: &[Expr]) -> Result<(), EvalError> {
        self.require(Capabilities::NODE_VISIT)?;
        let Value::Node(node) = target else {
            return Err(type_mismatch("node", target));
        };
        let namespaces = self.visit_namespaces(using)?;
        self.visit_with(node.clone(), namespaces)
    }

    /// Visit every child of `target`, or of the node being handled.
    pub(crate) fn exec_recurse(
        &mut self,
        target: Option<&Expr>,
        using: &[Expr],
    ) -> Result<(), EvalError> {
        self.require(Capabilities::NODE_VISIT)?;
        let node = match target {
            Some(expr) => match self.eval(expr)? {
                Value::Node(node) => node,
                other => return Err(type_mismatch("node", &other).with_span(expr.span)),
            },
            None => self
                .visit_node
                .clone()
                .ok_or_else(|| undeclared_variable(".node"))?,
        };
        let namespaces = self.visit_namespaces(using)?;
        for child in node.children() {
            self.visit_with(child, namespaces.clone())?;
        }
        Ok(())
    }

    /// Namespaces named by `using`; without one, those of the enclosing
    /// visit or else the current namespace.
    fn visit_namespaces(&mut self, using: &[Expr]) -> Result<Vec<ScopeId>, EvalError> {
        if using.is_empty() {
            let inherited = self
                .current_context()
                .and_then(|context| context.visit.as_ref())
                .map(|state| state.namespaces.clone());
            return Ok(inherited.unwrap_or_else(|| vec![self.namespace]));
        }
        let mut namespaces = Vec::with_capacity(using.len());
        for expr in using {
            match self.eval(expr)? {
                Value::Scope(id) => namespaces.push(id),
                Value::Seq(items) => {
                    for item in items.iter() {
                        match item {
                            Value::Scope(id) => namespaces.push(*id),
                            other => {
                                return Err(type_mismatch("namespace", other).with_span(expr.span));
                            }
                        }
                    }
                }
                other => return Err(type_mismatch("namespace", &other).with_span(expr.span)),
            }
        }
        Ok(namespaces)
    }

    fn visit_with(&mut self, node: NodeRef, namespaces: Vec<ScopeId>) -> Result<(), EvalError> {
        match self.find_handler(&node, &namespaces, 0)? {
            Some((handler, index)) => self.invoke_handler(&handler, node, namespaces, index + 1),
            None => self.default_visit(&node, namespaces),
        }
    }

    /// Continue the search of the handler being run; nothing happens when
    /// no namespace is left.
    pub(crate) fn visit_fallback(&mut self, state: VisitState) -> Result<(), EvalError> {
        let VisitState {
            node,
            namespaces,
            next,
        } = state;
        match self.find_handler(&node, &namespaces, next)? {
            Some((handler, index)) => self.invoke_handler(&handler, node, namespaces, index + 1),
            None => Ok(()),
        }
    }

    /// First handler for `node` in `namespaces[from..]`, with the index of
    /// the namespace it was found in.
    fn find_handler(
        &self,
        node: &NodeRef,
        namespaces: &[ScopeId],
        from: usize,
    ) -> Result<Option<(MacroValue, usize)>, EvalError> {
        let interner = self.env.interner;
        let own = interner.get(node.name());
        let element = match node.node_type() {
            NodeType::Element => interner.get(ELEMENT_HANDLER),
            NodeType::Text | NodeType::Document => None,
        };
        for (index, namespace) in namespaces.iter().enumerate().skip(from) {
            let frame = self.scopes.get(*namespace)?;
            for name in [own, element].into_iter().flatten() {
                if let Some(Value::Macro(handler)) = frame.get(name) {
                    if !handler.def.is_function() {
                        return Ok(Some((handler.clone(), index)));
                    }
                }
            }
        }
        Ok(None)
    }

    fn invoke_handler(
        &mut self,
        handler: &MacroValue,
        node: NodeRef,
        namespaces: Vec<ScopeId>,
        next: usize,
    ) -> Result<(), EvalError> {
        tracing::trace!(node = %node.name(), "visiting node");
        let previous = self.visit_node.replace(node.clone());
        let state = VisitState {
            node,
            namespaces,
            next,
        };
        let result = self.invoke(
            handler,
            CallArguments::Positional(Vec::new()),
            None,
            Some(state),
            None,
        );
        self.visit_node = previous;
        result.map(|_| ())
    }

    fn default_visit(&mut self, node: &NodeRef, namespaces: Vec<ScopeId>) -> Result<(), EvalError> {
        match node.node_type() {
            NodeType::Text => self.out.write(&node.text()),
            NodeType::Element | NodeType::Document => {
                for child in node.children() {
                    self.visit_with(child, namespaces.clone())?;
                }
                Ok(())
            }
        }
    }
}
