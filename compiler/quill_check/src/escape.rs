//! Escape-transform stack.
//!
//! Each frame holds a descriptor: the transform expression with its
//! placeholder replaced by [`ExprKind::EscapeHole`]. Applying a frame fills
//! the hole with the interpolated expression.
//!
//! Pushing a descriptor identical to the current top only deepens that frame,
//! so `escape x as x?html` nested in itself escapes once. A different
//! descriptor is composed with the top: the inner transform runs first and the
//! outer one wraps its result.
//!
//! [`ExprKind::EscapeHole`]: quill_ir::ExprKind::EscapeHole

use quill_ir::Expr;

#[derive(Clone, Debug)]
pub(crate) struct EscapeFrame {
    /// Descriptor as written at this level.
    raw: Expr,
    /// Descriptor composed with every enclosing frame.
    composed: Expr,
    depth: u32,
}

#[derive(Default, Debug)]
pub(crate) struct EscapeStack {
    frames: Vec<EscapeFrame>,
}

impl EscapeStack {
    pub(crate) fn push(&mut self, descriptor: Expr) {
        if let Some(top) = self.frames.last_mut() {
            if top.raw == descriptor {
                top.depth += 1;
                return;
            }
        }
        let composed = match self.frames.last() {
            Some(outer) => outer.composed.fill_hole(&descriptor),
            None => descriptor.clone(),
        };
        self.frames.push(EscapeFrame {
            raw: descriptor,
            composed,
            depth: 1,
        });
    }

    pub(crate) fn pop(&mut self) {
        if let Some(top) = self.frames.last_mut() {
            if top.depth > 1 {
                top.depth -= 1;
            } else {
                self.frames.pop();
            }
        }
    }

    /// Remove the whole top frame for a `noescape` region.
    pub(crate) fn suspend(&mut self) -> Option<EscapeFrame> {
        self.frames.pop()
    }

    pub(crate) fn resume(&mut self, frame: Option<EscapeFrame>) {
        if let Some(frame) = frame {
            self.frames.push(frame);
        }
    }

    /// Wrap `expr` in the active transform, if any.
    pub(crate) fn apply(&self, expr: Expr) -> Expr {
        match self.frames.last() {
            Some(top) => {
                let span = expr.span;
                let mut wrapped = top.composed.fill_hole(&expr);
                wrapped.span = span;
                wrapped
            }
            None => expr,
        }
    }
}
