//! Variable frames and the scope chain.
//!
//! Frames live in a per-render arena and are addressed by generational
//! [`ScopeId`]s. A frame's `parent` is a plain handle, so a macro context can
//! point at the scope that was active at its call site without owning it,
//! and re-parenting a nested body is just choosing another handle.
//!
//! # Resolution
//!
//! Frames created for a block (macro call, loop body, nested body) carry the
//! block's static [`DeclaredSet`]: a read stops at the first such frame that
//! declares the name, bound or not. Namespace, global and data-model frames
//! are open-ended and answer by presence.
//!
//! Data-model entries stay keyed by their text: host keys are arbitrary and
//! never enter the engine's interner, so reads carry the name's text
//! alongside its interned form (if it has one).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use quill_ir::{DeclaredSet, Name};
use quill_value::{stale_scope, EvalError, HashValue, ScopeId, Value};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// Written by `[#global]`; shared by every namespace of a render.
    Global,
    /// The host data model and configuration-level shared variables.
    DataModel,
    /// Top-level variables of one template (main or imported).
    Namespace,
    /// One macro or function invocation.
    Macro,
    /// One `[#list]` execution.
    LoopBody,
    /// One re-entry of a caller-supplied body.
    NestedBody,
}

impl FrameKind {
    /// Frames that resolve by static declaration rather than by presence.
    #[inline]
    pub fn is_block(self) -> bool {
        matches!(
            self,
            FrameKind::Macro | FrameKind::LoopBody | FrameKind::NestedBody
        )
    }
}

#[derive(Debug)]
pub struct Frame {
    kind: FrameKind,
    declared: DeclaredSet,
    bindings: FxHashMap<Name, Value>,
    /// Entries bound by text (data-model frames only).
    external: HashValue,
    parent: Option<ScopeId>,
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn declares(&self, name: Name) -> bool {
        self.declared.contains(name)
    }

    /// Binding held by this frame itself.
    pub fn get(&self, name: Name) -> Option<&Value> {
        self.bindings.get(&name)
    }

    /// Binding held by this frame, by interned name or by text.
    pub fn get_text(&self, name: Option<Name>, text: &str) -> Option<&Value> {
        name.and_then(|name| self.bindings.get(&name))
            .or_else(|| self.external.get(text))
    }

    pub fn names(&self) -> impl Iterator<Item = Name> + '_ {
        self.bindings.keys().copied()
    }

    /// Entries bound by text.
    pub fn external(&self) -> &HashValue {
        &self.external
    }
}

/// Outcome of resolving an unqualified name.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    Found(Value),
    /// Some frame declares the name but it has no value yet.
    Unbound,
    /// No frame on the chain declares the name.
    Undeclared,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    frame: Option<Frame>,
}

/// Arena of live frames for one render.
#[derive(Debug, Default)]
pub struct ScopeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a frame. Slots of released frames are reused under a new
    /// generation.
    pub fn push(
        &mut self,
        kind: FrameKind,
        declared: DeclaredSet,
        parent: Option<ScopeId>,
    ) -> ScopeId {
        let frame = Frame {
            kind,
            declared,
            bindings: FxHashMap::default(),
            external: HashValue::new(),
            parent,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.frame = Some(frame);
            return ScopeId::new(index, slot.generation);
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            frame: Some(frame),
        });
        ScopeId::new(index, 0)
    }

    /// Destroy a frame; outstanding handles to it become stale.
    pub fn release(&mut self, id: ScopeId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            if slot.generation == id.generation() && slot.frame.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "slot indices are created from u32"
                )]
                self.free.push(id.index() as u32);
            }
        }
    }

    pub fn get(&self, id: ScopeId) -> Result<&Frame, EvalError> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.frame.as_ref())
            .ok_or_else(stale_scope)
    }

    fn get_mut(&mut self, id: ScopeId) -> Result<&mut Frame, EvalError> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.frame.as_mut())
            .ok_or_else(stale_scope)
    }

    pub fn is_live(&self, id: ScopeId) -> bool {
        self.get(id).is_ok()
    }

    /// Bind `name` in exactly this frame.
    pub fn set(&mut self, id: ScopeId, name: Name, value: Value) -> Result<(), EvalError> {
        self.get_mut(id)?.bindings.insert(name, value);
        Ok(())
    }

    /// Bind `key` by its text in exactly this frame.
    pub fn set_text(&mut self, id: ScopeId, key: Arc<str>, value: Value) -> Result<(), EvalError> {
        self.get_mut(id)?.external.insert(key, value);
        Ok(())
    }

    /// Resolve a name starting at `start` and walking enclosing frames.
    ///
    /// `name` is `None` for text the interner has never seen; such a name can
    /// only be bound by text.
    pub fn lookup(
        &self,
        start: ScopeId,
        name: Option<Name>,
        text: &str,
    ) -> Result<Lookup, EvalError> {
        let declares = |frame: &Frame| name.is_some_and(|name| frame.declares(name));
        let mut current = Some(start);
        let mut declared_above = false;
        while let Some(id) = current {
            let frame = self.get(id)?;
            if frame.kind.is_block() {
                if declares(frame) {
                    return Ok(frame
                        .get_text(name, text)
                        .cloned()
                        .map_or(Lookup::Unbound, Lookup::Found));
                }
            } else if let Some(value) = frame.get_text(name, text) {
                return Ok(Lookup::Found(value.clone()));
            } else if declares(frame) {
                declared_above = true;
            }
            current = frame.parent;
        }
        Ok(if declared_above {
            Lookup::Unbound
        } else {
            Lookup::Undeclared
        })
    }

    /// Target frame of a plain assignment: the nearest block frame declaring
    /// `name`, else the first namespace on the chain.
    pub fn assignment_target(&self, start: ScopeId, name: Name) -> Result<ScopeId, EvalError> {
        let mut current = Some(start);
        while let Some(id) = current {
            let frame = self.get(id)?;
            if frame.kind == FrameKind::Namespace || (frame.kind.is_block() && frame.declares(name))
            {
                return Ok(id);
            }
            current = frame.parent;
        }
        Ok(start)
    }

    /// Nearest enclosing frame of `kind`.
    pub fn nearest(&self, start: ScopeId, kind: FrameKind) -> Result<Option<ScopeId>, EvalError> {
        let mut current = Some(start);
        while let Some(id) = current {
            let frame = self.get(id)?;
            if frame.kind == kind {
                return Ok(Some(id));
            }
            current = frame.parent;
        }
        Ok(None)
    }

    /// Number of live frames.
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
