//! Capability set threaded through a render.
//!
//! Sensitive operations check for their capability before acting; a missing
//! capability is fatal to the render.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `?interpret`: compile template text at render time.
        const INTERPRET = 1 << 0;
        /// `[#include]` and `[#import]`.
        const INCLUDE = 1 << 1;
        /// Calling host functions and host-object adapters.
        const HOST_CALLS = 1 << 2;
        /// `[#visit]` and `[#recurse]`.
        const NODE_VISIT = 1 << 3;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::all()
    }
}

const NAMES: &[(&str, Capabilities)] = &[
    ("interpret", Capabilities::INTERPRET),
    ("include", Capabilities::INCLUDE),
    ("host_calls", Capabilities::HOST_CALLS),
    ("node_visit", Capabilities::NODE_VISIT),
];

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability `{0}`")]
pub struct UnknownCapability(pub String);

impl Capabilities {
    /// Parse a capability by its configuration name (`interpret`, `include`,
    /// `host_calls`, `node_visit`).
    pub fn parse_name(name: &str) -> Result<Self, UnknownCapability> {
        NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, cap)| *cap)
            .ok_or_else(|| UnknownCapability(name.to_owned()))
    }

    /// Union of the named capabilities.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, UnknownCapability> {
        names.iter().try_fold(Capabilities::empty(), |acc, name| {
            Ok(acc | Capabilities::parse_name(name.as_ref())?)
        })
    }

    /// Configuration name of a single capability.
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, cap)| *cap == self)
            .map_or("<multiple>", |(n, _)| n)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, cap) in NAMES {
            if self.contains(*cap) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
