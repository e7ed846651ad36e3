//! Error codes for every diagnostic the engine produces.
//!
//! Format: `E####`, first digit names the phase:
//! - E0xxx: lexical errors in directives and expressions
//! - E1xxx: parse errors
//! - E2xxx: validation problems found by the annotator
//! - E6xxx: render-time errors
//! - E7xxx: template loading and cache errors
//! - E9xxx: internal errors
//!
//! Warnings use `W####` with the same phase digits.

use std::fmt;
use std::str::FromStr;

macro_rules! error_codes {
    ($($code:ident => $description:literal,)*) => {
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        pub enum ErrorCode {
            $(#[doc = $description] $code,)*
        }

        impl ErrorCode {
            pub const ALL: &'static [ErrorCode] = &[$(ErrorCode::$code,)*];

            /// The code as written in output (`E2004`).
            pub fn as_str(self) -> &'static str {
                match self {
                    $(ErrorCode::$code => stringify!($code),)*
                }
            }

            /// One-line summary of what the code means.
            pub fn description(self) -> &'static str {
                match self {
                    $(ErrorCode::$code => $description,)*
                }
            }
        }

        impl FromStr for ErrorCode {
            type Err = UnknownErrorCode;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($code) => Ok(ErrorCode::$code),)*
                    _ => Err(UnknownErrorCode(s.to_owned())),
                }
            }
        }
    };
}

error_codes! {
    // Lexical
    E0001 => "unterminated string literal",
    E0002 => "invalid character in expression",
    E0003 => "invalid number literal",
    E0004 => "unterminated comment",
    E0005 => "unterminated interpolation or directive tag",
    E0006 => "invalid escape sequence in string literal",

    // Parse
    E1001 => "unexpected token",
    E1002 => "expected expression",
    E1003 => "directive is never closed",
    E1004 => "end tag does not match the open directive",
    E1005 => "unknown directive",
    E1006 => "directive in an invalid position",
    E1007 => "malformed directive parameters",
    E1008 => "positional and named arguments mixed in one call",

    // Validation
    E2001 => "`return` outside a macro or function",
    E2002 => "`nested` or `fallback` outside a macro",
    E2003 => "`break` outside a loop or switch",
    E2004 => "function must return a value",
    E2005 => "macro returns a value",
    E2006 => "more than one default case in a switch",
    E2007 => "`local` outside a macro or function",
    E2008 => "unknown builtin",
    E2009 => "literal has the wrong type for its context",
    E2010 => "duplicate parameter name",
    E2011 => "required parameter after a parameter with a default",
    E2012 => "unknown setting",
    E2013 => "function returns without a value",

    // Render
    E6001 => "division by zero",
    E6002 => "integer overflow",
    E6010 => "type mismatch",
    E6011 => "invalid operands for operator",
    E6020 => "undeclared variable",
    E6021 => "unbound variable",
    E6022 => "missing member or key",
    E6023 => "index out of bounds",
    E6030 => "missing argument",
    E6031 => "too many arguments",
    E6032 => "unknown parameter",
    E6033 => "value is not callable",
    E6040 => "invalid scope target",
    E6041 => "stale scope handle",
    E6050 => "call depth exceeded",
    E6060 => "missing capability",
    E6070 => "host adapter failure",
    E6080 => "invalid regular expression",
    E6081 => "invalid value for builtin",
    E6090 => "output sink failure",
    E6091 => "template stopped",
    E6099 => "error raised by a nested template",

    // Loading and cache
    E7001 => "template not found",
    E7002 => "template source could not be read",
    E7003 => "template failed to compile",

    // Internal
    E9001 => "internal engine error",

    // Warnings
    W2001 => "literal has the wrong type for its context",
}

impl ErrorCode {
    pub fn is_lexical(self) -> bool {
        self.as_str().starts_with("E0")
    }

    pub fn is_parse(self) -> bool {
        self.as_str().starts_with("E1")
    }

    pub fn is_validation(self) -> bool {
        let code = self.as_str();
        code.starts_with("E2") || code.starts_with("W2")
    }

    pub fn is_render(self) -> bool {
        self.as_str().starts_with("E6")
    }

    pub fn is_loading(self) -> bool {
        self.as_str().starts_with("E7")
    }

    pub fn is_warning(self) -> bool {
        self.as_str().starts_with('W')
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`ErrorCode::from_str`] for a code that does not exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownErrorCode(pub String);

impl fmt::Display for UnknownErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown error code `{}`", self.0)
    }
}

impl std::error::Error for UnknownErrorCode {}
