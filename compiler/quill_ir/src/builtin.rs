//! Builtin identifiers (`value?name`).
//!
//! The parser records the raw name; the annotator resolves it to a
//! [`BuiltinKind`] once, so evaluation dispatches on an enum instead of
//! comparing strings on every call.

use std::fmt;

/// What kind of left-hand operand a builtin accepts.
///
/// Used both for runtime "unexpected variant" errors (via [`describe`]) and
/// for the annotator's literal-context checks.
///
/// [`describe`]: OperandCategory::describe
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperandCategory {
    Any,
    String,
    Number,
    Boolean,
    Date,
    /// String, number, boolean or date.
    Scalar,
    Sequence,
    Hash,
    SequenceOrHash,
    Node,
    Macro,
    Scope,
    RegexMatch,
}

impl OperandCategory {
    /// Human-readable category used in type-mismatch messages.
    pub fn describe(self) -> &'static str {
        match self {
            OperandCategory::Any => "any value",
            OperandCategory::String => "string",
            OperandCategory::Number => "number",
            OperandCategory::Boolean => "boolean",
            OperandCategory::Date => "date",
            OperandCategory::Scalar => "string, number, boolean or date",
            OperandCategory::Sequence => "sequence",
            OperandCategory::Hash => "hash",
            OperandCategory::SequenceOrHash => "hash or sequence",
            OperandCategory::Node => "node",
            OperandCategory::Macro => "macro",
            OperandCategory::Scope => "scope",
            OperandCategory::RegexMatch => "regular-expression match",
        }
    }
}

impl fmt::Display for OperandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

macro_rules! builtins {
    ($($variant:ident => $name:literal, $category:ident;)*) => {
        /// Every builtin the engine knows.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum BuiltinKind {
            $($variant,)*
        }

        impl BuiltinKind {
            /// All builtins, in declaration order.
            pub const ALL: &'static [BuiltinKind] = &[$(BuiltinKind::$variant,)*];

            /// Resolve a builtin by its template-level name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(BuiltinKind::$variant),)*
                    _ => None,
                }
            }

            /// Template-level name (`upper_case`, `size`, ...).
            pub fn name(self) -> &'static str {
                match self {
                    $(BuiltinKind::$variant => $name,)*
                }
            }

            /// The operand category this builtin is defined for.
            pub fn operand(self) -> OperandCategory {
                match self {
                    $(BuiltinKind::$variant => OperandCategory::$category,)*
                }
            }
        }
    };
}

builtins! {
    // Strings
    UpperCase => "upper_case", String;
    LowerCase => "lower_case", String;
    CapFirst => "cap_first", String;
    UncapFirst => "uncap_first", String;
    Capitalize => "capitalize", String;
    Trim => "trim", String;
    Length => "length", String;
    Contains => "contains", String;
    StartsWith => "starts_with", String;
    EndsWith => "ends_with", String;
    Replace => "replace", String;
    Split => "split", String;
    IndexOf => "index_of", String;
    Number => "number", String;
    Boolean => "boolean", String;
    Html => "html", String;
    Xml => "xml", String;
    Url => "url", String;
    JsString => "js_string", String;
    JsonString => "json_string", String;
    Matches => "matches", String;
    Interpret => "interpret", String;
    Groups => "groups", RegexMatch;
    // Sequences and hashes
    Size => "size", SequenceOrHash;
    First => "first", Sequence;
    Last => "last", Sequence;
    Reverse => "reverse", Sequence;
    Sort => "sort", Sequence;
    SortBy => "sort_by", Sequence;
    Join => "join", Sequence;
    SeqContains => "seq_contains", Sequence;
    SeqIndexOf => "seq_index_of", Sequence;
    Chunk => "chunk", Sequence;
    Keys => "keys", Hash;
    Values => "values", Hash;
    // Numbers and formatting
    String => "string", Scalar;
    C => "c", Scalar;
    Round => "round", Number;
    Floor => "floor", Number;
    Ceiling => "ceiling", Number;
    Abs => "abs", Number;
    Int => "int", Number;
    IsNan => "is_nan", Number;
    IsInfinite => "is_infinite", Number;
    // Booleans
    Then => "then", Boolean;
    // Dates
    Iso => "iso", Date;
    Date => "date", Date;
    Time => "time", Date;
    Datetime => "datetime", Date;
    Long => "long", Date;
    // Nodes
    NodeName => "node_name", Node;
    NodeType => "node_type", Node;
    Children => "children", Node;
    Parent => "parent", Node;
    Root => "root", Node;
    Ancestors => "ancestors", Node;
    Text => "text", Node;
    // Callables and scopes
    Namespace => "namespace", Macro;
    Lookup => "lookup", Scope;
    // Existence
    HasContent => "has_content", Any;
    IsDeclared => "is_declared", Any;
    // Reflection
    TypeName => "type_name", Any;
    IsString => "is_string", Any;
    IsNumber => "is_number", Any;
    IsBoolean => "is_boolean", Any;
    IsDate => "is_date", Any;
    IsSequence => "is_sequence", Any;
    IsHash => "is_hash", Any;
    IsNode => "is_node", Any;
    IsMacro => "is_macro", Any;
    IsFunction => "is_function", Any;
    IsScope => "is_scope", Any;
    IsNothing => "is_nothing", Any;
}

impl BuiltinKind {
    /// Builtins that inspect the operand's presence rather than its value,
    /// so a missing operand is not an error for them.
    pub fn tolerates_missing(self) -> bool {
        matches!(self, BuiltinKind::HasContent | BuiltinKind::IsDeclared)
    }
}

impl fmt::Display for BuiltinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name())
    }
}
