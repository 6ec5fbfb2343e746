/// Native machine types known to the backends.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NativeType {
    Int32,
    Int64,
}

impl NativeType {
    /// The string representation expected by LLVM IR.
    pub fn ir_name(self) -> &'static str {
        match self {
            NativeType::Int32 => "i32",
            NativeType::Int64 => "i64",
        }
    }

    /// The default alignment, in bytes. Derived from the kind, never stored.
    pub fn alignment(self) -> u32 {
        match self {
            NativeType::Int32 => 4,
            NativeType::Int64 => 8,
        }
    }
}

/// A closed set of types. Currently a single family: types backed directly
/// by a native machine type. Two types are structurally equal iff their
/// variants and native kinds match.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    System(SystemType),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SystemType {
    pub native: NativeType,
}

impl Type {
    pub const INT32: Type = Type::System(SystemType {
        native: NativeType::Int32,
    });
    pub const INT64: Type = Type::System(SystemType {
        native: NativeType::Int64,
    });

    pub fn ir_name(self) -> &'static str {
        match self {
            Type::System(s) => s.native.ir_name(),
        }
    }

    pub fn alignment(self) -> u32 {
        match self {
            Type::System(s) => s.native.alignment(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A node carries both a specified and an inferred type and they are
    /// not structurally equal.
    DeducedMismatch { specified: Type, inferred: Type },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Type::INT32, Type::INT32);
        assert_ne!(Type::INT32, Type::INT64);
        assert_eq!(
            Type::System(SystemType {
                native: NativeType::Int32
            }),
            Type::INT32
        );
    }

    #[test]
    fn test_alignment_is_derived() {
        assert_eq!(Type::INT32.alignment(), 4);
        assert_eq!(Type::INT64.alignment(), 8);
        assert_eq!(Type::INT32.ir_name(), "i32");
    }
}
