//! Functions every program can call without declaring them.

/// Number of arguments a builtin accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// Any number of arguments, including none.
    Variadic,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exact(arity) => *arity == count,
            Arity::Variadic => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    /// Type name of the result, `None` when the builtin produces no value.
    pub ret_ty: Option<&'static str>,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "print",
        arity: Arity::Variadic,
        ret_ty: None,
    },
    Builtin {
        name: "length",
        arity: Arity::Exact(1),
        ret_ty: Some("integer"),
    },
    Builtin {
        name: "chr",
        arity: Arity::Exact(1),
        ret_ty: Some("string"),
    },
    Builtin {
        name: "asc",
        arity: Arity::Exact(2),
        ret_ty: Some("integer"),
    },
    // target of the `expr &` sugar
    Builtin {
        name: "fork",
        arity: Arity::Exact(1),
        ret_ty: None,
    },
];

/// Looks up a builtin by its (case-folded) name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("asc").map(|b| b.arity), Some(Arity::Exact(2)));
        assert!(lookup("print").map_or(false, |b| b.arity.accepts(5)));
        assert!(lookup("substr").is_none());
    }
}
