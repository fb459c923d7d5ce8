//! Peephole optimizer configuration.

/// Switches for the individual peephole rules.
///
/// Every rule is on by default. A disabled rule never looks at the nodes it
/// would match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeepholeConfig {
    /// Drop `expand` nodes whose input already has the requested shape.
    pub eliminate_expand: bool,

    /// Collapse `transpose(transpose(x))` to `x`.
    pub cancel_transposes: bool,

    /// Drop `type_as` casts between tensors of the same dtype and device.
    pub elide_type_as: bool,

    /// Fuse `add(x, matmul(a, b))` with unit alpha into `addmm(x, a, b)`.
    pub fuse_addmm: bool,

    /// Run dead code elimination on the root block after rewriting.
    pub run_dce: bool,
}

impl PeepholeConfig {
    /// Configuration with every rule and DCE disabled.
    pub fn disabled() -> Self {
        Self {
            eliminate_expand: false,
            cancel_transposes: false,
            elide_type_as: false,
            fuse_addmm: false,
            run_dce: false,
        }
    }
}

impl Default for PeepholeConfig {
    fn default() -> Self {
        Self {
            eliminate_expand: true,
            cancel_transposes: true,
            elide_type_as: true,
            fuse_addmm: true,
            run_dce: true,
        }
    }
}
