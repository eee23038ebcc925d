use libski::{Kind, Symbol};

/// A snapshot of one arena node's fields, returned by [`Arena`](super::Arena)
/// accessors. Not a live view — the arena itself stays the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSlot {
    pub kind: Kind,
    pub sym: u8,
    pub left: u32,
    pub right: u32,
    pub hash: u32,
}

impl NodeSlot {
    pub fn symbol(&self) -> Option<Symbol> {
        if self.kind == Kind::Terminal {
            Some(Symbol::from_u8(self.sym))
        } else {
            None
        }
    }
}
