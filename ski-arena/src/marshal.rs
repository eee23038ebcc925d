//! Conversions between arena node ids and a plain, owned expression tree —
//! the shape a caller actually wants to build expressions in or read
//! results back as, rather than juggling raw ids.

use std::collections::HashMap;

use libski::{Kind, Symbol};

use crate::arena::{Arena, NodeSlot};
use crate::error::Result;

/// An owned SKI expression, independent of any particular arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Sym(Symbol),
    App(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn app(l: Expr, r: Expr) -> Expr {
        Expr::App(Box::new(l), Box::new(r))
    }
}

/// Allocate an [`Expr`] tree into the arena. Two equal subtrees don't
/// automatically collapse to one node on the way in — the arena's own
/// hash-consing (`alloc_terminal`/`alloc_cons`) is what dedups them, by
/// content, as each node gets allocated.
pub fn marshal_in(arena: &Arena, expr: &Expr) -> Result<u32> {
    match expr {
        Expr::Sym(sym) => arena.alloc_terminal(*sym),
        Expr::App(l, r) => {
            let l = marshal_in(arena, l)?;
            let r = marshal_in(arena, r)?;
            arena.alloc_cons(l, r)
        }
    }
}

/// Read an arena node id back out as an owned [`Expr`] tree, memoizing by
/// id so a heavily shared DAG doesn't get walked once per reference.
pub fn marshal_out(arena: &Arena, id: u32) -> Expr {
    let mut cache: HashMap<u32, Expr> = HashMap::new();
    marshal_out_inner(arena, id, &mut cache)
}

fn marshal_out_inner(arena: &Arena, id: u32, cache: &mut HashMap<u32, Expr>) -> Expr {
    if let Some(expr) = cache.get(&id) {
        return expr.clone();
    }
    let slot = arena.get(id).expect("marshal_out called with an id outside the arena");
    let expr = match slot.kind {
        Kind::Terminal => Expr::Sym(Symbol::from_u8(slot.sym)),
        Kind::NonTerminal => {
            let l = marshal_out_inner(arena, slot.left, cache);
            let r = marshal_out_inner(arena, slot.right, cache);
            Expr::app(l, r)
        }
        other => panic!("marshal_out: node {id} is a {other:?}, not an expression"),
    };
    cache.insert(id, expr.clone());
    expr
}

/// One row of [`dump_arena`]'s output: a live node's raw fields, for
/// debugging or for replaying an arena's contents elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaRow {
    pub id: u32,
    pub slot: NodeSlot,
}

/// Stream every live (non-`Hole`) node in id order. Does not allocate the
/// whole dump up front — callers doing a partial scan can stop early.
pub fn dump_arena(arena: &Arena) -> impl Iterator<Item = ArenaRow> + '_ {
    (0..arena.top()).filter_map(move |id| {
        arena.get(id).filter(|s| s.kind != Kind::Hole).map(|slot| ArenaRow { id, slot })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn arena() -> Arena {
        let config = Config::builder().initial_capacity(64).bucket_count(64).build().unwrap();
        Arena::new(&config)
    }

    #[test]
    fn round_trips_a_simple_expression() {
        let arena = arena();
        let expr = Expr::app(Expr::Sym(Symbol::I), Expr::Sym(Symbol::K));
        let id = marshal_in(&arena, &expr).unwrap();
        assert_eq!(marshal_out(&arena, id), expr);
    }

    #[test]
    fn shared_subtrees_hash_cons_to_one_node() {
        let arena = arena();
        let shared = Expr::Sym(Symbol::S);
        let expr = Expr::app(shared.clone(), shared);
        let id = marshal_in(&arena, &expr).unwrap();
        let slot = arena.get(id).unwrap();
        assert_eq!(slot.left, slot.right);
    }

    #[test]
    fn dump_arena_skips_nothing_live() {
        let arena = arena();
        let expr = Expr::app(Expr::Sym(Symbol::I), Expr::Sym(Symbol::K));
        marshal_in(&arena, &expr).unwrap();
        let rows: Vec<_> = dump_arena(&arena).collect();
        assert_eq!(rows.len(), arena.top() as usize);
        assert!(rows.iter().all(|r| r.slot.kind != Kind::Hole));
    }
}
