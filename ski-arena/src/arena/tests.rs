use super::*;
use libski::Symbol;

fn small_arena() -> Arena {
    let config = Config::builder()
        .initial_capacity(4)
        .max_capacity(1 << 16)
        .bucket_count(4)
        .build()
        .unwrap();
    Arena::new(&config)
}

#[test]
fn terminal_alloc_is_cached_per_symbol() {
    let arena = small_arena();
    let a = arena.alloc_terminal(Symbol::S).unwrap();
    let b = arena.alloc_terminal(Symbol::S).unwrap();
    assert_eq!(a, b);
    let k = arena.alloc_terminal(Symbol::K).unwrap();
    assert_ne!(a, k);
}

#[test]
fn cons_hash_conses_identical_pairs() {
    let arena = small_arena();
    let s = arena.alloc_terminal(Symbol::S).unwrap();
    let k = arena.alloc_terminal(Symbol::K).unwrap();
    let a = arena.alloc_cons(s, k).unwrap();
    let b = arena.alloc_cons(s, k).unwrap();
    assert_eq!(a, b);
    assert_eq!(arena.kind_of(a), Kind::NonTerminal);
    assert_eq!(arena.left_of(a), s);
    assert_eq!(arena.right_of(a), k);
}

#[test]
fn cons_distinguishes_distinct_pairs() {
    let arena = small_arena();
    let s = arena.alloc_terminal(Symbol::S).unwrap();
    let k = arena.alloc_terminal(Symbol::K).unwrap();
    let i = arena.alloc_terminal(Symbol::I).unwrap();
    let a = arena.alloc_cons(s, k).unwrap();
    let b = arena.alloc_cons(s, i).unwrap();
    assert_ne!(a, b);
}

#[test]
fn growth_preserves_existing_ids() {
    let arena = small_arena();
    let mut ids = Vec::new();
    for _ in 0..4 {
        let s = arena.alloc_terminal(Symbol::S).unwrap();
        let k = arena.alloc_terminal(Symbol::K).unwrap();
        ids.push(arena.alloc_cons(s, k).unwrap());
    }
    assert!(arena.capacity() >= 4);
    // allocate enough fresh NonTerminal nodes to force at least one grow
    let mut prev = arena.alloc_terminal(Symbol::I).unwrap();
    for _ in 0..64 {
        prev = arena.alloc_cons(prev, prev).unwrap();
    }
    assert!(arena.capacity() > 4);
    for (i, id) in ids.iter().enumerate() {
        let slot = arena.get(*id).unwrap();
        assert_eq!(slot.kind, Kind::NonTerminal, "node {i} survived growth");
    }
}

#[test]
fn reset_invalidates_top() {
    let arena = small_arena();
    let s = arena.alloc_terminal(Symbol::S).unwrap();
    assert!(arena.top() > 0);
    arena.reset();
    assert_eq!(arena.top(), 0);
    let s2 = arena.alloc_terminal(Symbol::S).unwrap();
    assert_eq!(s2, 0);
    let _ = s;
}

#[test]
fn exhaustion_is_reported_not_panicked() {
    let config = Config::builder()
        .initial_capacity(4)
        .max_capacity(4)
        .bucket_count(4)
        .build()
        .unwrap();
    let arena = Arena::new(&config);
    for sym in [Symbol::S, Symbol::K, Symbol::I, Symbol::B] {
        arena.alloc_terminal(sym).unwrap();
    }
    let err = arena.alloc_terminal(Symbol::C).unwrap_err();
    assert_eq!(err, Error::ArenaExhausted);
}
