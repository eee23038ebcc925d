//! The iterative, suspendable reducer.
//!
//! Reduction never recurses: the call stack the naive recursive evaluator
//! would build is instead a chain of Continuation nodes living in the same
//! arena as the expression being reduced, so a worker can stop mid-traversal
//! and hand the whole in-flight computation — stack included — back to the
//! host as a single node id.


use libski::{Kind, Mode, Stage, SuspendReason, Symbol, EMPTY_ID};

use crate::arena::Arena;
use crate::error::Result;

/// Source of external values for the `,`/`.` IO primitives. A pure
/// combinator build that never allocates one of these symbols can use
/// [`NullIo`], which always reports a blocked port.
pub trait IoPort {
    /// Try to pull the next input value, returning its arena node id.
    fn try_read(&self) -> Option<u32>;
    /// Try to emit a value; `false` means the port is full/blocked.
    fn try_write(&self, value: u32) -> bool;
}

/// An [`IoPort`] for builds that never use the IO primitives.
pub struct NullIo;

impl IoPort for NullIo {
    fn try_read(&self) -> Option<u32> {
        None
    }
    fn try_write(&self, _value: u32) -> bool {
        false
    }
}

/// Result of driving the reducer for a bounded amount of work.
pub enum StepOutcome {
    /// Reduction reached normal form (or ran out of reductions to perform);
    /// the node is the result.
    Done(u32),
    /// Work was interrupted; resume with [`resume`] using this Suspension
    /// node id.
    Suspended(u32),
}

/// Run the descend/return state machine from a fresh expression.
///
/// `gas` bounds AST traversal steps per call (cooperative yielding even when
/// no reduction has happened yet); `remaining_steps` bounds the number of
/// actual rewrites performed, decremented exactly once per reduction.
pub fn step(
    arena: &Arena,
    io: &dyn IoPort,
    expr: u32,
    gas: u32,
    remaining_steps: u32,
) -> Result<StepOutcome> {
    step_iterative(arena, io, expr, EMPTY_ID, Mode::Descend, gas, remaining_steps, EMPTY_ID)
}

/// Resume a previously suspended computation.
///
/// `extra_steps` is added to whatever reduction budget the suspension had
/// left. An IoWait suspension's stored budget is whatever it had when it
/// blocked (so `extra_steps = 0` just retries the IO); a StepBudget
/// suspension's stored budget is always zero, so resuming it productively
/// means granting a fresh allotment here.
pub fn resume(arena: &Arena, io: &dyn IoPort, suspension: u32, gas: u32, extra_steps: u32) -> Result<StepOutcome> {
    let slot = arena
        .get(suspension)
        .filter(|s| s.kind == Kind::Suspension)
        .expect("resume called on a non-Suspension node");
    let (_, mode) = libski::unpack_suspend_sym(slot.sym);
    let remaining_steps = slot.hash.saturating_add(extra_steps);
    step_iterative(arena, io, slot.left, slot.right, mode, gas, remaining_steps, EMPTY_ID)
}

/// Drive reduction to normal form or exhaustion, without ever suspending
/// (single-threaded convenience wrapper; used by tests and by callers that
/// don't need the step-budget/IO-wait machinery).
///
/// A single [`step`] call walks the leftmost spine and keeps reducing as it
/// unwinds, but stops the instant its stack empties — including right after
/// a reduction it just performed at what's left of the root, without
/// re-examining that fresh result. So reaching full normal form means
/// calling it repeatedly from the top until a call changes nothing, exactly
/// as the reference arena's own `reduce` wrapper loops over single steps.
pub fn reduce(arena: &Arena, expr: u32, max_iterations: u32) -> Result<u32> {
    let mut cur = expr;
    for _ in 0..max_iterations {
        match step(arena, &NullIo, cur, u32::MAX, u32::MAX)? {
            StepOutcome::Done(next) => {
                if next == cur {
                    break;
                }
                cur = next;
            }
            // NullIo never blocks and the budgets above are unbounded, so a
            // suspension here can't happen.
            StepOutcome::Suspended(_) => break,
        }
    }
    Ok(cur)
}

fn is_terminal(arena: &Arena, id: u32, sym: Symbol) -> bool {
    id != EMPTY_ID && arena.kind_of(id) == Kind::Terminal && arena.sym_of(id) == sym as u8
}

#[allow(clippy::too_many_arguments)]
fn step_iterative(
    arena: &Arena,
    io: &dyn IoPort,
    mut curr: u32,
    mut stack: u32,
    mut mode: Mode,
    mut gas: u32,
    mut remaining_steps: u32,
    mut free_node: u32,
) -> Result<StepOutcome> {
    loop {
        if gas == 0 {
            let sym = libski::pack_suspend_sym(SuspendReason::StepBudget, mode);
            return Ok(StepOutcome::Suspended(arena.alloc_suspension(curr, stack, sym, remaining_steps)?));
        }
        gas -= 1;

        if mode == Mode::Return {
            if stack == EMPTY_ID {
                return Ok(StepOutcome::Done(curr));
            }

            let recycled = stack;
            stack = arena.left_of(recycled);
            let parent_node = arena.right_of(recycled);
            let stage = Stage::from_u8(arena.sym_of(recycled));

            match stage {
                Stage::Left => {
                    let orig_left = arena.left_of(parent_node);
                    if curr != orig_left {
                        curr = arena.alloc_cons(curr, arena.right_of(parent_node))?;
                        free_node = recycled;
                        mode = Mode::Return;
                        continue;
                    }
                    arena.update_continuation(recycled, stack, parent_node, Stage::Right as u8);
                    stack = recycled;
                    mode = Mode::Descend;
                    curr = arena.right_of(parent_node);
                    continue;
                }
                Stage::Right => {
                    let orig_right = arena.right_of(parent_node);
                    if curr != orig_right {
                        curr = arena.alloc_cons(arena.left_of(parent_node), curr)?;
                    } else {
                        curr = parent_node;
                    }
                    free_node = recycled;
                    mode = Mode::Return;
                    continue;
                }
            }
        }

        // Mode::Descend
        if arena.kind_of(curr) != Kind::NonTerminal {
            mode = Mode::Return;
            continue;
        }

        let left = arena.left_of(curr);
        let right = arena.right_of(curr);

        if let Some(rewritten) = try_redex(arena, io, left, right)? {
            match rewritten {
                Redex::Value(next) => {
                    if remaining_steps == 0 {
                        let sym = libski::pack_suspend_sym(SuspendReason::StepBudget, Mode::Descend);
                        return Ok(StepOutcome::Suspended(arena.alloc_suspension(curr, stack, sym, 0)?));
                    }
                    remaining_steps -= 1;
                    curr = next;
                    mode = Mode::Return;
                    if remaining_steps == 0 {
                        let sym = libski::pack_suspend_sym(SuspendReason::StepBudget, mode);
                        return Ok(StepOutcome::Suspended(arena.alloc_suspension(curr, stack, sym, 0)?));
                    }
                    continue;
                }
                Redex::Blocked => {
                    let sym = libski::pack_suspend_sym(SuspendReason::IoWait, Mode::Descend);
                    return Ok(StepOutcome::Suspended(arena.alloc_suspension(curr, stack, sym, remaining_steps)?));
                }
            }
        }

        if free_node != EMPTY_ID {
            arena.update_continuation(free_node, stack, curr, Stage::Left as u8);
            stack = free_node;
            free_node = EMPTY_ID;
        } else {
            stack = arena.alloc_continuation(stack, curr, Stage::Left as u8)?;
        }
        curr = left;
        mode = Mode::Descend;
    }
}

enum Redex {
    Value(u32),
    Blocked,
}

/// Check whether `(left right)` is a redex, and if so compute its
/// replacement. `Ok(None)` means no rule applies and the caller should keep
/// descending into `left`.
fn try_redex(arena: &Arena, io: &dyn IoPort, left: u32, right: u32) -> Result<Option<Redex>> {
    // I x -> x
    if is_terminal(arena, left, Symbol::I) {
        return Ok(Some(Redex::Value(right)));
    }

    // (, k) -> read one input value v, continue as (k v)
    if is_terminal(arena, left, Symbol::ReadOne) {
        return Ok(Some(match io.try_read() {
            Some(v) => Redex::Value(arena.alloc_cons(right, v)?),
            None => Redex::Blocked,
        }));
    }

    if arena.kind_of(left) != Kind::NonTerminal {
        return Ok(None);
    }
    let ll = arena.left_of(left);
    let lr = arena.right_of(left);

    // K x y -> x
    if is_terminal(arena, ll, Symbol::K) {
        return Ok(Some(Redex::Value(lr)));
    }

    // (. v) k -> write v, continue as k
    if is_terminal(arena, ll, Symbol::WriteOne) {
        return Ok(Some(if io.try_write(lr) {
            Redex::Value(right)
        } else {
            Redex::Blocked
        }));
    }

    if arena.kind_of(ll) != Kind::NonTerminal {
        return Ok(None);
    }
    let lll = arena.left_of(ll);
    let llr = arena.right_of(ll);

    // S x y z -> x z (y z)
    if is_terminal(arena, lll, Symbol::S) {
        let x = llr;
        let y = lr;
        let z = right;
        let xz = arena.alloc_cons(x, z)?;
        let yz = arena.alloc_cons(y, z)?;
        return Ok(Some(Redex::Value(arena.alloc_cons(xz, yz)?)));
    }

    // B x y z -> x (y z)
    if is_terminal(arena, lll, Symbol::B) {
        let x = llr;
        let y = lr;
        let z = right;
        let yz = arena.alloc_cons(y, z)?;
        return Ok(Some(Redex::Value(arena.alloc_cons(x, yz)?)));
    }

    // C x y z -> x z y
    if is_terminal(arena, lll, Symbol::C) {
        let x = llr;
        let y = lr;
        let z = right;
        let xz = arena.alloc_cons(x, z)?;
        return Ok(Some(Redex::Value(arena.alloc_cons(xz, y)?)));
    }

    if arena.kind_of(lll) != Kind::NonTerminal {
        return Ok(None);
    }
    let llll = arena.left_of(lll);
    let lllr = arena.right_of(lll);

    // B' f g h x -> f g (h x)
    if is_terminal(arena, llll, Symbol::BPrime) {
        let f = lllr;
        let g = llr;
        let h = lr;
        let x = right;
        let hx = arena.alloc_cons(h, x)?;
        let fg = arena.alloc_cons(f, g)?;
        return Ok(Some(Redex::Value(arena.alloc_cons(fg, hx)?)));
    }

    // C' f g h x -> f (g x) h
    if is_terminal(arena, llll, Symbol::CPrime) {
        let f = lllr;
        let g = llr;
        let h = lr;
        let x = right;
        let gx = arena.alloc_cons(g, x)?;
        let f_gx = arena.alloc_cons(f, gx)?;
        return Ok(Some(Redex::Value(arena.alloc_cons(f_gx, h)?)));
    }

    // S' f g h x -> f (g x) (h x)
    if is_terminal(arena, llll, Symbol::SPrime) {
        let f = lllr;
        let g = llr;
        let h = lr;
        let x = right;
        let gx = arena.alloc_cons(g, x)?;
        let hx = arena.alloc_cons(h, x)?;
        let f_gx = arena.alloc_cons(f, gx)?;
        return Ok(Some(Redex::Value(arena.alloc_cons(f_gx, hx)?)));
    }

    Ok(None)
}
