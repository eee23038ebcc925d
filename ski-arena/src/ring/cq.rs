use crate::error::Error;

/// Completion queue entry: worker → host.
#[derive(Debug, Clone)]
pub struct Cqe {
    /// Result node id (reduction reached a fixed point) or Suspension node
    /// id (the worker yielded — see [`Cqe::suspended`]). Meaningless
    /// (`EMPTY_ID`) when `fault` is set.
    pub node_id: u32,
    /// Matches the [`Sqe::req_id`](super::Sqe::req_id) that produced this
    /// completion.
    pub req_id: u32,
    /// Whether `node_id` is a Suspension awaiting resubmission rather than
    /// a finished result.
    pub suspended: bool,
    /// Set when the worker trapped on a fatal error instead of producing a
    /// result or a suspension.
    pub fault: Option<Error>,
}
