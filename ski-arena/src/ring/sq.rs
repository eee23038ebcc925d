/// Submission queue entry: host → worker.
///
/// Carries everything a worker needs to run one unit of work without
/// consulting any other shared state besides the arena itself.
#[derive(Debug, Clone, Copy)]
pub struct Sqe {
    /// Node id of the expression to evaluate, or a Suspension id to resume.
    pub node_id: u32,
    /// Correlates this submission's eventual completion back to the
    /// request that issued it.
    pub req_id: u32,
    /// Reduction budget for this submission specifically (not cumulative
    /// across resubmissions — each submission gets its own allotment).
    pub max_steps: u32,
}
