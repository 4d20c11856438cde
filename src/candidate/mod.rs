//! Candidate bookkeeping for scan results.

pub(crate) mod topk;
