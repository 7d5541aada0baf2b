//! Pool candidate filter and allocation strategy.
//!
//! Pure functions: given a lease and the current pool snapshot, produce the
//! ordered list of pools the lease may be scheduled to, plus a per-pool
//! reason for every pool that was rejected. The reasons end up verbatim in
//! the lease's `Fulfilled=False` condition message, so operators can read
//! why nothing fit.

use std::fmt;

use kube::Resource;
use rand::seq::SliceRandom;

use crds::{Lease, Pool, Taint, Toleration, TolerationOperator, POOL_KIND};

/// Why a pool was rejected for a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitReason {
    AlreadyAssigned,
    NotSchedulable,
    Excluded,
    NotMatchRequired,
    LabelMismatch,
    TaintNotTolerated,
    InsufficientVCPU,
    InsufficientMemory,
}

impl fmt::Display for FitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FitReason::AlreadyAssigned => "Pool already assigned to lease",
            FitReason::NotSchedulable => "Pool not schedulable",
            FitReason::Excluded => "Pool marked as excluded",
            FitReason::NotMatchRequired => "Pool does not match required pool",
            FitReason::LabelMismatch => "Pool labels do not match poolSelector",
            FitReason::TaintNotTolerated => "Pool has taints not tolerated by lease",
            FitReason::InsufficientVCPU => "Insufficient vCPUs",
            FitReason::InsufficientMemory => "Insufficient memory",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct FitDecision {
    pub pool: String,
    pub reason: FitReason,
}

/// Formats rejection decisions the way the condition message carries them:
/// `[pool-0: Insufficient vCPUs], [pool-1: Pool marked as excluded]`.
pub fn format_decisions(decisions: &[FitDecision]) -> String {
    decisions
        .iter()
        .map(|d| format!("[{}: {}]", d.pool, d.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationStrategy {
    #[default]
    Underutilized,
    Random,
}

impl AllocationStrategy {
    pub fn parse(value: &str) -> Option<AllocationStrategy> {
        match value {
            "under-utilized" => Some(AllocationStrategy::Underutilized),
            "random" => Some(AllocationStrategy::Random),
            _ => None,
        }
    }
}

/// A toleration matches a taint when the effect matches (or the toleration
/// leaves it open) and the key/value rule of its operator holds.
fn toleration_matches_taint(toleration: &Toleration, taint: &Taint) -> bool {
    if let Some(effect) = toleration.effect {
        if effect != taint.effect {
            return false;
        }
    }

    match toleration.operator {
        // Empty key tolerates every taint.
        TolerationOperator::Exists => toleration.key.is_empty() || toleration.key == taint.key,
        TolerationOperator::Equal => toleration.key == taint.key && toleration.value == taint.value,
    }
}

/// True when every taint of the pool is tolerated by the lease.
pub fn tolerates_taints(lease: &Lease, pool: &Pool) -> bool {
    pool.spec.taints.iter().all(|taint| {
        lease
            .spec
            .tolerations
            .iter()
            .any(|toleration| toleration_matches_taint(toleration, taint))
    })
}

/// True when every poolSelector entry matches a pool label exactly.
pub fn matches_selector(lease: &Lease, pool: &Pool) -> bool {
    if lease.spec.pool_selector.is_empty() {
        return true;
    }
    let labels = pool.meta().labels.as_ref();
    lease.spec.pool_selector.iter().all(|(key, value)| {
        labels
            .and_then(|l| l.get(key))
            .is_some_and(|v| v == value)
    })
}

/// Applies the candidate filter to every pool and ranks the survivors by the
/// underutilized score, best first. Ties keep map iteration order; the
/// strategy decides what to do with the ranking.
pub fn fitting_pools<'a>(
    lease: &Lease,
    pools: &[&'a Pool],
) -> (Vec<&'a Pool>, Vec<FitDecision>) {
    let mut fitting: Vec<&Pool> = Vec::new();
    let mut decisions: Vec<FitDecision> = Vec::new();

    // A multi-pool lease only has to include its required pool once; the
    // remaining slots go through the ordinary filter.
    let required = &lease.spec.required_pool;
    let required_satisfied = required.is_empty() || lease.owns(POOL_KIND, required);

    for pool in pools {
        let name = pool.meta().name.clone().unwrap_or_default();
        let reject = |reason: FitReason, decisions: &mut Vec<FitDecision>| {
            decisions.push(FitDecision {
                pool: name.clone(),
                reason,
            });
        };

        if lease.owns(POOL_KIND, &name) {
            reject(FitReason::AlreadyAssigned, &mut decisions);
            continue;
        }
        let degraded = pool.status.as_ref().is_some_and(|s| s.degraded);
        if pool.spec.no_schedule || degraded {
            reject(FitReason::NotSchedulable, &mut decisions);
            continue;
        }
        let name_match = !required.is_empty() && *required == name;
        if pool.spec.exclude && !name_match {
            reject(FitReason::Excluded, &mut decisions);
            continue;
        }
        if !required_satisfied && !name_match {
            reject(FitReason::NotMatchRequired, &mut decisions);
            continue;
        }
        if !matches_selector(lease, pool) {
            reject(FitReason::LabelMismatch, &mut decisions);
            continue;
        }
        if !tolerates_taints(lease, pool) {
            reject(FitReason::TaintNotTolerated, &mut decisions);
            continue;
        }

        let status = pool.status.clone().unwrap_or_default();
        if status.vcpus_available < lease.spec.vcpus {
            reject(FitReason::InsufficientVCPU, &mut decisions);
            continue;
        }
        if status.memory_available < lease.spec.memory {
            reject(FitReason::InsufficientMemory, &mut decisions);
            continue;
        }

        fitting.push(pool);
    }

    fitting.sort_by(|a, b| {
        underutilized_score(b)
            .partial_cmp(&underutilized_score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    (fitting, decisions)
}

/// Free fraction of the pool: higher means more headroom.
fn underutilized_score(pool: &Pool) -> f64 {
    let status = pool.status.clone().unwrap_or_default();
    let vcpus = if pool.spec.vcpus > 0 {
        status.vcpus_available as f64 / pool.spec.vcpus as f64
    } else {
        0.0
    };
    let memory = if pool.spec.memory > 0 {
        status.memory_available as f64 / pool.spec.memory as f64
    } else {
        0.0
    };
    vcpus + memory
}

/// Picks one pool from the ranked candidates according to the strategy.
pub fn choose<'a>(candidates: &[&'a Pool], strategy: AllocationStrategy) -> Option<&'a Pool> {
    match strategy {
        AllocationStrategy::Underutilized => candidates.first().copied(),
        AllocationStrategy::Random => candidates.choose(&mut rand::thread_rng()).copied(),
    }
}
