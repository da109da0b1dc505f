//! Task spaces and the tasks they contain.
//!
//! A [`TaskSpace`] describes the closed domain of valid tasks. It is built
//! once, validated at construction, and then shared read-only as an
//! `Arc<TaskSpace>` between the manager, its handle and every wrapper, so no
//! synchronization is needed to read it.
//!
//! | Variant         | Task value          | Enumerable |
//! |-----------------|---------------------|------------|
//! | `Discrete`      | `u64` index `< n`   | yes        |
//! | `MultiDiscrete` | `Vec<u64>`          | yes        |
//! | `Box`           | `Vec<f32>` in range | no         |

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A task handed to an environment to parameterize its next episode.
///
/// The shape of the value must match the owning [`TaskSpace`]; use
/// [`TaskSpace::validate`] before sending or applying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Task {
    /// Index into a discrete space.
    Discrete(u64),
    /// One index per dimension of a multi-discrete space.
    MultiDiscrete(Vec<u64>),
    /// Flattened (row-major) point inside a box space.
    Box(Vec<f32>),
}

impl Task {
    /// Discrete index, if this is a discrete task.
    pub fn as_discrete(&self) -> Option<u64> {
        match self {
            Task::Discrete(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Discrete(i) => write!(f, "{}", i),
            Task::MultiDiscrete(v) => write!(f, "{:?}", v),
            Task::Box(v) => write!(f, "{:?}", v),
        }
    }
}

/// Discrete space `{0, 1, ..., n - 1}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscreteSpace {
    n: u64,
}

impl DiscreteSpace {
    /// Number of tasks.
    pub fn n(&self) -> u64 {
        self.n
    }
}

/// Cartesian product of discrete spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiDiscreteSpace {
    nvec: Vec<u64>,
}

impl MultiDiscreteSpace {
    /// Cardinality of each dimension.
    pub fn nvec(&self) -> &[u64] {
        &self.nvec
    }
}

/// Continuous box with per-dimension bounds.
///
/// Bounds are stored flattened; `low.len() == high.len() == shape.product()`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace {
    shape: Vec<usize>,
    low: Vec<f32>,
    high: Vec<f32>,
}

impl BoxSpace {
    /// Logical shape of a task.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flattened lower bounds (inclusive).
    pub fn low(&self) -> &[f32] {
        &self.low
    }

    /// Flattened upper bounds (inclusive).
    pub fn high(&self) -> &[f32] {
        &self.high
    }

    /// Number of scalar components in a task.
    pub fn flat_dim(&self) -> usize {
        self.low.len()
    }
}

/// Domain of valid tasks.
///
/// Instances can only be created through the validating constructors, so
/// every `TaskSpace` value upholds its bounds invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskSpace {
    /// `Discrete(n)`.
    Discrete(DiscreteSpace),
    /// `MultiDiscrete([n0, n1, ...])`.
    MultiDiscrete(MultiDiscreteSpace),
    /// `Box(shape, low, high)`.
    Box(BoxSpace),
}

impl TaskSpace {
    /// Create a discrete space with `n` tasks.
    pub fn discrete(n: u64) -> Result<Self> {
        if n == 0 {
            return Err(SyncError::InvalidTaskSpace(
                "discrete cardinality must be > 0".into(),
            ));
        }
        Ok(Self::Discrete(DiscreteSpace { n }))
    }

    /// Create a multi-discrete space.
    pub fn multi_discrete(nvec: Vec<u64>) -> Result<Self> {
        if nvec.is_empty() {
            return Err(SyncError::InvalidTaskSpace(
                "multi-discrete space needs at least one dimension".into(),
            ));
        }
        if let Some(dim) = nvec.iter().position(|&n| n == 0) {
            return Err(SyncError::InvalidTaskSpace(format!(
                "multi-discrete cardinality must be > 0 (dimension {})",
                dim
            )));
        }
        Ok(Self::MultiDiscrete(MultiDiscreteSpace { nvec }))
    }

    /// Create a box space with per-dimension bounds.
    ///
    /// `low` and `high` are flattened row-major and must have
    /// `shape.iter().product()` entries, be finite, and satisfy `low < high`.
    pub fn boxed(shape: Vec<usize>, low: Vec<f32>, high: Vec<f32>) -> Result<Self> {
        let size = box_size(&shape)?;
        if low.len() != size || high.len() != size {
            return Err(SyncError::InvalidTaskSpace(format!(
                "box bounds have {} / {} entries, shape {:?} needs {}",
                low.len(),
                high.len(),
                shape,
                size
            )));
        }
        for (i, (&lo, &hi)) in low.iter().zip(high.iter()).enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(SyncError::InvalidTaskSpace(format!(
                    "box bounds must be finite (dimension {})",
                    i
                )));
            }
            if lo >= hi {
                return Err(SyncError::InvalidTaskSpace(format!(
                    "box low {} >= high {} (dimension {})",
                    lo, hi, i
                )));
            }
        }
        Ok(Self::Box(BoxSpace { shape, low, high }))
    }

    /// Create a box space with the same bounds on every dimension.
    pub fn boxed_uniform(shape: Vec<usize>, low: f32, high: f32) -> Result<Self> {
        let size = box_size(&shape)?;
        Self::boxed(shape, vec![low; size], vec![high; size])
    }

    /// Sample a task uniformly using the thread-local generator.
    pub fn sample(&self) -> Task {
        let mut rng = fastrand::Rng::new();
        self.sample_with(&mut rng)
    }

    /// Sample a task uniformly using the given generator.
    pub fn sample_with(&self, rng: &mut fastrand::Rng) -> Task {
        match self {
            TaskSpace::Discrete(s) => Task::Discrete(rng.u64(0..s.n)),
            TaskSpace::MultiDiscrete(s) => {
                Task::MultiDiscrete(s.nvec.iter().map(|&n| rng.u64(0..n)).collect())
            }
            TaskSpace::Box(s) => Task::Box(
                s.low
                    .iter()
                    .zip(s.high.iter())
                    .map(|(&lo, &hi)| {
                        // f64 keeps `hi - lo` finite for bounds near f32::MAX
                        let (lo64, hi64) = (f64::from(lo), f64::from(hi));
                        let x = lo64 + rng.f64() * (hi64 - lo64);
                        (x as f32).clamp(lo, hi)
                    })
                    .collect(),
            ),
        }
    }

    /// Membership test.
    pub fn contains(&self, task: &Task) -> bool {
        match (self, task) {
            (TaskSpace::Discrete(s), Task::Discrete(i)) => *i < s.n,
            (TaskSpace::MultiDiscrete(s), Task::MultiDiscrete(v)) => {
                v.len() == s.nvec.len() && v.iter().zip(s.nvec.iter()).all(|(x, n)| x < n)
            }
            (TaskSpace::Box(s), Task::Box(v)) => {
                v.len() == s.low.len()
                    && v
                        .iter()
                        .zip(s.low.iter().zip(s.high.iter()))
                        .all(|(x, (lo, hi))| x.is_finite() && lo <= x && x <= hi)
            }
            _ => false,
        }
    }

    /// Like [`contains`](Self::contains) but returns a validation error.
    pub fn validate(&self, task: &Task) -> Result<()> {
        if self.contains(task) {
            Ok(())
        } else {
            Err(SyncError::TaskValidation {
                task: task.to_string(),
                space: self.to_string(),
            })
        }
    }

    /// Encode a valid task into its compact MessagePack form.
    pub fn encode(&self, task: &Task) -> Result<Vec<u8>> {
        self.validate(task)?;
        Ok(rmp_serde::to_vec(task)?)
    }

    /// Decode a task and check that it belongs to this space.
    pub fn decode(&self, bytes: &[u8]) -> Result<Task> {
        let task: Task = rmp_serde::from_slice(bytes)?;
        self.validate(&task)?;
        Ok(task)
    }

    /// Whether tasks can be enumerated.
    pub fn is_enumerable(&self) -> bool {
        !matches!(self, TaskSpace::Box(_))
    }

    /// Exact number of tasks for discrete spaces, `None` for boxes or when
    /// the count does not fit in a `u64`.
    pub fn num_tasks(&self) -> Option<u64> {
        match self {
            TaskSpace::Discrete(s) => Some(s.n),
            TaskSpace::MultiDiscrete(s) => s
                .nvec
                .iter()
                .try_fold(1u64, |acc, &n| acc.checked_mul(n)),
            TaskSpace::Box(_) => None,
        }
    }

    /// All tasks in enumeration order.
    pub fn tasks(&self) -> Result<Vec<Task>> {
        let n = self.num_tasks().ok_or_else(|| {
            SyncError::InvalidTaskSpace(format!("{} cannot be enumerated", self))
        })?;
        Ok((0..n).filter_map(|i| self.task_at(i)).collect())
    }

    /// Position of a task in enumeration order.
    ///
    /// Multi-discrete tasks use mixed radix with the last dimension varying
    /// fastest.
    pub fn task_index(&self, task: &Task) -> Option<u64> {
        if !self.contains(task) {
            return None;
        }
        match (self, task) {
            (TaskSpace::Discrete(_), Task::Discrete(i)) => Some(*i),
            (TaskSpace::MultiDiscrete(s), Task::MultiDiscrete(v)) => v
                .iter()
                .zip(s.nvec.iter())
                .try_fold(0u64, |acc, (&x, &n)| acc.checked_mul(n)?.checked_add(x)),
            _ => None,
        }
    }

    /// Task at a position in enumeration order.
    pub fn task_at(&self, index: u64) -> Option<Task> {
        if index >= self.num_tasks()? {
            return None;
        }
        match self {
            TaskSpace::Discrete(_) => Some(Task::Discrete(index)),
            TaskSpace::MultiDiscrete(s) => {
                let mut rem = index;
                let mut values = vec![0u64; s.nvec.len()];
                for (slot, &n) in values.iter_mut().zip(s.nvec.iter()).rev() {
                    *slot = rem % n;
                    rem /= n;
                }
                Some(Task::MultiDiscrete(values))
            }
            TaskSpace::Box(_) => None,
        }
    }
}

/// Element count of a box shape. Fails for empty shapes, zero-sized
/// dimensions and products that overflow `usize`.
fn box_size(shape: &[usize]) -> Result<usize> {
    let size = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| {
            SyncError::InvalidTaskSpace(format!("box shape {:?} is too large", shape))
        })?;
    if shape.is_empty() || size == 0 {
        return Err(SyncError::InvalidTaskSpace(format!(
            "box shape {:?} has no elements",
            shape
        )));
    }
    Ok(size)
}

impl fmt::Display for TaskSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskSpace::Discrete(s) => write!(f, "Discrete({})", s.n),
            TaskSpace::MultiDiscrete(s) => write!(f, "MultiDiscrete({:?})", s.nvec),
            TaskSpace::Box(s) => write!(f, "Box(shape={:?})", s.shape),
        }
    }
}
