//! Growable, contiguous store of bounding boxes.
//!
//! A [`BoxArray`] owns one contiguous buffer of same-shaped [`STBox`]
//! records and grows it under a fixed allocation ceiling. Growth is
//! all-or-nothing: a failed grow leaves the array untouched.

use crate::config::{DEFAULT_INITIAL_CAPACITY, EngineConfig};
use crate::error::{Result, TesselError};
use tessel_types::{BoxKind, STBox};

/// Capacity multiplier used by amortized growth.
const GROWTH_FACTOR: usize = 4;

/// How a [`BoxArray`] acquires room for the next append.
///
/// Selected per call site; the same array API serves both the amortized
/// accumulate-then-iterate path and the exact-fit build-once path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowthPolicy {
    /// Multiply capacity by four on exhaustion, clamped by the allocation
    /// ceiling. Amortized O(1) appends.
    #[default]
    Amortized,
    /// Reserve exactly one more slot per append. O(n) appends, no slack.
    Exact,
}

/// Growable, contiguous store of same-shaped bounding boxes.
#[derive(Debug, Clone)]
pub struct BoxArray {
    boxes: Vec<STBox>,
    kind: BoxKind,
    capacity: usize,
    policy: GrowthPolicy,
    ceiling: usize,
}

impl BoxArray {
    /// Create an array for boxes of `kind` with amortized growth and the
    /// default allocation ceiling. An `initial_capacity` of zero falls back
    /// to [`DEFAULT_INITIAL_CAPACITY`].
    pub fn make(kind: BoxKind, initial_capacity: usize) -> Self {
        Self::make_with(
            kind,
            initial_capacity,
            GrowthPolicy::Amortized,
            &EngineConfig::default(),
        )
    }

    /// Create an array with an explicit growth policy and execution context.
    pub fn make_with(
        kind: BoxKind,
        initial_capacity: usize,
        policy: GrowthPolicy,
        config: &EngineConfig,
    ) -> Self {
        let requested = if initial_capacity == 0 {
            DEFAULT_INITIAL_CAPACITY
        } else {
            initial_capacity
        };
        let max_capacity = (config.alloc_ceiling_bytes / kind.encoded_size()).max(1);
        let capacity = requested.min(max_capacity);
        if capacity < requested {
            log::debug!(
                "box array initial capacity clamped from {} to {} slots",
                requested,
                capacity
            );
        }
        Self {
            boxes: Vec::with_capacity(capacity),
            kind,
            capacity,
            policy,
            ceiling: config.alloc_ceiling_bytes,
        }
    }

    pub fn kind(&self) -> BoxKind {
        self.kind
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Number of allocated slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a box, growing the buffer first if every slot is occupied.
    pub fn add(&mut self, bx: STBox) -> Result<()> {
        if bx.kind() != self.kind {
            return Err(TesselError::IncompatibleStates(format!(
                "cannot add a {:?} box to a {:?} array",
                bx.kind(),
                self.kind
            )));
        }
        if self.boxes.len() == self.capacity {
            self.grow()?;
        }
        self.boxes.push(bx);
        Ok(())
    }

    /// Bounds-checked access to the box at `index`.
    pub fn get(&self, index: usize) -> Result<&STBox> {
        self.boxes
            .get(index)
            .ok_or(TesselError::IndexOutOfBounds {
                index,
                len: self.boxes.len(),
            })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, STBox> {
        self.boxes.iter()
    }

    pub fn as_slice(&self) -> &[STBox] {
        &self.boxes
    }

    /// Union of every stored box, or `None` if the array is empty.
    pub fn extent(&self) -> Option<STBox> {
        let mut iter = self.boxes.iter();
        let mut acc = iter.next()?.clone();
        for bx in iter {
            // All elements share one kind, so the union cannot fail.
            let _ = acc.extend_to_include(bx);
        }
        Some(acc)
    }

    fn grow(&mut self) -> Result<()> {
        let box_size = self.kind.encoded_size();
        let max_capacity = (self.ceiling / box_size).max(1);
        if self.capacity >= max_capacity {
            log::warn!(
                "box array at the {} byte allocation ceiling ({} slots of {} bytes)",
                self.ceiling,
                self.capacity,
                box_size
            );
            return Err(TesselError::AllocationLimit {
                requested: (self.capacity + 1) * box_size,
                ceiling: self.ceiling,
            });
        }
        let target = match self.policy {
            GrowthPolicy::Amortized => self
                .capacity
                .saturating_mul(GROWTH_FACTOR)
                .min(max_capacity),
            GrowthPolicy::Exact => self.capacity + 1,
        };
        self.boxes.reserve_exact(target - self.boxes.len());
        log::debug!(
            "box array grown from {} to {} slots ({:?})",
            self.capacity,
            target,
            self.policy
        );
        self.capacity = target;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a BoxArray {
    type Item = &'a STBox;
    type IntoIter = std::slice::Iter<'a, STBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}
