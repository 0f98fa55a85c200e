// ============================================================
// Layer 5 — Step History
// ============================================================
// Append-only per-step buffers, pre-allocated for
// max_jump_step + 1 slots:
//
//   slot:       0        1        2      ...   T
//   locations   ORIGIN   j_1      j_2          j_T
//   states      zeros    r_1      r_2          r_T
//
// Slot 0 of a tensor stream is created lazily, as zeros shaped
// like the first representation written, because the state shape
// depends on the representation variant.
//
// Writing slot t+1 applies the freeze rule: stopped examples keep
// their slot t value, running examples take the new one.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::domain::error::{ReaderError, ReaderResult};
use crate::domain::location::Location;

/// One tensor-valued stream of the history.
#[derive(Debug)]
pub struct StateStream<B: Backend> {
    name:  &'static str,
    slots: Vec<Option<Tensor<B, 3>>>,
}

impl<B: Backend> StateStream<B> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self { name, slots: vec![None; capacity] }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, slot: usize) -> Option<&Tensor<B, 3>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Write slot `time + 1`, keeping slot `time` for every example
    /// whose `running` flag is false.
    pub fn record(&mut self, time: usize, value: Tensor<B, 3>, running: &[bool]) -> ReaderResult<()> {
        if time + 1 >= self.slots.len() {
            return Err(ReaderError::invalid(
                "max_jump_step",
                format!("{} history has only {} slots", self.name, self.slots.len()),
            ));
        }
        if self.slots[0].is_none() {
            self.slots[0] = Some(value.zeros_like());
        }
        let previous = match self.get(time) {
            Some(prev) => prev.clone(),
            None => value.zeros_like(),
        };
        check_shape(self.name, &previous, &value)?;

        let next = previous.mask_where(example_mask(running, value.dims(), &value.device()), value);
        self.slots[time + 1] = Some(next);
        Ok(())
    }

    /// Slots `0..=time`, in order. Slots never written are skipped.
    pub fn written(&self, time: usize) -> Vec<Tensor<B, 3>> {
        self.slots.iter().take(time + 1).flatten().cloned().collect()
    }
}

/// Error unless `actual` has the same shape as `expected`.
pub fn check_shape<B: Backend>(
    stream:   &'static str,
    expected: &Tensor<B, 3>,
    actual:   &Tensor<B, 3>,
) -> ReaderResult<()> {
    if expected.dims() != actual.dims() {
        return Err(ReaderError::ShapeMismatch { stream, expected: expected.dims(), actual: actual.dims() });
    }
    Ok(())
}

/// `[bs]` flags broadcast to a `[bs, rows, cols]` Bool mask.
pub fn example_mask<B: Backend>(flags: &[bool], dims: [usize; 3], device: &B::Device) -> Tensor<B, 3, Bool> {
    let [bs, _, _] = dims;
    Tensor::<B, 1, Bool>::from_data(TensorData::new(flags.to_vec(), [bs]), device)
        .reshape([bs, 1, 1])
        .expand(dims)
}

#[derive(Debug)]
pub struct StepHistory<B: Backend> {
    locations: Vec<Vec<Location>>,
    pub states: StateStream<B>,
    pub doc:    StateStream<B>,
    pub query:  StateStream<B>,
}

impl<B: Backend> StepHistory<B> {
    pub fn new(batch: usize, max_jump_step: usize) -> Self {
        let capacity = max_jump_step + 1;
        let mut locations = Vec::with_capacity(capacity);
        locations.push(vec![Location::ORIGIN; batch]);
        Self {
            locations,
            states: StateStream::new("state", capacity),
            doc:    StateStream::new("document", capacity),
            query:  StateStream::new("query", capacity),
        }
    }

    pub fn location(&self, slot: usize) -> &[Location] {
        &self.locations[slot.min(self.locations.len() - 1)]
    }

    /// Append the locations for the next slot.
    pub fn push_locations(&mut self, locations: Vec<Location>) {
        self.locations.push(locations);
    }

    /// `[example][slot]` view of the location history.
    pub fn per_example_locations(&self) -> Vec<Vec<Location>> {
        let batch = self.locations.first().map_or(0, Vec::len);
        (0..batch)
            .map(|i| self.locations.iter().map(|slot| slot[i]).collect())
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_util::{floats, matrix, TestBackend};

    #[test]
    fn test_slot_zero_is_lazy_zeros() {
        let mut stream = StateStream::<TestBackend>::new("state", 3);
        assert!(stream.get(0).is_none());
        stream.record(0, matrix(vec![4.0, 5.0], [2, 1, 1]), &[true, true]).unwrap();
        assert_eq!(floats(stream.get(0).unwrap().clone()), vec![0.0, 0.0]);
        assert_eq!(floats(stream.get(1).unwrap().clone()), vec![4.0, 5.0]);
    }

    #[test]
    fn test_stopped_examples_are_frozen() {
        let mut stream = StateStream::<TestBackend>::new("state", 3);
        stream.record(0, matrix(vec![1.0, 2.0], [2, 1, 1]), &[true, true]).unwrap();
        stream.record(1, matrix(vec![7.0, 9.0], [2, 1, 1]), &[true, false]).unwrap();
        assert_eq!(floats(stream.get(2).unwrap().clone()), vec![7.0, 2.0]);
    }

    #[test]
    fn test_shape_change_is_rejected() {
        let mut stream = StateStream::<TestBackend>::new("state", 3);
        stream.record(0, matrix(vec![0.0; 4], [1, 2, 2]), &[true]).unwrap();
        let err = stream.record(1, matrix(vec![0.0; 6], [1, 3, 2]), &[true]).unwrap_err();
        assert_eq!(
            err,
            ReaderError::ShapeMismatch { stream: "state", expected: [1, 2, 2], actual: [1, 3, 2] }
        );
    }

    #[test]
    fn test_writing_past_capacity_fails() {
        let mut stream = StateStream::<TestBackend>::new("state", 1);
        assert!(stream.record(0, matrix(vec![1.0], [1, 1, 1]), &[true]).is_err());
    }

    #[test]
    fn test_location_history_transposes() {
        let mut history = StepHistory::<TestBackend>::new(2, 2);
        history.push_locations(vec![Location::new(1.0, 0.0, 1.0, 1.0), Location::ORIGIN]);
        let per_example = history.per_example_locations();
        assert_eq!(per_example.len(), 2);
        assert_eq!(per_example[0], vec![Location::ORIGIN, Location::new(1.0, 0.0, 1.0, 1.0)]);
        assert_eq!(per_example[1].len(), 2);
    }
}
