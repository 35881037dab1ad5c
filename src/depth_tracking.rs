use crate::{
    element::Element,
    error::{Error, Result},
};

/// Tracks how deeply nested the element stream currently is, by counting down the remaining
/// items of every open array and map.
#[derive(Clone, Debug)]
pub struct DepthTracker {
    tracking: Vec<u64>,
    max_depth: usize,
}

impl DepthTracker {
    /// Create a new depth tracker
    pub fn new(max_depth: usize) -> Self {
        Self {
            tracking: Vec::new(),
            max_depth,
        }
    }

    /// Update the depth tracker on each new element read.
    pub fn update_elem(&mut self, elem: &Element) -> Result<()> {
        // Subtract from count for next element
        if let Some(v) = self.tracking.last_mut() {
            *v -= 1;
        }

        // Increase nest depth if this is a nesting element
        match elem {
            Element::Map(len) => self.tracking.push(2 * (*len as u64)), // 2 elements per map item
            Element::Array(len) => self.tracking.push(*len as u64),
            _ => (),
        }

        // Check to see if we hit the nesting limit
        if self.tracking.len() > self.max_depth {
            log::debug!("decode nesting passed {} levels", self.max_depth);
            return Err(Error::ParseLimit("Depth limit exceeded".to_string()));
        }

        self.purge_zeros();
        Ok(())
    }

    /// Drop any depth tracking elements that have hit zero
    pub fn purge_zeros(&mut self) {
        while let Some(0) = self.tracking.last() {
            self.tracking.pop();
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.tracking.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_and_unwinding() {
        let mut tracker = DepthTracker::new(8);
        tracker.update_elem(&Element::Array(2)).unwrap();
        assert_eq!(tracker.depth(), 1);
        tracker.update_elem(&Element::Map(1)).unwrap();
        assert_eq!(tracker.depth(), 2);
        tracker.update_elem(&Element::Raw(3)).unwrap();
        tracker.update_elem(&Element::Nil).unwrap();
        assert_eq!(tracker.depth(), 1);
        tracker.update_elem(&Element::Bool(true)).unwrap();
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn empty_containers_close_immediately() {
        let mut tracker = DepthTracker::new(1);
        tracker.update_elem(&Element::Array(0)).unwrap();
        tracker.update_elem(&Element::Map(0)).unwrap();
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn limit() {
        let mut tracker = DepthTracker::new(3);
        for _ in 0..3 {
            tracker.update_elem(&Element::Array(1)).unwrap();
        }
        let result = tracker.update_elem(&Element::Array(1));
        assert!(matches!(result, Err(Error::ParseLimit(_))));
    }
}
