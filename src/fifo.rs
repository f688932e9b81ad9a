use std::collections::VecDeque;

use crate::error::QueueError;

/// Direction for swapping a queue entry with its neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Toward the head: the page is treated as having arrived earlier
    Earlier,
    /// Toward the tail: the page is treated as having arrived later
    Later,
}

/// Arrival order of resident pages, oldest first.
///
/// The head is the next page evicted when a fault finds no free frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementQueue {
    pages: VecDeque<u64>,
}

impl ReplacementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, virtual_index: u64) -> bool {
        self.pages.contains(&virtual_index)
    }

    /// Append a newly arrived page at the tail
    pub fn enqueue(&mut self, virtual_index: u64) -> Result<(), QueueError> {
        if self.contains(virtual_index) {
            return Err(QueueError::DuplicateInQueue(virtual_index));
        }
        self.pages.push_back(virtual_index);
        Ok(())
    }

    /// Remove and return the page that arrived first
    pub fn dequeue_oldest(&mut self) -> Result<u64, QueueError> {
        self.pages.pop_front().ok_or(QueueError::QueueEmpty)
    }

    pub fn peek_oldest(&self) -> Option<u64> {
        self.pages.front().copied()
    }

    /// Swap the entry at `position` with its neighbour. Moving the head
    /// earlier or the tail later leaves the queue unchanged.
    pub fn reorder(&mut self, direction: Move, position: usize) -> Result<(), QueueError> {
        self.check_position(position)?;
        let neighbour = match direction {
            Move::Earlier if position == 0 => return Ok(()),
            Move::Earlier => position - 1,
            Move::Later if position + 1 == self.pages.len() => return Ok(()),
            Move::Later => position + 1,
        };
        self.pages.swap(position, neighbour);
        Ok(())
    }

    /// Drop the entry at `position`, returning its page
    pub fn remove(&mut self, position: usize) -> Result<u64, QueueError> {
        self.check_position(position)?;
        self.pages
            .remove(position)
            .ok_or(QueueError::PositionOutOfRange {
                position,
                len: self.pages.len(),
            })
    }

    fn check_position(&self, position: usize) -> Result<(), QueueError> {
        if position >= self.pages.len() {
            return Err(QueueError::PositionOutOfRange {
                position,
                len: self.pages.len(),
            });
        }
        Ok(())
    }

    /// Pages oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.pages.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u64> {
        self.pages.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}
