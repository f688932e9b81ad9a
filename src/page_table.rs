use std::collections::HashSet;

use crate::error::ValidationError;
use crate::layout::MemoryLayout;

/// One virtual page: which frame holds it, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry {
    pub virtual_index: u64,
    /// Only meaningful while `present` is set
    pub physical_index: u64,
    pub present: bool,
}

impl PageTableEntry {
    pub fn new(virtual_index: u64) -> Self {
        PageTableEntry {
            virtual_index,
            physical_index: 0,
            present: false,
        }
    }
}

/// Single-level page table covering every virtual page of a layout.
///
/// Entries are stored by virtual index, so `entries[v].virtual_index == v`.
/// The descending order shown to users comes from `display_rows` only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    entries: Vec<PageTableEntry>,
    frame_count: u64,
}

impl PageTable {
    /// Create a table with every page absent and assigned frame 0
    pub fn new(layout: &MemoryLayout) -> Self {
        let entries = (0..layout.page_count()).map(PageTableEntry::new).collect();
        PageTable {
            entries,
            frame_count: layout.frame_count(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of frames, which bounds how many pages may be present
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn find(&self, virtual_index: u64) -> Option<&PageTableEntry> {
        usize::try_from(virtual_index)
            .ok()
            .and_then(|i| self.entries.get(i))
    }

    fn find_mut(&mut self, virtual_index: u64) -> Result<&mut PageTableEntry, ValidationError> {
        usize::try_from(virtual_index)
            .ok()
            .and_then(|i| self.entries.get_mut(i))
            .ok_or(ValidationError::UnknownPage(virtual_index))
    }

    /// Find the entry assigned to a frame. With `present_only` absent entries
    /// are skipped, since their frame number is stale.
    pub fn find_by_physical(&self, physical_index: u64, present_only: bool) -> Option<&PageTableEntry> {
        self.entries
            .iter()
            .find(|e| e.physical_index == physical_index && (e.present || !present_only))
    }

    /// Flip one present bit. The count is only checked by `validate_present_count`.
    pub fn set_present(&mut self, virtual_index: u64, present: bool) -> Result<(), ValidationError> {
        self.find_mut(virtual_index)?.present = present;
        Ok(())
    }

    /// Assign a frame. Range and uniqueness are only checked by
    /// `validate_physical_assignments`.
    pub fn set_physical_index(&mut self, virtual_index: u64, physical_index: u64) -> Result<(), ValidationError> {
        self.find_mut(virtual_index)?.physical_index = physical_index;
        Ok(())
    }

    /// Map a page into a frame in one step (fault handling)
    pub(crate) fn map(&mut self, virtual_index: u64, physical_index: u64) -> Result<(), ValidationError> {
        let entry = self.find_mut(virtual_index)?;
        entry.physical_index = physical_index;
        entry.present = true;
        Ok(())
    }

    pub fn present_count(&self) -> usize {
        self.entries.iter().filter(|e| e.present).count()
    }

    /// Present virtual pages in ascending order
    pub fn present_pages(&self) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|e| e.present)
            .map(|e| e.virtual_index)
            .collect()
    }

    /// Entries in ascending virtual index order
    pub fn iter(&self) -> impl Iterator<Item = &PageTableEntry> {
        self.entries.iter()
    }

    /// Entries in the order the table is shown: highest virtual page first
    pub fn display_rows(&self) -> impl Iterator<Item = &PageTableEntry> {
        self.entries.iter().rev()
    }

    /// Exactly as many pages as frames must be present.
    pub fn validate_present_count(&self) -> Result<(), ValidationError> {
        let actual = self.present_count();
        let expected = self.frame_count as usize;
        if actual != expected {
            return Err(ValidationError::PresentCountMismatch { expected, actual });
        }
        Ok(())
    }

    /// Every present page must own a distinct frame inside the frame range.
    pub fn validate_physical_assignments(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for entry in self.entries.iter().filter(|e| e.present) {
            if entry.physical_index >= self.frame_count || !seen.insert(entry.physical_index) {
                return Err(ValidationError::PhysicalAssignmentInvalid {
                    max: self.frame_count - 1,
                });
            }
        }
        Ok(())
    }
}
