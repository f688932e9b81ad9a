//! Simulation session
//!
//! `VmManager` owns everything one simulation needs: the layout, the page
//! table, the arrival queue and the fault counter. Setup happens in a fixed
//! order of phases, and each phase only holds the data that exists by then:
//!
//! ```text
//! Config -> PresentBitsSet -> PhysicalBitsSet -> QueueSet -> Converting
//! ```
//!
//! Every phase can go back to `Config` through `reset`.

use crate::error::{Error, Result, ValidationError};
use crate::fifo::{Move, ReplacementQueue};
use crate::layout::MemoryLayout;
use crate::page_table::PageTable;
use crate::translation::{Direction, TranslationResponse, Translator};

/// Setup phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for memory sizes
    Config,
    /// Choosing which pages are present
    PresentBitsSet,
    /// Assigning frames to the present pages
    PhysicalBitsSet,
    /// Arranging the initial arrival order
    QueueSet,
    /// Translating addresses
    Converting,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Config => "configuration",
            Phase::PresentBitsSet => "present bits",
            Phase::PhysicalBitsSet => "physical page index",
            Phase::QueueSet => "arrival queue",
            Phase::Converting => "conversion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
struct Setup {
    layout: MemoryLayout,
    table: PageTable,
}

#[derive(Debug, Clone)]
enum State {
    Config,
    PresentBitsSet(Setup),
    PhysicalBitsSet(Setup),
    QueueSet(Setup, ReplacementQueue),
    Converting(Translator),
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Config => Phase::Config,
            State::PresentBitsSet(_) => Phase::PresentBitsSet,
            State::PhysicalBitsSet(_) => Phase::PhysicalBitsSet,
            State::QueueSet(..) => Phase::QueueSet,
            State::Converting(_) => Phase::Converting,
        }
    }
}

fn wrong_phase(expected: Phase, state: State) -> (State, Error) {
    let actual = state.phase();
    (state, Error::WrongPhase { expected, actual })
}

#[derive(Debug, Clone)]
pub struct VmManager {
    state: State,
}

impl VmManager {
    pub fn new() -> Self {
        VmManager { state: State::Config }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    fn wrong_phase(&self, expected: Phase) -> Error {
        Error::WrongPhase {
            expected,
            actual: self.phase(),
        }
    }

    /// Move to the next phase. On failure `f` hands the state back unchanged.
    fn transition<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(State) -> std::result::Result<State, (State, Error)>,
    {
        let state = std::mem::replace(&mut self.state, State::Config);
        match f(state) {
            Ok(next) => {
                log::info!("Session entered {} phase", next.phase());
                self.state = next;
                Ok(())
            }
            Err((previous, e)) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    /// Drop all state and wait for a new configuration
    pub fn reset(&mut self) {
        log::info!("Session reset from {} phase", self.phase());
        self.state = State::Config;
    }

    pub fn layout(&self) -> Option<&MemoryLayout> {
        match &self.state {
            State::Config => None,
            State::PresentBitsSet(setup) | State::PhysicalBitsSet(setup) | State::QueueSet(setup, _) => {
                Some(&setup.layout)
            }
            State::Converting(translator) => Some(translator.layout()),
        }
    }

    pub fn table(&self) -> Option<&PageTable> {
        match &self.state {
            State::Config => None,
            State::PresentBitsSet(setup) | State::PhysicalBitsSet(setup) | State::QueueSet(setup, _) => {
                Some(&setup.table)
            }
            State::Converting(translator) => Some(translator.table()),
        }
    }

    /// Arrival queue, oldest first, once queue setup has started
    pub fn queue(&self) -> Option<&ReplacementQueue> {
        match &self.state {
            State::QueueSet(_, queue) => Some(queue),
            State::Converting(translator) => Some(translator.queue()),
            _ => None,
        }
    }

    pub fn fault_count(&self) -> u64 {
        match &self.state {
            State::Converting(translator) => translator.fault_count(),
            _ => 0,
        }
    }

    /// Compute the layout and build a fresh page table with every page absent.
    /// A rejected configuration leaves the session waiting for another one.
    pub fn configure(&mut self, virtual_mem_kb: u32, page_kb: u32) -> Result<MemoryLayout> {
        if !matches!(self.state, State::Config) {
            return Err(self.wrong_phase(Phase::Config));
        }

        let layout = MemoryLayout::from_sizes(virtual_mem_kb, page_kb)?;
        log::info!("Configured {}", layout);

        let table = PageTable::new(&layout);
        self.state = State::PresentBitsSet(Setup { layout, table });
        Ok(layout)
    }

    fn setup_mut(&mut self, expected: Phase) -> Result<&mut Setup> {
        match (&mut self.state, expected) {
            (State::PresentBitsSet(setup), Phase::PresentBitsSet)
            | (State::PhysicalBitsSet(setup), Phase::PhysicalBitsSet) => Ok(setup),
            (state, _) => Err(Error::WrongPhase {
                expected,
                actual: state.phase(),
            }),
        }
    }

    pub fn set_present(&mut self, virtual_index: u64, present: bool) -> Result<()> {
        let setup = self.setup_mut(Phase::PresentBitsSet)?;
        setup.table.set_present(virtual_index, present)?;
        Ok(())
    }

    /// Finish choosing present pages. Exactly one page per frame must be present.
    pub fn commit_present(&mut self) -> Result<()> {
        self.transition(|state| match state {
            State::PresentBitsSet(setup) => match setup.table.validate_present_count() {
                Ok(()) => Ok(State::PhysicalBitsSet(setup)),
                Err(e) => Err((State::PresentBitsSet(setup), e.into())),
            },
            other => Err(wrong_phase(Phase::PresentBitsSet, other)),
        })
    }

    pub fn set_physical_index(&mut self, virtual_index: u64, physical_index: u64) -> Result<()> {
        let setup = self.setup_mut(Phase::PhysicalBitsSet)?;
        setup.table.set_physical_index(virtual_index, physical_index)?;
        Ok(())
    }

    /// Finish frame assignment. Present pages need distinct, in-range frames.
    pub fn commit_physical(&mut self) -> Result<()> {
        self.transition(|state| match state {
            State::PhysicalBitsSet(setup) => match setup.table.validate_physical_assignments() {
                Ok(()) => Ok(State::QueueSet(setup, ReplacementQueue::new())),
                Err(e) => Err((State::PhysicalBitsSet(setup), e.into())),
            },
            other => Err(wrong_phase(Phase::PhysicalBitsSet, other)),
        })
    }

    fn queue_setup_mut(&mut self) -> Result<(&mut Setup, &mut ReplacementQueue)> {
        match &mut self.state {
            State::QueueSet(setup, queue) => Ok((setup, queue)),
            state => Err(Error::WrongPhase {
                expected: Phase::QueueSet,
                actual: state.phase(),
            }),
        }
    }

    /// Add a present page as the newest arrival
    pub fn enqueue(&mut self, virtual_index: u64) -> Result<()> {
        let (setup, queue) = self.queue_setup_mut()?;
        match setup.table.find(virtual_index) {
            None => return Err(ValidationError::UnknownPage(virtual_index).into()),
            Some(entry) if !entry.present => {
                return Err(ValidationError::NotPresent(virtual_index).into());
            }
            Some(_) => {}
        }
        queue.enqueue(virtual_index)?;
        Ok(())
    }

    pub fn remove_from_queue(&mut self, position: usize) -> Result<u64> {
        let (_, queue) = self.queue_setup_mut()?;
        Ok(queue.remove(position)?)
    }

    pub fn reorder_queue(&mut self, direction: Move, position: usize) -> Result<()> {
        let (_, queue) = self.queue_setup_mut()?;
        queue.reorder(direction, position)?;
        Ok(())
    }

    /// Finish setup. The queue must list every present page exactly once.
    pub fn commit_queue(&mut self) -> Result<()> {
        self.transition(|state| match state {
            State::QueueSet(setup, queue) => {
                let expected = setup.table.present_count();
                let all_present = queue
                    .iter()
                    .all(|page| setup.table.find(page).is_some_and(|e| e.present));
                if queue.len() != expected || !all_present {
                    let e = ValidationError::QueueMismatch {
                        expected,
                        actual: queue.len(),
                    };
                    return Err((State::QueueSet(setup, queue), e.into()));
                }
                Ok(State::Converting(Translator::new(setup.layout, setup.table, queue)))
            }
            other => Err(wrong_phase(Phase::QueueSet, other)),
        })
    }

    pub fn translator(&self) -> Option<&Translator> {
        match &self.state {
            State::Converting(translator) => Some(translator),
            _ => None,
        }
    }

    /// Convert one hex address in the conversion phase
    pub fn translate(&mut self, address_hex: &str, direction: Direction) -> Result<TranslationResponse> {
        match &mut self.state {
            State::Converting(translator) => translator.translate(address_hex, direction),
            state => Err(Error::WrongPhase {
                expected: Phase::Converting,
                actual: state.phase(),
            }),
        }
    }

    /// Convert addresses in order, each seeing the faults of the ones before.
    /// Per-address rejections are kept in the returned list.
    pub fn translate_batch<S: AsRef<str>>(
        &mut self,
        addresses: &[S],
        direction: Direction,
    ) -> Result<Vec<Result<TranslationResponse>>> {
        match &mut self.state {
            State::Converting(translator) => Ok(translator.translate_batch(addresses, direction)),
            state => Err(Error::WrongPhase {
                expected: Phase::Converting,
                actual: state.phase(),
            }),
        }
    }
}

impl Default for VmManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, QueueError};
    use crate::translation::Outcome;

    /// 64 KB / 8 KB with pages 0,2,4,6 in frames 0..3 and queue [0,2,4,6]
    fn setup_default_session() -> VmManager {
        let mut vm = VmManager::new();
        vm.configure(64, 8).unwrap();
        for page in [0, 2, 4, 6] {
            vm.set_present(page, true).unwrap();
        }
        vm.commit_present().unwrap();
        for (page, frame) in [(0, 0), (2, 1), (4, 2), (6, 3)] {
            vm.set_physical_index(page, frame).unwrap();
        }
        vm.commit_physical().unwrap();
        for page in [0, 2, 4, 6] {
            vm.enqueue(page).unwrap();
        }
        vm.commit_queue().unwrap();
        vm
    }

    #[test]
    fn test_configure_builds_table() {
        let mut vm = VmManager::new();
        assert_eq!(vm.phase(), Phase::Config);
        assert!(vm.layout().is_none());

        let layout = vm.configure(64, 8).unwrap();
        assert_eq!((layout.total_bits(), layout.index_bits(), layout.offset_bits()), (16, 3, 13));
        assert_eq!(vm.phase(), Phase::PresentBitsSet);

        let table = vm.table().unwrap();
        assert_eq!(table.len(), 8);
        assert_eq!(table.present_count(), 0);
        assert!(vm.queue().is_none());
        assert_eq!(vm.fault_count(), 0);
    }

    #[test]
    fn test_rejected_configuration_keeps_config_phase() {
        let mut vm = VmManager::new();
        assert!(matches!(
            vm.configure(63, 8),
            Err(Error::Config(ConfigError::OddVirtualSize(63)))
        ));
        assert_eq!(vm.phase(), Phase::Config);
        assert!(vm.table().is_none());
    }

    #[test]
    fn test_configure_only_in_config_phase() {
        let mut vm = VmManager::new();
        vm.configure(64, 8).unwrap();
        assert!(matches!(
            vm.configure(32, 4),
            Err(Error::WrongPhase {
                expected: Phase::Config,
                actual: Phase::PresentBitsSet
            })
        ));
        assert_eq!(vm.layout().unwrap().virtual_mem_kb(), 64);
    }

    #[test]
    fn test_present_commit_requires_exact_count() {
        let mut vm = VmManager::new();
        vm.configure(64, 8).unwrap();
        vm.set_present(1, true).unwrap();

        assert!(matches!(
            vm.commit_present(),
            Err(Error::Validation(ValidationError::PresentCountMismatch {
                expected: 4,
                actual: 1
            }))
        ));
        assert_eq!(vm.phase(), Phase::PresentBitsSet);

        for page in [3, 5, 7] {
            vm.set_present(page, true).unwrap();
        }
        vm.commit_present().unwrap();
        assert_eq!(vm.phase(), Phase::PhysicalBitsSet);
    }

    #[test]
    fn test_steps_cannot_be_skipped() {
        let mut vm = VmManager::new();
        assert!(matches!(vm.set_present(0, true), Err(Error::WrongPhase { .. })));
        assert!(matches!(vm.commit_queue(), Err(Error::WrongPhase { .. })));

        vm.configure(64, 8).unwrap();
        assert!(matches!(vm.set_physical_index(0, 0), Err(Error::WrongPhase { .. })));
        assert!(matches!(vm.enqueue(0), Err(Error::WrongPhase { .. })));
        assert!(matches!(
            vm.translate("0000", Direction::VirtualToPhysical),
            Err(Error::WrongPhase {
                expected: Phase::Converting,
                actual: Phase::PresentBitsSet
            })
        ));
        assert_eq!(vm.phase(), Phase::PresentBitsSet);
    }

    #[test]
    fn test_physical_commit_rejects_duplicates() {
        let mut vm = VmManager::new();
        vm.configure(64, 8).unwrap();
        for page in [0, 2, 4, 6] {
            vm.set_present(page, true).unwrap();
        }
        vm.commit_present().unwrap();

        // every present page still has frame 0
        assert!(matches!(
            vm.commit_physical(),
            Err(Error::Validation(ValidationError::PhysicalAssignmentInvalid { max: 3 }))
        ));
        assert_eq!(vm.phase(), Phase::PhysicalBitsSet);
    }

    #[test]
    fn test_queue_setup_rules() {
        let mut vm = VmManager::new();
        vm.configure(64, 8).unwrap();
        for page in [0, 2, 4, 6] {
            vm.set_present(page, true).unwrap();
        }
        vm.commit_present().unwrap();
        for (page, frame) in [(0, 3), (2, 2), (4, 1), (6, 0)] {
            vm.set_physical_index(page, frame).unwrap();
        }
        vm.commit_physical().unwrap();
        assert!(vm.queue().unwrap().is_empty());

        assert!(matches!(
            vm.enqueue(1),
            Err(Error::Validation(ValidationError::NotPresent(1)))
        ));
        assert!(matches!(
            vm.enqueue(8),
            Err(Error::Validation(ValidationError::UnknownPage(8)))
        ));
        vm.enqueue(6).unwrap();
        assert!(matches!(
            vm.enqueue(6),
            Err(Error::Queue(QueueError::DuplicateInQueue(6)))
        ));

        // an incomplete queue blocks conversion
        assert!(matches!(
            vm.commit_queue(),
            Err(Error::Validation(ValidationError::QueueMismatch {
                expected: 4,
                actual: 1
            }))
        ));

        for page in [4, 2, 0] {
            vm.enqueue(page).unwrap();
        }
        vm.reorder_queue(Move::Later, 0).unwrap();
        assert_eq!(vm.queue().unwrap().to_vec(), vec![4, 6, 2, 0]);
        assert_eq!(vm.remove_from_queue(3).unwrap(), 0);
        vm.enqueue(0).unwrap();
        vm.commit_queue().unwrap();
        assert_eq!(vm.phase(), Phase::Converting);
        assert_eq!(vm.queue().unwrap().to_vec(), vec![4, 6, 2, 0]);
    }

    #[test]
    fn test_fault_scenario_evicts_head() {
        let mut vm = setup_default_session();
        assert_eq!(vm.phase(), Phase::Converting);

        // virtual page 1 (index bits 001) is not present
        let response = vm.translate("2ABC", Direction::VirtualToPhysical).unwrap();
        match response.outcome {
            Outcome::PageFault {
                replaced_page,
                new_page,
                physical_frame,
                ..
            } => {
                assert_eq!(replaced_page, Some(0));
                assert_eq!(new_page, 1);
                assert_eq!(physical_frame, 0);
            }
            other => panic!("expected page fault, got {:?}", other),
        }

        assert_eq!(vm.queue().unwrap().to_vec(), vec![2, 4, 6, 1]);
        assert_eq!(vm.fault_count(), 1);
        assert!(!vm.table().unwrap().find(0).unwrap().present);
    }

    #[test]
    fn test_translate_batch_carries_faults() {
        let mut vm = VmManager::new();
        vm.configure(64, 8).unwrap();
        assert!(matches!(
            vm.translate_batch(&["0000"], Direction::VirtualToPhysical),
            Err(Error::WrongPhase { .. })
        ));

        let mut vm = setup_default_session();
        let results = vm
            .translate_batch(&["2000", "2000", "0000", "zz"], Direction::VirtualToPhysical)
            .unwrap();
        let statuses: Vec<&str> = results
            .iter()
            .map(|r| r.as_ref().map(|t| t.outcome.status()).unwrap_or("rejected"))
            .collect();
        // page 1 evicts page 0, so page 0 faults in turn
        assert_eq!(statuses, vec!["page_fault", "success", "page_fault", "rejected"]);
        assert_eq!(vm.fault_count(), 2);
    }

    #[test]
    fn test_rejected_input_leaves_session_untouched() {
        let mut vm = setup_default_session();
        let table_before = vm.table().unwrap().clone();

        assert!(matches!(
            vm.translate("FFFFF", Direction::VirtualToPhysical),
            Err(Error::Input(_))
        ));
        assert_eq!(vm.table().unwrap(), &table_before);
        assert_eq!(vm.fault_count(), 0);
    }

    #[test]
    fn test_reset_from_any_phase() {
        let mut vm = setup_default_session();
        vm.translate("2000", Direction::VirtualToPhysical).unwrap();
        assert_eq!(vm.fault_count(), 1);

        vm.reset();
        assert_eq!(vm.phase(), Phase::Config);
        assert!(vm.layout().is_none());
        assert!(vm.queue().is_none());
        assert_eq!(vm.fault_count(), 0);

        // a new configuration starts from scratch
        vm.configure(16, 8).unwrap();
        assert_eq!(vm.table().unwrap().len(), 2);
        vm.reset();
        assert_eq!(vm.phase(), Phase::Config);
    }
}
