use serde::Serialize;

use crate::codec::{
    binary_to_decimal, binary_to_hex, decimal_to_binary, fit_to_width, format_grouped,
    hex_digits_for, hex_string_to_binary,
};
use crate::error::{CodecError, InputError, Result};
use crate::fifo::ReplacementQueue;
use crate::layout::MemoryLayout;
use crate::page_table::PageTable;

/// Which way an address is converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    #[serde(rename = "v2p")]
    VirtualToPhysical,
    #[serde(rename = "p2v")]
    PhysicalToVirtual,
}

impl Direction {
    fn kind(&self) -> &'static str {
        match self {
            Direction::VirtualToPhysical => "virtual",
            Direction::PhysicalToVirtual => "physical",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v2p" => Ok(Direction::VirtualToPhysical),
            "p2v" => Ok(Direction::PhysicalToVirtual),
            _ => Err(format!("Unknown direction {:?}, expected v2p or p2v", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::VirtualToPhysical => write!(f, "v2p"),
            Direction::PhysicalToVirtual => write!(f, "p2v"),
        }
    }
}

/// An address split into its page/frame index and its offset bits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFields {
    pub index: u64,
    pub offset: String,
}

impl AddressFields {
    /// Split a virtual address: `index_bits` of page index, then the offset.
    pub fn virtual_address(layout: &MemoryLayout, binary: &str) -> std::result::Result<Self, CodecError> {
        check_width(binary, layout.total_bits())?;
        let (index, offset) = binary.split_at(layout.index_bits() as usize);
        Ok(AddressFields {
            index: binary_to_decimal(index)?,
            offset: offset.to_string(),
        })
    }

    /// Split a physical address: `index_bits - 1` of frame index, then the
    /// offset. With a single frame that field has no bits, so the top bit is
    /// read as the frame instead and the whole address stays offset. Any frame
    /// but 0 is then out of range.
    pub fn physical_address(layout: &MemoryLayout, binary: &str) -> std::result::Result<Self, CodecError> {
        check_width(binary, layout.physical_bits())?;
        let frame_bits = layout.frame_bits();
        if frame_bits == 0 {
            return Ok(AddressFields {
                index: binary_to_decimal(&binary[..1])?,
                offset: binary.to_string(),
            });
        }
        let (index, offset) = binary.split_at(frame_bits as usize);
        Ok(AddressFields {
            index: binary_to_decimal(index)?,
            offset: offset.to_string(),
        })
    }
}

impl std::fmt::Display for AddressFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(index={}, offset={})", self.index, self.offset)
    }
}

fn check_width(binary: &str, width: u32) -> std::result::Result<(), CodecError> {
    if let Some(bad) = binary.chars().find(|c| *c != '0' && *c != '1') {
        return Err(CodecError::InvalidBit(bad));
    }
    if binary.len() != width as usize {
        return Err(CodecError::FieldOverflow {
            value: binary.len() as u64,
            width,
        });
    }
    Ok(())
}

/// Outcome of one conversion. Each status carries only its own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        output_binary: String,
        output_hex: String,
        virtual_page: u64,
        physical_frame: u64,
        message: String,
    },
    PageFault {
        output_binary: String,
        output_hex: String,
        /// Page evicted to make room, none when a free frame was used
        #[serde(skip_serializing_if = "Option::is_none")]
        replaced_page: Option<u64>,
        new_page: u64,
        physical_frame: u64,
        message: String,
    },
    Unmapped {
        physical_frame: u64,
        message: String,
    },
    Error {
        message: String,
    },
}

impl Outcome {
    fn error(message: impl Into<String>) -> Self {
        Outcome::Error {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success { message, .. }
            | Outcome::PageFault { message, .. }
            | Outcome::Unmapped { message, .. }
            | Outcome::Error { message } => message,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::PageFault { .. } => "page_fault",
            Outcome::Unmapped { .. } => "unmapped",
            Outcome::Error { .. } => "error",
        }
    }

    /// Converted address as hex, when the conversion produced one
    pub fn output_hex(&self) -> Option<&str> {
        match self {
            Outcome::Success { output_hex, .. } | Outcome::PageFault { output_hex, .. } => {
                Some(output_hex)
            }
            _ => None,
        }
    }
}

/// A translation request together with its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationResponse {
    pub direction: Direction,
    pub input_hex: String,
    pub input_binary: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl std::fmt::Display for TranslationResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} [{}] -> ", self.direction, self.input_hex, self.input_binary)?;
        match &self.outcome {
            Outcome::Success {
                output_binary,
                output_hex,
                ..
            }
            | Outcome::PageFault {
                output_binary,
                output_hex,
                ..
            } => write!(
                f,
                "{} [{}] {}: {}",
                output_hex,
                output_binary,
                self.outcome.status(),
                self.outcome.message()
            ),
            _ => write!(f, "{}: {}", self.outcome.status(), self.outcome.message()),
        }
    }
}

/// Translation engine over a fully set up page table.
///
/// Only built once every page table and queue invariant has been committed,
/// so each call starts from a table with one present page per frame and a
/// queue listing exactly those pages.
#[derive(Debug, Clone)]
pub struct Translator {
    layout: MemoryLayout,
    table: PageTable,
    queue: ReplacementQueue,
    faults: u64,
}

impl Translator {
    pub(crate) fn new(layout: MemoryLayout, table: PageTable, queue: ReplacementQueue) -> Self {
        Translator {
            layout,
            table,
            queue,
            faults: 0,
        }
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub fn table(&self) -> &PageTable {
        &self.table
    }

    pub fn queue(&self) -> &ReplacementQueue {
        &self.queue
    }

    pub fn fault_count(&self) -> u64 {
        self.faults
    }

    /// Convert a hex address. Malformed or too wide input is rejected with an
    /// `InputError` and leaves the session untouched.
    pub fn translate(&mut self, address_hex: &str, direction: Direction) -> Result<TranslationResponse> {
        let binary = self.parse_input(address_hex, direction)?;
        let outcome = match direction {
            Direction::VirtualToPhysical => self.virtual_to_physical(&binary)?,
            Direction::PhysicalToVirtual => self.physical_to_virtual(&binary)?,
        };

        if let Outcome::Error { message } = &outcome {
            log::warn!("{} {}: {}", direction, address_hex, message);
        }

        Ok(TranslationResponse {
            direction,
            input_hex: address_hex.to_string(),
            input_binary: format_grouped(&binary),
            outcome,
        })
    }

    /// Translate a list of addresses in order, faults from earlier entries
    /// affecting later ones.
    pub fn translate_batch<S: AsRef<str>>(
        &mut self,
        addresses: &[S],
        direction: Direction,
    ) -> Vec<Result<TranslationResponse>> {
        addresses
            .iter()
            .map(|address| self.translate(address.as_ref(), direction))
            .collect()
    }

    fn parse_input(&self, address_hex: &str, direction: Direction) -> Result<String> {
        if address_hex.is_empty() {
            return Err(InputError::Empty.into());
        }
        let binary = hex_string_to_binary(address_hex)
            .map_err(|_| InputError::InvalidHex(address_hex.to_string()))?;

        let width = match direction {
            Direction::VirtualToPhysical => self.layout.total_bits(),
            Direction::PhysicalToVirtual => self.layout.physical_bits(),
        };
        let fitted = fit_to_width(&binary, width).ok_or_else(|| InputError::AddressTooWide {
            input: address_hex.to_string(),
            kind: direction.kind(),
            max: format!("{:X}", (1u64 << width) - 1),
        })?;
        Ok(fitted)
    }

    /// Grouped binary and hex of an output address. Hex is padded to the
    /// width of a virtual address in both directions.
    fn render(&self, binary: &str) -> std::result::Result<(String, String), CodecError> {
        let hex = binary_to_hex(binary, hex_digits_for(self.layout.total_bits()))?;
        Ok((format_grouped(binary), hex))
    }

    fn page_bits(&self, page: u64) -> String {
        decimal_to_binary(page, self.layout.index_bits()).unwrap_or_else(|_| page.to_string())
    }

    /// Translate a `total_bits` wide binary virtual address. A miss runs
    /// fault handling and may evict the oldest page.
    pub fn virtual_to_physical(&mut self, binary: &str) -> Result<Outcome> {
        let fields = AddressFields::virtual_address(&self.layout, binary)?;
        let page = fields.index;

        let Some(&entry) = self.table.find(page) else {
            return Ok(Outcome::error("Error finding virtual page!"));
        };

        if !entry.present {
            return Ok(self.handle_page_fault(page, &fields.offset));
        }

        let frame = entry.physical_index;
        let physical = decimal_to_binary(frame, self.layout.frame_bits())? + &fields.offset;
        let (output_binary, output_hex) = self.render(&physical)?;
        log::debug!("Hit: page {} in frame {}", page, frame);

        Ok(Outcome::Success {
            output_binary,
            output_hex,
            virtual_page: page,
            physical_frame: frame,
            message: "Memory address conversion successful!".to_string(),
        })
    }

    /// Bring `page` into memory: the next free frame while one exists, else
    /// the frame of the oldest page in the arrival queue. Every check runs
    /// before the first mutation, so an error outcome leaves no trace.
    fn handle_page_fault(&mut self, page: u64, offset: &str) -> Outcome {
        let occupied = self.table.present_count() as u64;
        let capacity = self.layout.frame_count();

        let (frame, victim) = if occupied < capacity {
            (occupied, None)
        } else {
            let Some(victim) = self.queue.peek_oldest() else {
                return Outcome::error("Arrival queue is empty - cannot handle page fault");
            };
            match self.table.find(victim) {
                Some(entry) if entry.present => (entry.physical_index, Some(victim)),
                _ => return Outcome::error("Error finding page to replace"),
            }
        };

        if self.queue.contains(page) {
            return Outcome::error(format!("Page {} is queued but not present", self.page_bits(page)));
        }

        let physical = match decimal_to_binary(frame, self.layout.frame_bits()) {
            Ok(bits) => bits + offset,
            Err(e) => return Outcome::error(e.to_string()),
        };
        let (output_binary, output_hex) = match self.render(&physical) {
            Ok(rendered) => rendered,
            Err(e) => return Outcome::error(e.to_string()),
        };

        if let Err(e) = self.apply_fault(page, frame, victim) {
            return Outcome::error(e.to_string());
        }

        let message = match victim {
            Some(victim) => {
                log::info!("Page fault: page {} replaced page {} in frame {}", page, victim, frame);
                format!(
                    "Page fault handled: Replaced page {} with page {}",
                    self.page_bits(victim),
                    self.page_bits(page)
                )
            }
            None => {
                log::info!("Page fault: page {} loaded into free frame {}", page, frame);
                format!(
                    "Page fault handled: Loaded page {} into frame {}",
                    self.page_bits(page),
                    frame
                )
            }
        };

        Outcome::PageFault {
            output_binary,
            output_hex,
            replaced_page: victim,
            new_page: page,
            physical_frame: frame,
            message,
        }
    }

    fn apply_fault(&mut self, page: u64, frame: u64, victim: Option<u64>) -> Result<()> {
        if let Some(victim) = victim {
            self.queue.dequeue_oldest()?;
            self.table.set_present(victim, false)?;
        }
        self.table.map(page, frame)?;
        self.queue.enqueue(page)?;
        self.faults += 1;
        Ok(())
    }

    /// Translate a `total_bits - 1` wide binary physical address. Never
    /// faults and never changes the table: a frame is mapped or it is not.
    pub fn physical_to_virtual(&self, binary: &str) -> Result<Outcome> {
        let fields = AddressFields::physical_address(&self.layout, binary)?;
        self.lookup_frame(fields.index, &fields.offset)
    }

    /// Reverse lookup of a frame number, reassembling the virtual address
    /// around `offset`. Frames past the last one are reported as an error.
    fn lookup_frame(&self, frame: u64, offset: &str) -> Result<Outcome> {
        let max_frame = self.layout.frame_count() - 1;

        if frame > max_frame {
            return Ok(Outcome::error(format!(
                "Invalid physical page index: {}. Maximum is {}.",
                frame, max_frame
            )));
        }

        let Some(entry) = self.table.find_by_physical(frame, true) else {
            log::debug!("Frame {} is not mapped", frame);
            return Ok(Outcome::Unmapped {
                physical_frame: frame,
                message: format!(
                    "Physical index {} is not mapped to any virtual page index.",
                    frame
                ),
            });
        };

        let page = entry.virtual_index;
        let virtual_address = decimal_to_binary(page, self.layout.index_bits())? + offset;
        let (output_binary, output_hex) = self.render(&virtual_address)?;
        log::debug!("Frame {} holds page {}", frame, page);

        Ok(Outcome::Success {
            output_binary,
            output_hex,
            virtual_page: page,
            physical_frame: frame,
            message: "Memory address conversion successful!".to_string(),
        })
    }
}
