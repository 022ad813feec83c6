//! Declarative kernel argument layout
//!
//! The kernel exposes one fixed positional parameter list:
//!
//! ```text
//! 0: matrix index buffer      (static)
//! 1: matrix value buffer      (static)
//! 2: input vector buffer      (ping-pong)
//! 3: y vector buffer          (static)
//! 4: scalar alpha             (static)
//! 5: scalar beta              (static)
//! 6: output buffer            (ping-pong)
//! 7..: temp global buffers    (static)
//! ..: temp local scratch      (static)
//! ..: integer size parameters (static)
//! ```
//!
//! The layout table is built once from the argument container; initial
//! binding walks the table, and per-iteration rebinding touches only the
//! two ping-pong slots. No hand-maintained slot offsets exist anywhere
//! else in the crate.

use crate::args::ArgContainer;
use crate::scalar::Scalar;

/// What a kernel argument slot carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRole {
    /// Encoded matrix index array
    MatrixIndices,
    /// Encoded matrix value array
    MatrixValues,
    /// The vector currently holding the "input" role
    InputVector,
    /// The static second semiring input vector
    YVector,
    /// Scalar coefficient alpha, passed by value
    Alpha,
    /// Scalar coefficient beta, passed by value
    Beta,
    /// The buffer currently holding the "output" role
    Output,
    /// Temporary device-global buffer (index into the temp list)
    TempGlobal(usize),
    /// Temporary device-local scratch, bound by size only (index into the list)
    TempLocal(usize),
    /// Integer size parameter, passed by value (index into the list)
    SizeParam(usize),
}

/// Whether a slot survives role swaps unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotBinding {
    /// Bound once at setup, never rebound
    Static,
    /// Rebound after every iteration when the input/output roles swap
    PingPong,
}

/// One entry of the argument layout table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSlot {
    /// Positional kernel argument index
    pub index: u32,
    /// What the slot carries
    pub role: ArgRole,
    /// Static or ping-pong
    pub binding: SlotBinding,
}

/// The fixed, ordered argument layout for one kernel
#[derive(Debug, Clone)]
pub struct ArgLayout {
    slots: Vec<ArgSlot>,
    input_slot: u32,
    output_slot: u32,
}

impl ArgLayout {
    /// Build the layout table from an argument container
    #[must_use]
    pub fn from_args<T: Scalar>(args: &ArgContainer<T>) -> Self {
        let mut slots = Vec::with_capacity(
            7 + args.temp_globals.len() + args.temp_locals.len() + args.size_args.len(),
        );
        let mut push = |slots: &mut Vec<ArgSlot>, role: ArgRole, binding: SlotBinding| {
            let index = u32::try_from(slots.len()).unwrap_or(u32::MAX);
            slots.push(ArgSlot {
                index,
                role,
                binding,
            });
        };

        push(&mut slots, ArgRole::MatrixIndices, SlotBinding::Static);
        push(&mut slots, ArgRole::MatrixValues, SlotBinding::Static);
        push(&mut slots, ArgRole::InputVector, SlotBinding::PingPong);
        push(&mut slots, ArgRole::YVector, SlotBinding::Static);
        push(&mut slots, ArgRole::Alpha, SlotBinding::Static);
        push(&mut slots, ArgRole::Beta, SlotBinding::Static);
        push(&mut slots, ArgRole::Output, SlotBinding::PingPong);
        for i in 0..args.temp_globals.len() {
            push(&mut slots, ArgRole::TempGlobal(i), SlotBinding::Static);
        }
        for i in 0..args.temp_locals.len() {
            push(&mut slots, ArgRole::TempLocal(i), SlotBinding::Static);
        }
        for i in 0..args.size_args.len() {
            push(&mut slots, ArgRole::SizeParam(i), SlotBinding::Static);
        }

        let input_slot = Self::find_slot(&slots, ArgRole::InputVector);
        let output_slot = Self::find_slot(&slots, ArgRole::Output);
        Self {
            slots,
            input_slot,
            output_slot,
        }
    }

    fn find_slot(slots: &[ArgSlot], role: ArgRole) -> u32 {
        slots
            .iter()
            .find(|s| s.role == role)
            .map_or(0, |s| s.index)
    }

    /// The ordered slot table
    #[must_use]
    pub fn slots(&self) -> &[ArgSlot] {
        &self.slots
    }

    /// Slot holding the current input vector
    #[must_use]
    pub fn input_slot(&self) -> u32 {
        self.input_slot
    }

    /// Slot holding the current output buffer
    #[must_use]
    pub fn output_slot(&self) -> u32 {
        self.output_slot
    }

    /// Total number of kernel arguments
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the table is empty (never the case for a built layout)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args() -> ArgContainer<i32> {
        ArgContainer::new(vec![0u8; 4], vec![0u8; 4])
            .with_vectors(&[1, 0], &[0, 0])
            .with_temp_globals(vec![16, 32])
            .with_temp_locals(vec![64])
            .with_size_args(vec![2, 7])
    }

    #[test]
    fn test_fixed_slot_order() {
        let layout = ArgLayout::from_args(&sample_args());
        let roles: Vec<ArgRole> = layout.slots().iter().map(|s| s.role).collect();
        assert_eq!(
            roles,
            vec![
                ArgRole::MatrixIndices,
                ArgRole::MatrixValues,
                ArgRole::InputVector,
                ArgRole::YVector,
                ArgRole::Alpha,
                ArgRole::Beta,
                ArgRole::Output,
                ArgRole::TempGlobal(0),
                ArgRole::TempGlobal(1),
                ArgRole::TempLocal(0),
                ArgRole::SizeParam(0),
                ArgRole::SizeParam(1),
            ]
        );
        assert_eq!(layout.len(), 12);
    }

    #[test]
    fn test_slot_indices_are_positional() {
        let layout = ArgLayout::from_args(&sample_args());
        for (i, slot) in layout.slots().iter().enumerate() {
            assert_eq!(slot.index as usize, i);
        }
    }

    #[test]
    fn test_exactly_two_ping_pong_slots() {
        let layout = ArgLayout::from_args(&sample_args());
        let dynamic: Vec<u32> = layout
            .slots()
            .iter()
            .filter(|s| s.binding == SlotBinding::PingPong)
            .map(|s| s.index)
            .collect();
        assert_eq!(dynamic, vec![layout.input_slot(), layout.output_slot()]);
        assert_eq!(layout.input_slot(), 2);
        assert_eq!(layout.output_slot(), 6);
    }
}
