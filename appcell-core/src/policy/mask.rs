/*
 * appcell-core
 *
 * Copyright (C) 2023-2024 Xavier Moffett <sapphirus@azorium.net>
 * SPDX-License-Identifier: GPL-3.0-only
 *
 * This library is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use bitflags::Flags;

/// A tri-state bitmask pair: every bit of a flag set is one of {unset, explicitly-on,
/// explicitly-off}. `enabled` only carries meaning for bits present in `valid`; the invariant
/// `enabled & !valid == 0` is restored after every mutation rather than merely checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriMask<T> {
    enabled: T,
    valid: T,
}

impl<T> TriMask<T>
where
    T: Flags + Copy,
{
    pub fn new() -> Self {
        Self {
            enabled: T::empty(),
            valid: T::empty(),
        }
    }

    /// Marks `bits` as explicitly set to `enabled`.
    pub fn set(&mut self, bits: T, enabled: bool) {
        self.valid = self.valid.union(bits);
        self.enabled.set(bits, enabled);
        self.restore_invariant();
    }

    pub fn is_enabled(&self, bits: T) -> bool {
        self.enabled.intersects(bits)
    }

    pub fn is_valid(&self, bits: T) -> bool {
        self.valid.intersects(bits)
    }

    pub fn enabled(&self) -> T {
        self.enabled
    }

    pub fn valid(&self) -> T {
        self.valid
    }

    /// `self` is the merge destination; `other` is the source. Bits valid in `other` overwrite
    /// the corresponding bits of `self`; bits unspecified by `other` are left untouched.
    pub fn merge(&mut self, other: &Self) {
        let carried = self.enabled.difference(other.valid);
        let incoming = other.enabled.intersection(other.valid);

        self.enabled = carried.union(incoming);
        self.valid = self.valid.union(other.valid);
        self.restore_invariant();
    }

    fn restore_invariant(&mut self) {
        self.enabled = self.enabled.intersection(self.valid);
    }
}

#[cfg(test)]
mod tests {
    use bitflags::bitflags;

    use super::*;

    bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        struct Bit: u8 {
            const A = 0b01;
            const B = 0b10;
        }
    }

    #[test]
    fn invariant_holds_after_set() {
        let mut m = TriMask::<Bit>::new();

        m.set(Bit::A, true);
        assert_eq!(m.enabled() & !m.valid(), Bit::empty());
        assert!(m.is_enabled(Bit::A));
        assert!(m.is_valid(Bit::A));
        assert!(!m.is_valid(Bit::B));
    }

    #[test]
    fn merge_preserves_prior_choice_for_unspecified_bits() {
        let mut dest = TriMask::<Bit>::new();
        dest.set(Bit::A, true);

        let mut src = TriMask::<Bit>::new();
        src.set(Bit::B, false);

        dest.merge(&src);

        assert!(dest.is_valid(Bit::A));
        assert!(dest.is_enabled(Bit::A));
        assert!(dest.is_valid(Bit::B));
        assert!(!dest.is_enabled(Bit::B));
        assert_eq!(dest.enabled() & !dest.valid(), Bit::empty());
    }

    #[test]
    fn merge_overwrites_when_source_marks_bit_invalid_disabled() {
        // Scenario 4 from the spec: P1 enables X11; P2 marks X11 invalid-but-disabled while
        // also validating Wayland-enabled. Net effect: X11 turns off, Wayland turns on.
        bitflags! {
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
            struct Socket: u8 {
                const X11 = 0b01;
                const WAYLAND = 0b10;
            }
        }

        let mut p1 = TriMask::<Socket>::new();
        p1.set(Socket::X11, true);

        let mut p2 = TriMask::<Socket>::new();
        p2.set(Socket::X11, false);
        p2.set(Socket::WAYLAND, true);

        p1.merge(&p2);

        assert_eq!(p1.valid(), Socket::X11 | Socket::WAYLAND);
        assert_eq!(p1.enabled(), Socket::WAYLAND);
    }
}
