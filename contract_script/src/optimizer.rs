// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Duplicate-preamble hoisting.
//!
//! Call-convention lowering records every literal push inside a dynamic-call
//! preamble. When the same payload recurs across a contract's bodies, the
//! later sites shrink to a static-slot load and a synthesized initializer
//! stores the literal once. The pass runs after bodies are emitted but
//! before linking assigns final addresses, so rewrites only shift offsets
//! that are not yet final; it never alters call flags or targets, and it is
//! purely an encoding change: compilation is byte-correct with it disabled.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::emit::CodeBuffer;
use crate::lowering::PreambleSite;
use crate::opcode::Opcode;
use crate::resolver::JumpResolver;

/// A mutable view of one not-yet-linked method body.
pub struct BodyView<'a> {
    /// The body's instruction stream.
    pub buf: &'a mut CodeBuffer,
    /// The body's labels and pending fixups.
    pub resolver: &'a mut JumpResolver,
    /// Preamble sites recorded during lowering, in ascending address order.
    pub sites: &'a mut Vec<PreambleSite>,
}

/// Payloads promoted to static slots, in slot order starting at the first
/// free slot. Each entry is the encoded push the initializer replays before
/// storing the slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hoisted {
    /// Encoded pushes, one per newly-occupied static slot.
    pub payloads: Vec<Vec<u8>>,
}

fn load_bytes(slot: u8) -> Vec<u8> {
    if slot <= 6 {
        alloc::vec![Opcode::load_static(slot).byte()]
    } else {
        alloc::vec![Opcode::LdSFld.byte(), slot]
    }
}

/// Hoists recurring preamble payloads into static slots.
///
/// Best-effort: payloads stop being promoted when the slot space above
/// `first_free_slot` runs out or a replacement would not shrink the site.
/// The first site of each promoted payload keeps its inline push; every
/// later site becomes a static-slot load.
pub fn hoist_duplicate_preambles(bodies: &mut [BodyView<'_>], first_free_slot: u8) -> Hoisted {
    let mut counts: HashMap<Vec<u8>, u32> = HashMap::new();
    for body in bodies.iter() {
        for site in body.sites.iter() {
            *counts.entry(site.payload.clone()).or_insert(0) += 1;
        }
    }

    // Slots are handed out in first-use order; `true` marks a payload whose
    // first (kept-inline) site has been passed.
    let mut slots: HashMap<Vec<u8>, (u8, bool)> = HashMap::new();
    let mut payloads = Vec::new();

    for body in bodies.iter_mut() {
        let mut retained = Vec::with_capacity(body.sites.len());
        let mut i = 0;
        while i < body.sites.len() {
            let site = body.sites[i].clone();
            i += 1;

            let (slot, seen) = match slots.get(&site.payload) {
                Some(&entry) => entry,
                None => {
                    let eligible = counts.get(&site.payload).copied().unwrap_or(0) >= 2;
                    let next = usize::from(first_free_slot) + payloads.len();
                    // The initializer declares the slot count in one byte,
                    // so slot indices top out at 254.
                    let fits = next < usize::from(u8::MAX);
                    let profitable =
                        fits && site.payload.len() > load_bytes(next as u8).len();
                    if !(eligible && profitable) {
                        retained.push(site);
                        continue;
                    }
                    payloads.push(site.payload.clone());
                    slots.insert(site.payload.clone(), (next as u8, false));
                    (next as u8, false)
                }
            };

            if !seen {
                // First site keeps its inline push; the initializer will
                // replay this payload into the slot.
                slots.insert(site.payload.clone(), (slot, true));
                retained.push(site);
                continue;
            }

            let replacement = load_bytes(slot);
            let delta = site.len - replacement.len() as u32;
            body.buf.splice(site.at, site.len, &replacement);
            body.resolver.shift_down(site.at, delta);
            for later in body.sites[i..].iter_mut() {
                if later.at > site.at {
                    later.at -= delta;
                }
            }
            for kept in retained.iter_mut() {
                if kept.at > site.at {
                    kept.at -= delta;
                }
            }
        }
        *body.sites = retained;
    }

    Hoisted { payloads }
}

#[cfg(test)]
mod tests {
    use super::{BodyView, Hoisted, hoist_duplicate_preambles};
    use crate::emit::CodeBuffer;
    use crate::lowering::{PreambleSite, push_data};
    use crate::opcode::Opcode;
    use crate::resolver::{BranchMode, JumpResolver};
    use alloc::vec;
    use alloc::vec::Vec;

    fn record(buf: &mut CodeBuffer, sites: &mut Vec<PreambleSite>, data: &[u8]) {
        let at = push_data(buf, data);
        let end = buf.mark();
        sites.push(PreambleSite {
            at,
            len: end - at,
            payload: buf.as_slice()[at as usize..end as usize].to_vec(),
        });
    }

    #[test]
    fn later_sites_shrink_and_labels_shift() {
        let mut buf = CodeBuffer::new();
        let mut asm = JumpResolver::new();
        let mut sites = Vec::new();

        let end = asm.label();
        asm.branch(&mut buf, Opcode::Jmp, end, BranchMode::Auto).unwrap();
        record(&mut buf, &mut sites, &[0xAA; 20]); // at 5, 22 bytes
        record(&mut buf, &mut sites, &[0xAA; 20]); // at 27, 22 bytes
        asm.bind(end, &buf).unwrap(); // 49
        buf.emit(Opcode::Ret);

        let hoisted = hoist_duplicate_preambles(
            &mut [BodyView { buf: &mut buf, resolver: &mut asm, sites: &mut sites }],
            0,
        );
        asm.finish(&mut buf).unwrap();

        // Second site collapsed to ldsfld0, pulling the label back by 21.
        assert_eq!(buf.as_slice()[..5], [0x23, 28, 0, 0, 0]);
        assert_eq!(buf.as_slice()[27], Opcode::LdSFld0.byte());
        assert_eq!(buf.as_slice()[28], Opcode::Ret.byte());
        assert_eq!(buf.as_slice().len(), 29);

        assert_eq!(hoisted.payloads.len(), 1);
        assert_eq!(hoisted.payloads[0].len(), 22);
        // The kept first site survives in the record.
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].at, 5);
    }

    #[test]
    fn duplicates_hoist_across_bodies() {
        let mut buf_a = CodeBuffer::new();
        let mut asm_a = JumpResolver::new();
        let mut sites_a = Vec::new();
        record(&mut buf_a, &mut sites_a, &[0xBB; 20]);

        let mut buf_b = CodeBuffer::new();
        let mut asm_b = JumpResolver::new();
        let mut sites_b = Vec::new();
        record(&mut buf_b, &mut sites_b, &[0xBB; 20]);

        let hoisted = hoist_duplicate_preambles(
            &mut [
                BodyView { buf: &mut buf_a, resolver: &mut asm_a, sites: &mut sites_a },
                BodyView { buf: &mut buf_b, resolver: &mut asm_b, sites: &mut sites_b },
            ],
            3,
        );

        // First use (body a) keeps the push, body b loads slot 3.
        assert_eq!(buf_a.as_slice().len(), 22);
        assert_eq!(buf_b.as_slice(), &[Opcode::LdSFld3.byte()]);
        assert_eq!(hoisted.payloads.len(), 1);
    }

    #[test]
    fn unique_payloads_are_left_alone() {
        let mut buf = CodeBuffer::new();
        let mut asm = JumpResolver::new();
        let mut sites = Vec::new();
        record(&mut buf, &mut sites, &[0x01; 20]);
        record(&mut buf, &mut sites, &[0x02; 20]);
        let before = buf.as_slice().to_vec();

        let hoisted = hoist_duplicate_preambles(
            &mut [BodyView { buf: &mut buf, resolver: &mut asm, sites: &mut sites }],
            0,
        );

        assert_eq!(buf.as_slice(), &before[..]);
        assert_eq!(hoisted, Hoisted::default());
        assert_eq!(sites.len(), 2);
    }

    #[test]
    fn unprofitable_payloads_are_skipped() {
        // A two-byte payload gains nothing against a wide-form slot load.
        let mut buf = CodeBuffer::new();
        let mut asm = JumpResolver::new();
        let mut sites = Vec::new();
        record(&mut buf, &mut sites, &[]);
        record(&mut buf, &mut sites, &[]);
        let before = buf.as_slice().to_vec();

        let hoisted = hoist_duplicate_preambles(
            &mut [BodyView { buf: &mut buf, resolver: &mut asm, sites: &mut sites }],
            7,
        );

        assert_eq!(buf.as_slice(), &before[..]);
        assert!(hoisted.payloads.is_empty());
    }

    #[test]
    fn promotion_stops_when_slots_run_out() {
        let mut buf = CodeBuffer::new();
        let mut asm = JumpResolver::new();
        let mut sites = Vec::new();
        record(&mut buf, &mut sites, &[0x01; 20]);
        record(&mut buf, &mut sites, &[0x01; 20]);
        record(&mut buf, &mut sites, &[0x02; 20]);
        record(&mut buf, &mut sites, &[0x02; 20]);

        let hoisted = hoist_duplicate_preambles(
            &mut [BodyView { buf: &mut buf, resolver: &mut asm, sites: &mut sites }],
            254,
        );

        // Only one slot left: the first recurring payload takes it, the
        // second stays inline at both sites.
        assert_eq!(hoisted.payloads, vec![buf.as_slice()[..22].to_vec()]);
        assert_eq!(sites.len(), 3);
    }
}
