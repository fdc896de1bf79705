//! Decoding of raw timing tables into snapshot types
//!
//! All tables are little-endian. Decoders never fail on short input: missing
//! bytes read as zero, missing clock words read as "not stamped".

use std::collections::BTreeMap;
use tracing::trace;

use super::layout::{
    CAR_STATE_SIZE, CAR_STATE_WORDS, CLOCK_SENTINEL, MAX_CAR_STATUS, MAX_LAPS_DOWN,
    NAME_SLOT_SIZE, SlotMapping, TRACK_UNITS_PER_INCH, field,
};
use crate::types::{CarIdx, CarState, LapClock, lap_duration_ms};

const INCHES_PER_MILE: f64 = 12.0 * 5280.0;

/// Read an unsigned little-endian word at a byte offset.
pub fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a signed little-endian word at a byte offset.
pub fn read_i32_le(data: &[u8], offset: usize) -> Option<i32> {
    read_u32_le(data, offset).map(|v| v as i32)
}

/// Split a byte buffer into signed little-endian words. Trailing bytes are ignored.
pub fn words_le(data: &[u8]) -> Vec<i32> {
    data.chunks_exact(4).map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

fn clock_word(block: &[u8], word: usize) -> Option<LapClock> {
    read_u32_le(block, word * 4).filter(|&v| v != CLOCK_SENTINEL).map(LapClock)
}

/// Decode one per-car block.
pub fn decode_car_state(struct_index: CarIdx, block: &[u8]) -> CarState {
    let word = |index: usize| read_u32_le(block, index * 4);
    let signed = |index: usize| read_i32_le(block, index * 4).unwrap_or(0);

    // the game stores the lap being run, 1-based
    let laps_completed = word(field::CURRENT_LAP).unwrap_or(0).saturating_sub(1);

    let lap_start_clock = clock_word(block, field::LAP_START_CLOCK);
    let lap_end_clock = clock_word(block, field::LAP_END_CLOCK);

    let laps_down = word(field::LAPS_DOWN).filter(|&v| v <= MAX_LAPS_DOWN).unwrap_or(0);
    let car_status = word(field::CAR_STATUS).filter(|&v| v <= MAX_CAR_STATUS).unwrap_or(0);

    let (last_lap_ms, last_lap_valid) = match (lap_start_clock, lap_end_clock) {
        (Some(start), Some(end)) => (lap_duration_ms(start, end), true),
        _ => (0, false),
    };

    let values = (0..CAR_STATE_WORDS).map(signed).collect();

    CarState {
        struct_index,
        laps_left: word(field::LAPS_LEFT).unwrap_or(0),
        laps_completed,
        last_lap_ms,
        last_lap_valid,
        laps_down,
        lap_end_clock,
        lap_start_clock,
        car_status,
        current_lp: word(field::CURRENT_LP).unwrap_or(0),
        fuel_laps_remaining: word(field::FUEL_LAPS_REMAINING).unwrap_or(0),
        dlat: signed(field::DLAT),
        dlong: signed(field::DLONG),
        values,
    }
}

/// Decode `raw_count` consecutive car blocks. A short blob is zero-padded.
pub fn decode_car_states(blob: &[u8], raw_count: usize) -> BTreeMap<CarIdx, Option<CarState>> {
    let total = raw_count * CAR_STATE_SIZE;
    let mut padded;
    let data = if blob.len() < total {
        trace!(have = blob.len(), want = total, "Padding short car state blob");
        padded = blob.to_vec();
        padded.resize(total, 0);
        &padded[..]
    } else {
        blob
    };

    (0..raw_count)
        .map(|idx| {
            let start = idx * CAR_STATE_SIZE;
            (idx, Some(decode_car_state(idx, &data[start..start + CAR_STATE_SIZE])))
        })
        .collect()
}

/// Translate running-order words into struct indices.
///
/// Out-of-range entries and the pace car (index 0) are dropped. The result has
/// exactly `display_count` entries, padded with `None`.
pub fn decode_order(
    words: &[i32],
    raw_count: usize,
    display_count: usize,
    index_base: usize,
) -> Vec<Option<CarIdx>> {
    let mut order: Vec<Option<CarIdx>> = words
        .iter()
        .filter_map(|&v| {
            let idx = i64::from(v) - if index_base == 1 { 1 } else { 0 };
            usize::try_from(idx).ok()
        })
        .filter(|&idx| idx > 0 && idx < raw_count)
        .take(display_count)
        .map(Some)
        .collect();
    order.resize(display_count, None);
    order
}

fn slot_for(struct_index: CarIdx, base: isize, shift: isize) -> Option<usize> {
    usize::try_from(struct_index as isize + base + shift).ok()
}

/// Decode a NUL-terminated ASCII name slot.
pub fn decode_name(slot: &[u8]) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    let text: String = slot[..end].iter().filter(|b| b.is_ascii()).map(|&b| b as char).collect();
    text.trim().to_string()
}

/// Decode the driver name table for every struct index.
pub fn decode_names(
    blob: &[u8],
    raw_count: usize,
    mapping: &SlotMapping,
) -> BTreeMap<CarIdx, String> {
    (0..raw_count)
        .map(|idx| {
            let name = slot_for(idx, mapping.names_index_base, mapping.names_shift)
                .and_then(|slot| {
                    let start = slot * NAME_SLOT_SIZE;
                    blob.get(start..start + NAME_SLOT_SIZE)
                })
                .map(decode_name)
                .unwrap_or_default();
            (idx, name)
        })
        .collect()
}

/// Decode the car number table for every struct index.
pub fn decode_numbers(
    words: &[i32],
    raw_count: usize,
    mapping: &SlotMapping,
) -> BTreeMap<CarIdx, Option<u32>> {
    (0..raw_count)
        .map(|idx| {
            let number = slot_for(idx, mapping.numbers_index_base, mapping.numbers_shift)
                .and_then(|slot| words.get(slot))
                .and_then(|&v| u32::try_from(v).ok());
            (idx, number)
        })
        .collect()
}

/// Convert the raw track length word into miles. Non-positive values read as 0.
pub fn track_length_miles(raw: i32) -> f64 {
    if raw <= 0 {
        return 0.0;
    }
    f64::from(raw) / TRACK_UNITS_PER_INCH / INCHES_PER_MILE
}

/// Decode a NUL-terminated track folder name.
pub fn decode_track_name(bytes: &[u8]) -> String {
    decode_name(bytes)
}
