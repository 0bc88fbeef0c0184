/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use rustc_hash::FxHashMap;

use super::types::VehicleId;
use crate::tools::error::AppError;

/// Per-vehicle sliding window limiter on alert episodes.
///
/// Hits are bucketed into frames of `frame_len` seconds. A hit is admitted when the hits
/// of the previous frame, weighted by how much of it still overlaps the window, plus the
/// hits of the current frame stay below `frame_hits_lim`.
#[derive(Debug, Clone)]
pub struct SlidingWindowRateLimiter {
    frame_hits_lim: usize,
    frame_len: u32,
    hits: FxHashMap<VehicleId, Vec<i64>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(frame_hits_lim: usize, frame_len: u32) -> Self {
        Self {
            frame_hits_lim,
            frame_len: frame_len.max(1),
            hits: FxHashMap::default(),
        }
    }

    /// Records a hit for `key` at `curr_time` (unix seconds) if the limit allows it.
    pub fn check_and_record(&mut self, key: &VehicleId, curr_time: i64) -> Result<(), AppError> {
        let frame_len = self.frame_len as i64;
        let curr_frame = curr_time.div_euclid(frame_len);

        let hits_frame = self.hits.entry(key.to_owned()).or_default();
        hits_frame.retain(|frame| *frame == curr_frame - 1 || *frame == curr_frame);

        let curr_frame_hits_len = hits_frame
            .iter()
            .filter(|frame| **frame == curr_frame)
            .count();
        let prev_frame_hits_len = hits_frame.len() - curr_frame_hits_len;
        let prev_frame_weight = 1.0 - curr_time.rem_euclid(frame_len) as f64 / frame_len as f64;

        if (prev_frame_hits_len as f64 * prev_frame_weight) as usize + curr_frame_hits_len
            < self.frame_hits_lim
        {
            hits_frame.push(curr_frame);
            Ok(())
        } else {
            Err(AppError::HitsLimitExceeded(key.to_string()))
        }
    }
}
