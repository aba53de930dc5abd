use std::mem;

use crate::model::{Candidate, StepTrace};

/// Prunes a step's candidate lists according to its `sample_rate`.
///
/// Decisions and exact counts always survive: before any pruning the counts
/// are pinned from the list lengths (unless the producer already supplied
/// them), and the decision log is untouched. Candidate selection is
/// pseudo-random but deterministic — candidates are ranked by
/// `blake3(step_name, id)` and the lowest digests win — so a re-run of the
/// same pipeline samples the same ids.
pub fn apply_sampling(step: &mut StepTrace) {
	let rate = normalize_rate(step.sample_rate);

	if rate >= 1.0 {
		return;
	}

	if step.input_count.is_none() {
		step.input_count = Some(step.input_candidates.len() as i64);
	}
	if step.output_count.is_none() {
		step.output_count = Some(step.output_candidates.len() as i64);
	}

	let step_name = step.step_name.clone();

	step.input_candidates = sample_candidates(&step_name, mem::take(&mut step.input_candidates), rate);
	step.output_candidates =
		sample_candidates(&step_name, mem::take(&mut step.output_candidates), rate);
}

/// `max(1, round(rate * len))`, capped at `len`; a rate of zero keeps nothing.
pub fn sample_size(len: usize, rate: f64) -> usize {
	if len == 0 || rate <= 0.0 {
		return 0;
	}
	if rate >= 1.0 {
		return len;
	}

	((rate * len as f64).round() as usize).max(1).min(len)
}

fn normalize_rate(rate: f64) -> f64 {
	if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 1.0 }
}

fn sample_candidates(step_name: &str, candidates: Vec<Candidate>, rate: f64) -> Vec<Candidate> {
	let keep = sample_size(candidates.len(), rate);

	if keep >= candidates.len() {
		return candidates;
	}
	if keep == 0 {
		return Vec::new();
	}

	let mut ranked: Vec<(u64, usize)> = candidates
		.iter()
		.enumerate()
		.map(|(index, candidate)| (candidate_digest(step_name, &candidate.id), index))
		.collect();

	ranked.sort_unstable();
	ranked.truncate(keep);
	// Survivors come back in their original relative order.
	ranked.sort_unstable_by_key(|(_, index)| *index);

	let mut survivors: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();

	ranked.into_iter().filter_map(|(_, index)| survivors[index].take()).collect()
}

fn candidate_digest(step_name: &str, id: &str) -> u64 {
	let mut hasher = blake3::Hasher::new();

	hasher.update(step_name.as_bytes());
	hasher.update(&[0]);
	hasher.update(id.as_bytes());

	let digest = hasher.finalize();
	let mut bytes = [0_u8; 8];

	bytes.copy_from_slice(&digest.as_bytes()[..8]);

	u64::from_le_bytes(bytes)
}
