//! String normalization and the classical Ratcliff/Obershelp gestalt ratio
//! used by the catalog resolver.

/// Lowercases, strips every character that is neither alphanumeric nor
/// whitespace, and trims the result.
pub fn normalize(text: &str) -> String {
	text.chars()
		.filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
		.flat_map(char::to_lowercase)
		.collect::<String>()
		.trim()
		.to_owned()
}

/// Computes the gestalt pattern matching ratio in `[0, 1]`: twice the number
/// of matching characters in the optimal alignment divided by the total
/// length of both strings.
///
/// Deterministic for identical inputs; two empty strings score `1.0`.
pub fn gestalt_ratio(a: &str, b: &str) -> f64 {
	let a = a.chars().collect::<Vec<_>>();
	let b = b.chars().collect::<Vec<_>>();
	let total = a.len() + b.len();

	if total == 0 {
		return 1.0;
	}

	2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Counts matched characters by anchoring on the longest common run, then
/// recursing into the unmatched left and right remainders.
fn matching_chars(a: &[char], b: &[char]) -> usize {
	let (start_a, start_b, len) = longest_common_run(a, b);

	if len == 0 {
		return 0;
	}

	len + matching_chars(&a[..start_a], &b[..start_b])
		+ matching_chars(&a[start_a + len..], &b[start_b + len..])
}

/// Finds the longest common contiguous run; ties break to the earliest
/// position in `a`, then in `b`, keeping the alignment reproducible.
fn longest_common_run(a: &[char], b: &[char]) -> (usize, usize, usize) {
	let mut best = (0, 0, 0);
	let mut prev = vec![0usize; b.len() + 1];

	for (i, &ch_a) in a.iter().enumerate() {
		let mut row = vec![0usize; b.len() + 1];

		for (j, &ch_b) in b.iter().enumerate() {
			if ch_a == ch_b {
				let run = prev[j] + 1;

				row[j + 1] = run;

				if run > best.2 {
					best = (i + 1 - run, j + 1 - run, run);
				}
			}
		}

		prev = row;
	}

	best
}
