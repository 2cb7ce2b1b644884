//! Free-text to catalog-product resolution with a confidence score.

// self
use crate::{
	_prelude::*,
	catalog::{CatalogItem, similarity},
};

/// Minimum gestalt ratio accepted as a confident single match.
pub const MATCH_THRESHOLD: f64 = 0.62;
/// Maximum number of disambiguation choices returned on a miss.
pub const CHOICE_LIMIT: usize = 10;

/// Minimal product reference offered as a disambiguation choice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRef {
	/// Upstream product identifier.
	pub product_id: String,
	/// Display name.
	pub name: String,
}
impl From<&CatalogItem> for ChoiceRef {
	fn from(item: &CatalogItem) -> Self {
		Self { product_id: item.product_id.clone(), name: item.name.clone() }
	}
}

/// Outcome of resolving a free-text phrase against the catalog.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MatchResult {
	/// A single candidate cleared the confidence threshold.
	#[serde(rename_all = "camelCase")]
	Matched {
		/// Always `true`; kept on the wire for caller branching.
		matched: bool,
		/// Best score, rounded to 3 decimals.
		confidence: f64,
		/// Winning product identifier.
		product_id: String,
		/// Winning product name.
		name: String,
		/// Winning product resource types.
		resource_types: Vec<String>,
		/// Winning product duration.
		duration_minutes: u32,
	},
	/// No candidate was confident enough; the caller should present choices.
	#[serde(rename_all = "camelCase")]
	Unmatched {
		/// Always `false`.
		matched: bool,
		/// Best score when similarity was computed at all.
		#[serde(skip_serializing_if = "Option::is_none")]
		confidence: Option<f64>,
		/// Up to [`CHOICE_LIMIT`] catalog entries for a disambiguation menu.
		choices: Vec<ChoiceRef>,
	},
}

/// Resolves a free-text phrase to a catalog product.
///
/// Both the query and every candidate name are normalized before scoring; the
/// maximum-score candidate wins, with ties broken by the first-encountered
/// candidate in catalog order. An empty normalized query or an empty catalog
/// short-circuits to an unmatched result without computing similarity.
pub fn resolve(query: &str, items: &[CatalogItem]) -> MatchResult {
	let text = similarity::normalize(query);

	if text.is_empty() || items.is_empty() {
		return MatchResult::Unmatched { matched: false, confidence: None, choices: choices(items) };
	}

	let mut best: (f64, &CatalogItem) = (f64::MIN, &items[0]);

	for item in items {
		let score = similarity::gestalt_ratio(&text, &similarity::normalize(&item.name));

		if score > best.0 {
			best = (score, item);
		}
	}

	let (score, item) = best;

	if score < MATCH_THRESHOLD {
		return MatchResult::Unmatched {
			matched: false,
			confidence: Some(round3(score)),
			choices: choices(items),
		};
	}

	MatchResult::Matched {
		matched: true,
		confidence: round3(score),
		product_id: item.product_id.clone(),
		name: item.name.clone(),
		resource_types: item.resource_types.clone(),
		duration_minutes: item.duration_minutes,
	}
}

fn choices(items: &[CatalogItem]) -> Vec<ChoiceRef> {
	items.iter().take(CHOICE_LIMIT).map(ChoiceRef::from).collect()
}

fn round3(score: f64) -> f64 {
	(score * 1_000.0).round() / 1_000.0
}
