//! Inbound payload models for booking and checkout forwarding.
//!
//! Payloads are validated locally, then forwarded to upstream verbatim.

// crates.io
use time::{PrimitiveDateTime, format_description::well_known::Iso8601};
// self
use crate::_prelude::*;

/// Resource kind a booking occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
	/// Private room.
	Room,
	/// Shared-floor table.
	Table,
}

/// Add-on line item attached to a booking.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
	/// Upstream SKU.
	pub sku: String,
	/// Quantity ordered.
	pub qty: u32,
}

/// Booking contact details.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
	/// Required first name.
	pub first_name: String,
	/// Optional last name.
	#[serde(default)]
	pub last_name: String,
	/// Required email address.
	pub email: String,
	/// Optional phone number.
	#[serde(default)]
	pub phone: String,
}

/// Guest-of-honor details for party bookings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestOfHonor {
	/// Guest name.
	pub name: String,
	/// Optional `YYYY-MM-DD` date of birth.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dob: Option<String>,
}

/// Validated booking payload forwarded to upstream booking creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
	/// Upstream product identifier.
	pub product_id: String,
	/// ISO8601 start instant.
	pub start: String,
	/// Session length in minutes; must fall within 60–300.
	#[serde(default = "default_duration")]
	pub duration_minutes: u32,
	/// Resource kind to occupy.
	pub resource_type: ResourceType,
	/// Guest count; must fall within 1–1000.
	pub headcount: u32,
	/// Soft-hold token from a prior validate-and-reserve call.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reserve_token: Option<String>,
	/// Add-on line items.
	#[serde(default)]
	pub addons: Vec<AddOn>,
	/// Booking contact.
	pub contact: Contact,
	/// Display label for the party.
	pub party_label: String,
	/// Optional guest of honor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub guest_of_honor: Option<GuestOfHonor>,
	/// Free-text notes.
	#[serde(default)]
	pub notes: String,
	/// Optional total/deposit pricing hints, passed through untouched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pricing: Option<Json>,
	/// Optional hold hints (e.g., `{"expiresAt": ...}`), passed through untouched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hold: Option<Json>,
}
impl BookingRequest {
	/// Checks the field bounds that upstream does not enforce for us.
	pub fn validate(&self) -> Result<()> {
		if !(60..=300).contains(&self.duration_minutes) {
			return Err(Error::validation("durationMinutes must be between 60 and 300"));
		}
		if !(1..=1_000).contains(&self.headcount) {
			return Err(Error::validation("headcount must be between 1 and 1000"));
		}
		if PrimitiveDateTime::parse(&self.start, &Iso8601::DEFAULT).is_err()
			&& OffsetDateTime::parse(&self.start, &Iso8601::DEFAULT).is_err()
		{
			return Err(Error::validation("start must be an ISO8601 instant"));
		}

		Ok(())
	}
}

/// Checkout-session request forwarded to upstream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
	/// Amount to collect.
	pub amount: f64,
	/// Collection purpose, `deposit` or `balance`.
	#[serde(default = "default_purpose")]
	pub purpose: String,
	/// Optional URL the payment flow returns to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub return_url: Option<String>,
	/// Whether upstream should email a receipt.
	#[serde(default = "default_true")]
	pub send_receipt: bool,
}
impl CheckoutRequest {
	/// Checks the amount is a positive finite value.
	pub fn validate(&self) -> Result<()> {
		if !self.amount.is_finite() || self.amount <= 0.0 {
			return Err(Error::validation("amount must be positive"));
		}

		Ok(())
	}
}

fn default_duration() -> u32 {
	120
}

fn default_purpose() -> String {
	"deposit".into()
}

fn default_true() -> bool {
	true
}
