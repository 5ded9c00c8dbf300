// self
use crate::_prelude::*;

/// Grants the relay sends to a provider token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantType {
	/// Redeems the code delivered to the callback.
	AuthorizationCode,
	/// Renews an expired token set.
	RefreshToken,
}
impl GrantType {
	/// `grant_type` form value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AuthorizationCode => "authorization_code",
			Self::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn display_matches_form_value() {
		assert_eq!(GrantType::RefreshToken.to_string(), "refresh_token");
		assert_eq!(GrantType::AuthorizationCode.as_str(), "authorization_code");
	}
}
