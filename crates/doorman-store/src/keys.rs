//! Store key constants.

/// Keys used by the sign-in engine
pub struct StoreKeys;

impl StoreKeys {
    /// Whether a user is currently signed in ("true"/"false")
    pub const IS_LOGGED_IN: &'static str = "is_logged_in";
}
