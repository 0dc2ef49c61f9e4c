use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::dto::validation::validate_team_id;

/// Clicks recorded when the request does not say otherwise.
pub const DEFAULT_CLICK_COUNT: u32 = 1;

/// Query string of `POST /v1/team/{teamId}/click`.
///
/// `count` stays a raw string so that a malformed value is reported with the
/// same status as an out-of-range one.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClickQuery {
    /// Clicks to record, between 1 and 10. Defaults to 1.
    #[param(value_type = Option<u32>, minimum = 1, maximum = 10)]
    pub count: Option<String>,
}

#[derive(Debug, Validate)]
struct ClickCount {
    #[validate(range(min = 1, max = 10))]
    count: i64,
}

impl ClickQuery {
    /// Parsed click count, or `None` when the value is not an integer in `[1, 10]`.
    pub fn click_count(&self) -> Option<u32> {
        let count = match self.count.as_deref().map(str::trim) {
            None | Some("") => return Some(DEFAULT_CLICK_COUNT),
            Some(raw) => raw.parse::<i64>().ok()?,
        };

        ClickCount { count }.validate().ok()?;
        u32::try_from(count).ok()
    }
}

/// Team id taken from the request path.
#[derive(Debug, Validate)]
pub struct TeamId {
    /// Raw identifier as sent by the client.
    #[validate(custom(function = "validate_team_id"))]
    pub id: String,
}

impl TeamId {
    /// Wrap a raw path segment.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
