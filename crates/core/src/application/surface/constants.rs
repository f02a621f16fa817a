// Display surface constants
use std::time::Duration;

/// Upper bound on the initial HTTP snapshot fetch at mount (10s)
pub const INITIAL_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on one served-today poll (5s); the previous value is kept on timeout
pub const SERVED_TODAY_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Upcoming rows on the assistant dashboard
pub const ASSISTANT_UPCOMING_LIMIT: usize = 5;

/// Upcoming rows on the lobby TV
pub const LOBBY_UPCOMING_LIMIT: usize = 3;

/// Queue preview rows on the patient tracking page
pub const TRACKING_PREVIEW_LIMIT: usize = 5;

/// Reception lists every waiting patient
pub const UNLIMITED_UPCOMING: usize = usize::MAX;
