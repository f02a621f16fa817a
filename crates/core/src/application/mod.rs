// Application Layer - Queue projection and announcement services

pub mod announcement;
pub mod formatters;
pub mod localization;
pub mod projector;
pub mod subscriber;
pub mod surface;

// Re-exports
pub use announcement::{AnnouncementCoordinator, AnnouncerState};
pub use localization::{lookup_spoken_number, select_voice, select_voice_with, Locale, VoiceStrategy};
pub use projector::{QueueView, TrackingLookup};
pub use subscriber::{FeedUpdate, LinkEvent, LinkState, LiveFeedSubscriber};
pub use surface::{
    shutdown_channel, DisplaySurface, LinkFreshness, ShutdownSender, ShutdownToken, SurfaceHandle,
    SurfaceId, SurfaceKind, SurfacePorts, SurfaceProfile, SurfaceRegistry, SurfaceView,
};
