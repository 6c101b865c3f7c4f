//! Shortcode handler library for SyncaraBot.
//!
//! Concrete side-effect handlers, grouped by domain:
//!
//! | Category | Keys |
//! |---|---|
//! | `CANVAS` | `CREATE`, `SHOW`, `EDIT`, `LIST`, `EXPORT` |
//! | `TODO` | `CREATE`, `LIST`, `COMPLETE`, `DELETE`, `UPDATE`, `CLEAR`, `STATS` |
//! | `IMAGE` | `GEN` |
//! | `CHANNEL` | `START`, `STOP`, `STATUS`, `SCHEDULE`, `POST`, `STATS` (owner) |
//! | `GROUP` / `USER` | chat and member administration |
//! | `MEDIA` | `PHOTO`, `DOCUMENT` |
//! | `MUSIC` | `PLAY`, `PAUSE`, `RESUME`, `STOP`, `NOW` |
//! | `REMINDER` | `SET`, `LIST` |
//!
//! Handlers never block on delivery: anything the user should see besides
//! the prose reply is enqueued into the deferred buffer.

pub mod admin;
pub mod canvas;
pub mod channel;
pub mod error;
pub mod image;
pub mod media;
pub mod music;
pub mod reminder;
pub mod todo;

use std::sync::Arc;

use chrono::FixedOffset;
use syncara_autonomous::ChannelPoster;
use syncara_memory::LearningStore;
use syncara_persistence::DocumentStore;
use syncara_shortcode::{HandlerOutcome, ShortcodeRegistry};
use tracing::warn;

pub use canvas::CanvasExports;
pub use error::{HandlerError, Result};
pub use image::{ImageRequest, ImageService, PollinationsClient, DEFAULT_IMAGE_API_URL};
pub use music::{MusicPlayer, NowPlaying};

/// Shared services the handlers are built from.
#[derive(Clone)]
pub struct HandlerServices {
    pub store: Arc<DocumentStore>,
    pub learning: Arc<LearningStore>,
    pub channel: Arc<ChannelPoster>,
    pub images: Arc<dyn ImageService>,
    pub music: Arc<MusicPlayer>,
    pub tz: FixedOffset,
}

/// Registers every handler family.
pub fn register_all(
    registry: &mut ShortcodeRegistry,
    services: &HandlerServices,
) -> syncara_shortcode::Result<()> {
    canvas::register(registry, &services.store)?;
    todo::register(registry, &services.store)?;
    image::register(registry, &services.images)?;
    channel::register(registry, &services.channel)?;
    admin::register(registry, &services.learning)?;
    media::register(registry)?;
    music::register(registry, &services.music)?;
    reminder::register(registry, &services.store, services.tz)?;
    Ok(())
}

/// Turns a handler body's result into the dispatcher's outcome.
pub fn settle(category: &'static str, result: Result<HandlerOutcome>) -> HandlerOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(category, error = %e, "Handler error");
            HandlerOutcome::Failed
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{learning, poster, tz, StaticImages};
    use syncara_models::ChatId;
    use syncara_shortcode::ShortcodeKey;
    use syncara_test_utils::MockTransport;

    #[test]
    fn test_register_all() {
        let transport = Arc::new(MockTransport::new(1, "Aeris", "Aeris_sync"));
        let (channel, store) = poster(transport, Some(ChatId(-1001)));
        let services = HandlerServices {
            store,
            learning: learning(),
            channel,
            images: Arc::new(StaticImages::ok()),
            music: Arc::new(MusicPlayer::new()),
            tz: tz(),
        };

        let mut registry = ShortcodeRegistry::new();
        register_all(&mut registry, &services).unwrap();

        for key in ["CANVAS:EXPORT", "TODO:COMPLETE", "IMAGE:GEN", "CHANNEL:START", "USER:INFO", "MUSIC:NOW", "REMINDER:SET"] {
            assert!(
                registry.get(&ShortcodeKey::parse(key).unwrap()).is_some(),
                "{} not registered",
                key
            );
        }
        let docs = registry.documentation();
        assert!(docs.contains("- [IMAGE:GEN:prompt|style=anime|aspect=16:9|seed=7]"));

        // a second registration collides
        assert!(register_all(&mut registry, &services).is_err());
    }
}
