//! All user-visible copy in one place.

use crate::ports::GenerationError;
use protocol::labels;

pub const GREETING: &str = "Hi! Let's put together a new post for Konstantin.\n\n\
    What's the news hook? What happened, where, with whom?\n\
    If there is no news hook, say \"no\".";

pub const PROMPT_START: &str = "Send /start to begin a new post.";

pub const ACCESS_RESTRICTED: &str = "Access restricted.";

pub const ASK_RELEASE_TYPE: &str = "Got the link. Is this a premiere or already released?";

pub const ASK_TOPIC: &str = "No news hook, then. Pick a topic for the post, or choose a custom one.";

pub const ASK_CUSTOM_TOPIC: &str = "Type your topic as free text.";

pub const ASK_PHOTOS: &str = "Noted. Now attach up to 3 photos, one at a time.\n\
    When you're done, hit \"Generate post\".";

pub const PHOTO_CAP: &str = "That's already 3 photos, the cap. Hit \"Generate post\" when ready.";

pub fn photo_added(count: usize) -> String {
    format!("Photo {} of 3 saved. Add another or hit \"{}\".", count, labels::FINISH)
}

pub fn generation_failure(err: &GenerationError) -> String {
    match err {
        GenerationError::MissingCredentials => {
            "The text generator has no API key configured, so no post was produced. \
             The brief was still recorded."
                .to_string()
        }
        GenerationError::MissingInstructions => {
            "Configuration error: the instruction document is missing, so no post \
             was produced."
                .to_string()
        }
        GenerationError::Empty => {
            "The generator came back empty. Start over with /start and try again.".to_string()
        }
        GenerationError::Provider(detail) => {
            format!("The generator failed ({}). Start over with /start and try again.", detail)
        }
    }
}
