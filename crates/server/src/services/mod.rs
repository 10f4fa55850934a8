//! Integrations with external systems: authentication, the media CDN, the
//! payment provider and flashcard generation.

pub mod auth;
pub mod flashcards;
pub mod media;
pub mod payments;

pub use auth::{AuthError, AuthService, Claims};
pub use flashcards::{FlashcardClient, FlashcardError, GeneratedCard};
pub use media::{AssetUrl, ImageCache, MediaError, MediaStore, PdfRetriever};
pub use payments::{PaymentError, StripeClient};
