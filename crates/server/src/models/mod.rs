//! Domain types returned by the repositories and serialized to API JSON.

pub mod book;
pub mod chat;
pub mod event;
pub mod flashcard;
pub mod purchase;
pub mod user;

pub use book::{Book, BookFilter, NewBook};
pub use chat::ChatMessage;
pub use event::{CalendarEvent, NewEvent};
pub use flashcard::{Flashcard, FlashcardDeck};
pub use purchase::{CartItem, Purchase, PurchaseItem};
pub use user::{User, UserProfile};
