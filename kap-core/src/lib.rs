pub mod announcement;
pub mod config;
pub mod error;
pub mod message;
pub mod notifier;
pub mod poller;
pub mod price;
pub mod source;
pub mod storage;

pub use announcement::{Announcement, NO_SUMMARY};
pub use config::RelayConfig;
pub use error::{ConfigError, NotifyError, PollError, SourceError, StorageError};
pub use message::{escape_html, format_message, MAX_MESSAGE_CHARS};
pub use notifier::{LogNotifier, Notifier, TelegramNotifier};
pub use poller::{
    is_recent, spawn_poller, CycleReport, PollConfig, PollCycle, PollState, PollStatus,
    PollerHandle,
};
pub use price::{NoPriceLookup, Price, PriceLookup, YahooPriceLookup, PRICE_UNAVAILABLE};
pub use source::{
    build_source, portal_date, portal_offset, AnnouncementSource, ApiSource, HtmlSource,
    RssSource, SourceKind,
};
pub use storage::{SeenSet, SeenStore};
