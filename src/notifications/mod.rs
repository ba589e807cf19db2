//! Notification policy: views, banners, reminders and the manager tying
//! them to the overlay

pub mod banner;
pub mod manager;
pub mod reminder;
pub mod view;

pub use banner::{Banner, BannerId, BannerKind, BannerPresenter, NotificationSource, Urgency};
pub use manager::{NotificationManager, NotificationStatus};
pub use reminder::Reminder;
pub use view::{resolve_view, NotificationView};
