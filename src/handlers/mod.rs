pub mod auth;
pub mod car_images;
pub mod dashboard;
pub mod reminder_types;
pub mod reminders;
pub mod users;
pub mod vehicles;
