pub mod domain;
pub mod forecast;
pub mod library;
pub mod ports;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use domain::{
    Book, BookChanges, BookStatus, DayOfWeek, Level, NewBook, NewProgress, NewSchedule,
    PaceOverride, ProgressChanges, ProgressEntry, ScheduleChanges, ScheduleEntry, User,
    UserCredentials,
};
pub use forecast::{BookForecast, ForecastSummary, FullForecast, PendingForecast};
pub use ports::{DatabaseService, PortError, PortResult};
