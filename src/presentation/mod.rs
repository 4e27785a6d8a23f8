pub mod messages;

pub use messages::{
    format_date, format_time_left, progress_bar_width, render_status, Locale, WindowView,
};
