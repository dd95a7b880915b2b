pub const SECONDS_IN_MINUTE: i64 = 60;
pub const MINUTES_IN_HOUR: i64 = 60;
pub const HOURS_IN_DAY: i64 = 24;


pub const SECONDS_IN_HOUR: i64 = MINUTES_IN_HOUR*SECONDS_IN_MINUTE;
pub const SECONDS_IN_DAY: i64 = HOURS_IN_DAY*SECONDS_IN_HOUR;


pub const JUST_NOW_STR: &str = "just now";


pub const MAX_USERNAME_LENGTH: usize = 30;
pub const MAX_POST_LENGTH: usize = 20000;
pub const MAX_COMMENT_LENGTH: usize = 5000;
pub const MAX_CATEGORY_SELECTION: usize = 16;
