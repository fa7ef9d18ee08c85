pub mod category;
pub mod pair;
pub mod question;
pub mod record;
pub mod round;
