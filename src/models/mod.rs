pub mod onboarding_item;
pub mod question;
pub mod response;
pub mod test;
pub mod test_attempt;
