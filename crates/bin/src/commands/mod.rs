pub mod group;
pub mod info;
pub mod lookup;
pub mod member;
pub mod user;
