pub mod login;
pub mod userinfo;
