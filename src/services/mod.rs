pub mod aggregation;
pub mod openid;
pub mod providers;
pub mod share;
